//! SQMP: QMP with a SPARS-style sparse spanner and path-class enumeration.
//!
//! Every dense sample runs the four spanner add-criteria in order (coverage,
//! connectivity, interface, path quality); the first to fire inserts the
//! sample into the sparse graph and resets the consecutive-failure counter.
//! Solutions are declared and extracted on the sparse graph, and distinct
//! path classes are enumerated from it to seed the level above.

use std::sync::Arc;

use log::info;

use super::base::{BundleGraph, StrategyDefaults};
use super::qmp::{grow_dense, init_roadmap_problem};
use super::{BundlePlanner, LevelData, ParentView};
use crate::bundle::Projection;
use crate::config::PlannerSettings;
use crate::core::cost::OptimizationObjective;
use crate::core::problem::LevelSpace;
use crate::error::Result;
use crate::roadmap::path::Path;
use crate::sparse::{Enumerator, PathVisibilityChecker, SparseRoadmap, remove_reducible_loops};
use crate::strategies::{GraphSampler, Importance, Metric, Propagator};

/// Sparse quotient-space roadmap planner.
pub struct Sqmp {
    base: BundleGraph,
    sparse: SparseRoadmap,
    checker: PathVisibilityChecker,
    n_head: usize,
    total_samples: u64,
    feasible_samples: u64,
}

impl Sqmp {
    pub fn new(
        level: usize,
        space: LevelSpace,
        projection: Option<Projection>,
        objective: Arc<dyn OptimizationObjective>,
        settings: &PlannerSettings,
    ) -> Result<Self> {
        let extent = space.space.maximum_extent();
        let sparse = SparseRoadmap::new(
            settings.sparse.sparse_delta_fraction * extent,
            settings.sparse.dense_delta_fraction * extent,
            settings.sparse.stretch_factor,
        );
        let base = BundleGraph::new(
            level,
            space,
            projection,
            objective,
            settings,
            StrategyDefaults {
                metric: Metric::Geodesic,
                importance: Importance::Greedy,
                sampler: GraphSampler::RandomVertex,
                propagator: Propagator::Geometric,
            },
        )?;
        Ok(Self {
            base,
            sparse,
            checker: PathVisibilityChecker::new(),
            n_head: settings.sparse.path_head,
            total_samples: 0,
            feasible_samples: 0,
        })
    }

    pub fn sparse(&self) -> &SparseRoadmap {
        &self.sparse
    }

    pub fn visibility_checker(&self) -> &PathVisibilityChecker {
        &self.checker
    }

    fn init(&mut self) {
        init_roadmap_problem(&mut self.base);
        self.seed_sparse_guards();
    }

    /// Create the start/goal guards of the sparse graph from the dense
    /// start/goal configurations.
    fn seed_sparse_guards(&mut self) {
        let (Some(dense_start), Some(dense_goal)) = (self.base.q_start, self.base.q_goal) else {
            return;
        };

        let start_state = self.base.roadmap.state(dense_start).clone();
        let vs = self.sparse.add_guard(start_state);
        self.sparse.vertex_mut(vs).is_start = true;
        self.sparse.vertex_mut(vs).non_interface.insert(dense_start);
        self.sparse.v_start = Some(vs);
        self.base.roadmap.config_mut(dense_start).representative = Some(vs);

        let goal_state = self.base.roadmap.state(dense_goal).clone();
        let vg = self.sparse.add_guard(goal_state);
        self.sparse.vertex_mut(vg).is_goal = true;
        self.sparse.vertex_mut(vg).non_interface.insert(dense_goal);
        self.sparse.v_goal = Some(vg);
        self.base.roadmap.config_mut(dense_goal).representative = Some(vg);
    }
}

impl BundlePlanner for Sqmp {
    fn name(&self) -> &'static str {
        "Sqmp"
    }

    fn base(&self) -> &BundleGraph {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BundleGraph {
        &mut self.base
    }

    fn clear(&mut self) {
        self.sparse.clear();
        self.total_samples = 0;
        self.feasible_samples = 0;
        self.base.clear();
    }

    fn grow(&mut self, parent: Option<&ParentView<'_>>) {
        if self.base.first_run {
            self.init();
            self.base.first_run = false;
        }
        // a path-restriction lift consumes first_run and seeds the dense
        // roadmap behind init()'s back; the sparse graph still needs its
        // start/goal guards before any spanner bookkeeping
        if self.sparse.v_start.is_none() {
            self.seed_sparse_guards();
        }

        let inserted = grow_dense(
            &mut self.base,
            parent,
            &mut self.total_samples,
            &mut self.feasible_samples,
        );

        if let Some(q) = inserted {
            let q_state = self.base.roadmap.state(q).clone();
            let (graph_neighborhood, visible) = self
                .sparse
                .find_graph_neighbors(&self.base.space, &q_state);

            let objective = self.base.objective.clone();
            let added = self.sparse.check_add_coverage(
                &q_state,
                &visible,
                &mut self.base.roadmap,
                &self.base.nn,
                &self.base.space,
            ) || self.sparse.check_add_connectivity(
                &q_state,
                &visible,
                &mut self.base.roadmap,
                &self.base.nn,
                &self.base.space,
                objective.as_ref(),
            ) || self.sparse.check_add_interface(
                &q_state,
                &graph_neighborhood,
                &visible,
                &mut self.base.roadmap,
                &self.base.nn,
                &self.base.space,
                objective.as_ref(),
            ) || {
                self.sparse
                    .assign_representative(&mut self.base.roadmap, &self.base.space, q);
                self.sparse.check_add_path(
                    q,
                    &mut self.base.roadmap,
                    &self.base.nn,
                    &self.base.space,
                    objective.as_ref(),
                )
            };

            if !added {
                self.sparse.consecutive_failures += 1;
            }
            self.sparse
                .assign_representative(&mut self.base.roadmap, &self.base.space, q);
        }

        if !self.base.has_solution
            && let (Some(vs), Some(vg)) = (self.sparse.v_start, self.sparse.v_goal)
            && self.sparse.same_component(vs, vg)
        {
            info!(
                "[Sqmp] sparse start and goal connected (level {}, {} guards)",
                self.base.level,
                self.sparse.num_vertices()
            );
            self.base.has_solution = true;
            self.base.solution = None;
        }
    }

    fn compute_solution(&mut self) -> Option<Arc<Path>> {
        if !self.base.has_solution {
            return None;
        }
        if let Some(cached) = &self.base.solution
            && self.base.solution_vertex_count == self.base.roadmap.num_vertices()
        {
            return Some(cached.clone());
        }
        let (vs, vg) = (self.sparse.v_start?, self.sparse.v_goal?);
        let path = match self.sparse.astar(vs, vg, self.base.objective.as_ref()) {
            Some((chain, _)) => {
                let states = chain
                    .iter()
                    .map(|id| self.sparse.state(*id).clone())
                    .collect();
                Path::from_states(states)
            }
            // a restriction-installed section lives only in the dense
            // roadmap; the sparse guards are not edge-connected yet
            None => self.base.graph_solution()?,
        };
        let path = Arc::new(path.shortcut(&self.base.space));
        self.base.solution = Some(path.clone());
        self.base.solution_vertex_count = self.base.roadmap.num_vertices();
        Some(path)
    }

    /// Enumerate distinct path classes on the sparse graph into the stack.
    fn update_path_stack(&mut self, parent: Option<&ParentView<'_>>) {
        if !self.base.has_solution {
            return;
        }
        // cache the solution up front: the level above reads it through its
        // parent view when it attempts the path-restriction lift
        let solution = self.compute_solution();

        remove_reducible_loops(&mut self.sparse, &self.base.space, &self.checker);

        let classes = {
            let enumerator = Enumerator {
                sparse: &self.sparse,
                space: &self.base.space,
                checker: &self.checker,
                projection: self.base.projection.as_ref(),
                parent,
                n_head: self.n_head,
            };
            enumerator.enumerate()
        };

        if classes.is_empty() {
            // the DFS can be starved by rejections; the A* solution still
            // seeds one class
            if let Some(path) = solution {
                self.base.path_stack = vec![path];
                self.base.selected_path = Some(0);
            }
            return;
        }
        self.base.path_stack = classes;
        self.base.selected_path = Some(0);
    }

    /// Export the sparse graph; for SQMP it is the level's summary artifact.
    fn planner_data(&self) -> LevelData {
        let mut data = self.base.level_data(self.name());
        data.vertices = self
            .sparse
            .iter()
            .map(|v| super::VertexData {
                values: v.state.values().to_vec(),
                is_start: v.is_start,
                is_goal: v.is_goal,
                on_shortest_path: false,
            })
            .collect();
        data.edges = self
            .sparse
            .edges()
            .map(|(a, b)| super::EdgeData {
                source: a.0,
                target: b.0,
                cost: self
                    .base
                    .space
                    .distance(self.sparse.state(a), self.sparse.state(b)),
            })
            .collect();
        data
    }
}
