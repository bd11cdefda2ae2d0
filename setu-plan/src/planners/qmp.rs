//! QMP: probabilistic roadmap planner over a bundle level.
//!
//! Samples a valid state per grow, inserts it, and connects it to its `k`
//! nearest neighbors through validated edges; the level is solved once start
//! and goal share a roadmap component.

use std::sync::Arc;

use log::info;

use super::base::{BundleGraph, StrategyDefaults};
use super::{BundlePlanner, ParentView};
use crate::bundle::Projection;
use crate::config::PlannerSettings;
use crate::core::cost::OptimizationObjective;
use crate::core::problem::LevelSpace;
use crate::error::Result;
use crate::roadmap::graph::ConfigId;
use crate::roadmap::path::Path;
use crate::strategies::{GraphSampler, Importance, Metric, Propagator};

/// Seed the roadmap with the start and goal configurations.
pub(super) fn init_roadmap_problem(base: &mut BundleGraph) -> (ConfigId, ConfigId) {
    let start = base.init_start();
    let goal_state = base
        .goal_state
        .clone()
        .expect("set_problem must run before growth");
    let goal = base.add_configuration(goal_state);
    base.roadmap.config_mut(goal).is_goal = true;
    base.q_goal = Some(goal);
    (start, goal)
}

/// One dense PRM growth step: goal-biased sample, validity check, bounded
/// truncation toward the closest visible neighbor, insertion and validated
/// edges to the `k`-neighborhood. Returns the inserted configuration.
pub(super) fn grow_dense(
    base: &mut BundleGraph,
    parent: Option<&ParentView<'_>>,
    total_samples: &mut u64,
    feasible_samples: &mut u64,
) -> Option<ConfigId> {
    debug_assert!(base.q_start.is_some(), "roadmap must be seeded before grow");

    let mut x_rand = base.space.space.alloc_state();
    base.sample_bundle_goal_bias(parent, &mut x_rand);
    *total_samples += 1;

    if !base.space.is_valid(&x_rand) {
        return None;
    }

    let k = base.connection_count();
    let neighbors = base.nn.nearest_k(&x_rand, k, |a, b| base.distance(a, b));

    let mut inserted: Option<ConfigId> = None;
    for q_neighbor in neighbors {
        base.roadmap.config_mut(q_neighbor).total_connection_attempts += 1;
        let visible = base
            .space
            .check_motion(base.roadmap.state(q_neighbor), &x_rand);
        if !visible {
            continue;
        }
        let id = match inserted {
            Some(id) => id,
            None => {
                // truncate the first hop to the extension range
                let d = base.distance(base.roadmap.state(q_neighbor), &x_rand);
                if d > base.range() {
                    let mut truncated = base.space.space.alloc_state();
                    base.interpolate(
                        base.roadmap.state(q_neighbor),
                        &x_rand,
                        base.range() / d,
                        &mut truncated,
                    );
                    x_rand = truncated;
                }
                *feasible_samples += 1;
                let id = base.add_configuration(x_rand.clone());
                inserted = Some(id);
                id
            }
        };
        if !base.roadmap.has_edge(q_neighbor, id) {
            base.add_edge(q_neighbor, id);
            base.roadmap
                .config_mut(q_neighbor)
                .successful_connection_attempts += 1;
        }
    }

    // connect into the goal region when the new sample satisfies it
    if let Some(id) = inserted {
        let (satisfied, _) = base.goal_satisfied(base.roadmap.state(id));
        if satisfied
            && let Some(goal) = base.q_goal
            && goal != id
            && !base.roadmap.has_edge(id, goal)
            && base
                .space
                .check_motion(base.roadmap.state(id), base.roadmap.state(goal))
        {
            base.add_edge(id, goal);
        }
    }
    inserted
}

/// Quotient-space roadmap planner.
pub struct Qmp {
    base: BundleGraph,
    total_samples: u64,
    feasible_samples: u64,
}

impl Qmp {
    pub fn new(
        level: usize,
        space: LevelSpace,
        projection: Option<Projection>,
        objective: Arc<dyn OptimizationObjective>,
        settings: &PlannerSettings,
    ) -> Result<Self> {
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
            total_samples: 0,
            feasible_samples: 0,
        })
    }

    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    pub fn feasible_samples(&self) -> u64 {
        self.feasible_samples
    }
}

impl BundlePlanner for Qmp {
    fn name(&self) -> &'static str {
        "Qmp"
    }

    fn base(&self) -> &BundleGraph {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BundleGraph {
        &mut self.base
    }

    fn clear(&mut self) {
        self.total_samples = 0;
        self.feasible_samples = 0;
        self.base.clear();
    }

    fn grow(&mut self, parent: Option<&ParentView<'_>>) {
        if self.base.first_run {
            init_roadmap_problem(&mut self.base);
            self.base.first_run = false;
        }

        grow_dense(
            &mut self.base,
            parent,
            &mut self.total_samples,
            &mut self.feasible_samples,
        );

        if !self.base.has_solution
            && let (Some(start), Some(goal)) = (self.base.q_start, self.base.q_goal)
            && self.base.roadmap.same_component(start, goal)
        {
            info!("[Qmp] start and goal connected (level {})", self.base.level);
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
        let path = Arc::new(self.base.graph_solution()?.shortcut(&self.base.space));
        self.base.solution = Some(path.clone());
        self.base.solution_vertex_count = self.base.roadmap.num_vertices();
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cost::PathLengthObjective;
    use crate::core::problem::{AlwaysValid, GoalRegion};
    use crate::core::space::{RealVectorSpace, StateSpace};
    use crate::core::state::State;

    fn planner(seed: u64) -> Qmp {
        let space: Arc<dyn StateSpace> = Arc::new(RealVectorSpace::cube(2, 0.0, 1.0));
        let level = LevelSpace::with_discrete_motion(space.clone(), Arc::new(AlwaysValid), 0.01);
        let objective = Arc::new(PathLengthObjective::new(space.clone()));
        let settings = PlannerSettings::new().with_seed(seed);
        let mut qmp = Qmp::new(0, level, None, objective, &settings).unwrap();
        let goal_state = State::new(vec![0.9, 0.9]);
        let goal = Arc::new(GoalRegion::new(space, goal_state.clone(), 0.05));
        qmp.base_mut()
            .set_problem(State::new(vec![0.1, 0.1]), goal_state, goal);
        qmp
    }

    #[test]
    fn test_solves_open_square() {
        let mut qmp = planner(17);
        for _ in 0..2000 {
            qmp.grow(None);
            if qmp.base().has_solution {
                break;
            }
        }
        assert!(qmp.base().has_solution);
        let path = qmp.compute_solution().unwrap();
        assert_eq!(path.first().unwrap(), &State::new(vec![0.1, 0.1]));
        assert_eq!(path.last().unwrap(), &State::new(vec![0.9, 0.9]));
    }

    #[test]
    fn test_solution_means_same_component() {
        let mut qmp = planner(23);
        for _ in 0..2000 {
            qmp.grow(None);
        }
        let has = qmp.base().has_solution;
        let (s, g) = (qmp.base().q_start.unwrap(), qmp.base().q_goal.unwrap());
        assert_eq!(has, qmp.base_mut().roadmap.same_component(s, g));
    }

    #[test]
    fn test_sample_counters_advance() {
        let mut qmp = planner(29);
        for _ in 0..50 {
            qmp.grow(None);
        }
        assert_eq!(qmp.total_samples(), 50);
        assert!(qmp.feasible_samples() > 0);
        assert!(qmp.feasible_samples() <= qmp.total_samples());
    }
}
