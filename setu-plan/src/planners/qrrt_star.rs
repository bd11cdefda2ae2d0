//! QRRT*: asymptotically optimal tree planner over a bundle level.
//!
//! Extends QRRT with choose-parent and rewire steps over a shrinking
//! neighborhood, per-neighbor edge-validity caching, and goal bookkeeping
//! that keeps `q_goal` at the cheapest goal configuration even after
//! rewires shuffle subtree costs.

use std::f64::consts::{E, PI};
use std::sync::Arc;

use log::{info, warn};

use super::base::{BundleGraph, StrategyDefaults};
use super::{BundlePlanner, ParentView};
use crate::bundle::Projection;
use crate::config::PlannerSettings;
use crate::core::cost::{Cost, OptimizationObjective};
use crate::core::problem::LevelSpace;
use crate::core::state::State;
use crate::error::Result;
use crate::roadmap::graph::ConfigId;
use crate::roadmap::path::Path;
use crate::strategies::{GraphSampler, Importance, Metric, Propagator};

/// Lebesgue measure of the unit ball in `R^d`.
fn unit_ball_measure(d: usize) -> f64 {
    match d {
        0 => 1.0,
        1 => 2.0,
        _ => unit_ball_measure(d - 2) * 2.0 * PI / d as f64,
    }
}

/// Edge-validity cache entry for one neighbor during a grow step.
#[derive(Clone, Copy, PartialEq)]
enum EdgeValidity {
    Unknown,
    Valid,
    Invalid,
}

/// Asymptotically optimal quotient-space RRT*.
pub struct QrrtStar {
    base: BundleGraph,
    dim: f64,
    k_rrt: f64,
    r_rrt: f64,
    symmetric: bool,
    goal_configurations: Vec<ConfigId>,
}

impl QrrtStar {
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
                importance: Importance::Exponential,
                sampler: GraphSampler::RandomVertex,
                propagator: Propagator::Geometric,
            },
        )?;

        let mut d = base.space.space.dimension() as f64;
        if d < 1.0 {
            warn!("[QrrtStar] zero-dimensional space, treating as 1-dimensional");
            d = 1.0;
        }
        // k > 2^(d+1) * e * (1 + 1/d)
        let k_rrt = 2f64.powf(d + 1.0) * E * (1.0 + 1.0 / d);
        // r > (2 * (1 + 1/d) * mu(X) / zeta_d)^(1/d)
        let measure = base.space.space.measure();
        let zeta = unit_ball_measure(base.space.space.dimension().max(1));
        let r_rrt = (2.0 * (1.0 + 1.0 / d) * measure / zeta).powf(1.0 / d);
        let symmetric = base.space.space.has_symmetric_interpolate();

        Ok(Self {
            base,
            dim: d,
            k_rrt,
            r_rrt,
            symmetric,
            goal_configurations: Vec::new(),
        })
    }

    /// Shrinking neighborhood around `x`: k-nearest with
    /// `k = ceil(k_rrt * ln(|V|+1))`, or radius
    /// `min(range, r_rrt * (ln(|V|+1)/(|V|+1))^(1/d))`.
    fn nearest_neighbors(&self, x: &State) -> Vec<ConfigId> {
        let card = (self.base.nn.len() + 1) as f64;
        let dist = |a: &State, b: &State| self.base.distance(a, b);
        if self.base.use_k_nearest() {
            let k = (self.k_rrt * card.ln()).ceil().max(1.0) as usize;
            self.base.nn.nearest_k(x, k, dist)
        } else {
            let r = self
                .base
                .range()
                .min(self.r_rrt * (card.ln() / card).powf(1.0 / self.dim));
            self.base.nn.nearest_r(x, r, dist)
        }
    }

    /// Whether the candidate edge passes the neighborhood guard and the
    /// motion checker.
    fn edge_feasible(&self, a: &State, b: &State) -> bool {
        (!self.base.use_k_nearest() || self.base.distance(a, b) < self.base.range())
            && self.base.space.check_motion(a, b)
    }

    fn remove_from_parent(&mut self, q: ConfigId) {
        if let Some(p) = self.base.roadmap.config(q).parent {
            let children = &mut self.base.roadmap.config_mut(p).children;
            if let Some(pos) = children.iter().position(|c| *c == q) {
                children.remove(pos);
            }
        }
    }

    /// Depth-first refresh of subtree costs after a rewire.
    fn update_child_costs(&mut self, root: ConfigId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let cost = self.base.roadmap.config(id).cost;
            let children = self.base.roadmap.config(id).children.clone();
            for child in children {
                let line = self.base.roadmap.config(child).line_cost;
                self.base.roadmap.config_mut(child).cost =
                    self.base.objective.combine(cost, line);
                stack.push(child);
            }
        }
    }

    /// Restore `q_goal = argmin cost` over the goal configurations.
    fn refresh_goal(&mut self) -> bool {
        let mut updated = false;
        for &qk in &self.goal_configurations {
            let cost = self.base.roadmap.config(qk).cost;
            if self.base.q_goal.is_none() || self.base.objective.is_better_than(cost, self.base.best_cost)
            {
                self.base.q_goal = Some(qk);
                self.base.best_cost = cost;
                updated = true;
            }
        }
        updated
    }
}

impl BundlePlanner for QrrtStar {
    fn name(&self) -> &'static str {
        "QrrtStar"
    }

    fn base(&self) -> &BundleGraph {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BundleGraph {
        &mut self.base
    }

    fn clear(&mut self) {
        self.goal_configurations.clear();
        self.base.clear();
    }

    fn grow(&mut self, parent: Option<&ParentView<'_>>) {
        if self.base.first_run {
            self.base.init_start();
            self.base.first_run = false;
        }
        // a goal installed by path restriction joins the bookkeeping so
        // later rewires keep best_cost honest
        if self.goal_configurations.is_empty()
            && let Some(lifted_goal) = self.base.q_goal
        {
            self.goal_configurations.push(lifted_goal);
        }

        let mut x_rand = self.base.space.space.alloc_state();
        self.base.sample_bundle_goal_bias(parent, &mut x_rand);

        let Some(q_nearest) = self.base.nearest(&x_rand) else {
            return;
        };
        let Some(x_new) = self.base.steer_towards_range(q_nearest, &x_rand) else {
            return;
        };

        let neighbors = self.nearest_neighbors(&x_new);

        // choose parent: cheapest feasible route into x_new
        let mut line_min = self
            .base
            .objective
            .motion_cost(self.base.roadmap.state(q_nearest), &x_new);
        let mut cost_min = self
            .base
            .objective
            .combine(self.base.roadmap.config(q_nearest).cost, line_min);
        let mut parent_min = q_nearest;

        let mut validity = vec![EdgeValidity::Unknown; neighbors.len()];
        let mut line_costs = vec![Cost(0.0); neighbors.len()];

        for (i, &q_near) in neighbors.iter().enumerate() {
            if q_near == q_nearest {
                validity[i] = EdgeValidity::Valid;
                if self.symmetric {
                    line_costs[i] = line_min;
                }
                continue;
            }
            let line = self
                .base
                .objective
                .motion_cost(self.base.roadmap.state(q_near), &x_new);
            if self.symmetric {
                line_costs[i] = line;
            }
            let new_cost = self
                .base
                .objective
                .combine(self.base.roadmap.config(q_near).cost, line);
            if self.base.objective.is_better_than(new_cost, cost_min) {
                if self.edge_feasible(self.base.roadmap.state(q_near), &x_new) {
                    line_min = line;
                    cost_min = new_cost;
                    parent_min = q_near;
                    validity[i] = EdgeValidity::Valid;
                } else {
                    validity[i] = EdgeValidity::Invalid;
                }
            }
        }

        let id = self.base.add_configuration(x_new);
        {
            let config = self.base.roadmap.config_mut(id);
            config.parent = Some(parent_min);
            config.line_cost = line_min;
            config.cost = cost_min;
        }
        self.base.roadmap.config_mut(parent_min).children.push(id);
        self.base.add_edge(parent_min, id);

        let mut check_for_solution = false;

        // rewire: route neighbors through x_new when strictly cheaper
        for (i, &q_near) in neighbors.iter().enumerate() {
            if q_near == parent_min {
                continue;
            }
            // start and goal vertices stay rooted
            let near_config = self.base.roadmap.config(q_near);
            if near_config.is_start || near_config.is_goal {
                continue;
            }
            let line = if self.symmetric {
                line_costs[i]
            } else {
                self.base
                    .objective
                    .motion_cost(self.base.roadmap.state(id), self.base.roadmap.state(q_near))
            };
            let new_cost = self.base.objective.combine(cost_min, line);
            let old_cost = self.base.roadmap.config(q_near).cost;
            if !self.base.objective.is_better_than(new_cost, old_cost) {
                continue;
            }
            let feasible = match validity[i] {
                EdgeValidity::Valid => true,
                EdgeValidity::Invalid => false,
                EdgeValidity::Unknown => self.edge_feasible(
                    self.base.roadmap.state(id),
                    self.base.roadmap.state(q_near),
                ),
            };
            if !feasible {
                continue;
            }

            self.remove_from_parent(q_near);
            {
                let config = self.base.roadmap.config_mut(q_near);
                config.parent = Some(id);
                config.line_cost = line;
                config.cost = new_cost;
            }
            self.base.roadmap.config_mut(id).children.push(q_near);
            self.base.add_edge(id, q_near);
            self.update_child_costs(q_near);
            check_for_solution = true;
        }

        // goal bookkeeping
        let (satisfied, _) = self.base.goal_satisfied(self.base.roadmap.state(id));
        if satisfied {
            self.base.roadmap.config_mut(id).is_goal = true;
            self.goal_configurations.push(id);
            check_for_solution = true;
        }

        if check_for_solution && self.refresh_goal() {
            if !self.base.has_solution {
                info!(
                    "[QrrtStar] found path with cost {:.4} (level {})",
                    self.base.best_cost.0, self.base.level
                );
            }
            self.base.has_solution = true;
            self.base.solution = None;
        }
    }

    fn compute_solution(&mut self) -> Option<Arc<Path>> {
        let base = &mut self.base;
        if !base.has_solution {
            return None;
        }
        if let Some(cached) = &base.solution
            && base.solution_vertex_count == base.roadmap.num_vertices()
        {
            return Some(cached.clone());
        }
        let path = Arc::new(base.tree_solution()?);
        base.solution = Some(path.clone());
        base.solution_vertex_count = base.roadmap.num_vertices();
        Some(path)
    }
}
