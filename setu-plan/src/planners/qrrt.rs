//! QRRT: rapidly-exploring random tree over a bundle level, with quotient
//! sampling from the level beneath.

use std::sync::Arc;

use log::info;

use super::base::{BundleGraph, StrategyDefaults};
use super::{BundlePlanner, ParentView};
use crate::bundle::Projection;
use crate::config::PlannerSettings;
use crate::core::cost::OptimizationObjective;
use crate::core::problem::LevelSpace;
use crate::error::Result;
use crate::roadmap::path::Path;
use crate::strategies::{GraphSampler, Importance, Metric, Propagator};

/// Feasibility-only tree planner (RRT adapted to bundle sampling).
pub struct Qrrt {
    base: BundleGraph,
}

impl Qrrt {
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
        Ok(Self { base })
    }
}

impl BundlePlanner for Qrrt {
    fn name(&self) -> &'static str {
        "Qrrt"
    }

    fn base(&self) -> &BundleGraph {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BundleGraph {
        &mut self.base
    }

    fn grow(&mut self, parent: Option<&ParentView<'_>>) {
        let base = &mut self.base;
        if base.first_run {
            base.init_start();
            base.first_run = false;
        }

        let mut x_rand = base.space.space.alloc_state();
        base.sample_bundle_goal_bias(parent, &mut x_rand);

        let Some(q_near) = base.nearest(&x_rand) else {
            return;
        };
        let Some(x_new) = base.steer_towards_range(q_near, &x_rand) else {
            return;
        };

        let id = base.add_configuration(x_new);
        let line = base
            .objective
            .motion_cost(base.roadmap.state(q_near), base.roadmap.state(id));
        let parent_cost = base.roadmap.config(q_near).cost;
        {
            let config = base.roadmap.config_mut(id);
            config.parent = Some(q_near);
            config.line_cost = line;
        }
        base.roadmap.config_mut(id).cost = base.objective.combine(parent_cost, line);
        base.roadmap.config_mut(q_near).children.push(id);
        base.add_edge(q_near, id);

        let (satisfied, _) = base.goal_satisfied(base.roadmap.state(id));
        if satisfied {
            base.roadmap.config_mut(id).is_goal = true;
            let cost = base.roadmap.config(id).cost;
            if base.objective.is_better_than(cost, base.best_cost) {
                base.best_cost = cost;
                base.q_goal = Some(id);
                base.solution = None;
            }
            if !base.has_solution {
                info!(
                    "[Qrrt] found path with cost {:.4} (level {})",
                    base.best_cost.0, base.level
                );
            }
            base.has_solution = true;
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
        let path = Arc::new(base.tree_solution()?.shortcut(&base.space));
        base.solution = Some(path.clone());
        base.solution_vertex_count = base.roadmap.num_vertices();
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

    fn planner(seed: u64) -> Qrrt {
        let space: Arc<dyn StateSpace> = Arc::new(RealVectorSpace::cube(2, 0.0, 1.0));
        let level = LevelSpace::with_discrete_motion(space.clone(), Arc::new(AlwaysValid), 0.01);
        let objective = Arc::new(PathLengthObjective::new(space.clone()));
        let settings = PlannerSettings::new().with_seed(seed);
        let mut qrrt = Qrrt::new(0, level, None, objective, &settings).unwrap();
        let goal_state = State::new(vec![0.9, 0.9]);
        let goal = Arc::new(GoalRegion::new(space, goal_state.clone(), 0.05));
        qrrt.base_mut()
            .set_problem(State::new(vec![0.1, 0.1]), goal_state, goal);
        qrrt
    }

    #[test]
    fn test_open_square_solved_quickly() {
        for seed in 0..5 {
            let mut qrrt = planner(seed);
            for _ in 0..1000 {
                qrrt.grow(None);
                if qrrt.base().has_solution {
                    break;
                }
            }
            assert!(qrrt.base().has_solution, "seed {seed} failed");
            let path = qrrt.compute_solution().unwrap();
            assert!(path.len() >= 2);
            assert_eq!(path.first().unwrap(), &State::new(vec![0.1, 0.1]));
        }
    }

    #[test]
    fn test_tree_stays_rooted() {
        let mut qrrt = planner(9);
        for _ in 0..200 {
            qrrt.grow(None);
        }
        let base = qrrt.base();
        let root = base.q_start.unwrap();
        for config in base.roadmap.iter() {
            if config.id == root {
                assert!(config.parent.is_none());
            } else {
                let parent = config.parent.expect("non-root must have a parent");
                assert!(
                    base.roadmap.config(parent).children.contains(&config.id),
                    "child link missing"
                );
            }
        }
    }
}
