//! The bundle-space scheduler: a cooperative, importance-weighted loop over
//! all levels.
//!
//! Levels sit in a max-priority queue keyed by their importance. Each
//! iteration pops the most important level, runs exactly one `grow`, and
//! pushes the level back with refreshed importance. When the current level
//! declares a solution, its distinct path classes are enumerated into its
//! path stack and planning advances one level up.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::restriction;
use crate::bundle::Projection;
use crate::config::PlannerSettings;
use crate::core::cost::{OptimizationObjective, PathLengthObjective};
use crate::core::problem::{Goal, GoalRegion, LevelSpace, ProblemDefinition};
use crate::core::state::State;
use crate::error::{PlannerError, Result};
use crate::planners::{
    BundlePlanner, ParentView, PlannerData, Qmp, Qrrt, QrrtStar, Sqmp, parent_view,
};
use crate::roadmap::path::Path;

/// One level of the bundle decomposition: its capability bundle plus the
/// projection to the level beneath (`None` at the base).
pub struct LevelSpec {
    pub space: LevelSpace,
    pub projection: Option<Projection>,
}

impl LevelSpec {
    pub fn new(space: LevelSpace, projection: Option<Projection>) -> Self {
        Self { space, projection }
    }
}

/// Which per-level planner family the sequence runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlannerKind {
    Qrrt,
    QrrtStar,
    Qmp,
    Sqmp,
}

/// Outcome of a `solve` call. Planning failures are statuses, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// The top (stop) level holds a solution.
    ExactSolution,
    /// Some lower level holds a solution, but it did not lift to the top.
    ApproximateSolution,
    /// The termination condition fired before any solution existed.
    Timeout,
    InvalidStart,
    InvalidGoal,
}

/// A multilevel planner over a nested sequence of bundle levels.
pub struct BundleSequence {
    levels: Vec<Box<dyn BundlePlanner>>,
    settings: PlannerSettings,
    problem: ProblemDefinition,
    current_level: usize,
    stop_at_level: usize,
    seeded: bool,
}

impl BundleSequence {
    /// Build the sequence, validating projection compatibility between every
    /// adjacent pair of levels.
    pub fn new(
        specs: Vec<LevelSpec>,
        problem: ProblemDefinition,
        kind: PlannerKind,
        settings: PlannerSettings,
    ) -> Result<Self> {
        if specs.is_empty() {
            return Err(PlannerError::Configuration(
                "bundle sequence needs at least one level".into(),
            ));
        }
        for (k, spec) in specs.iter().enumerate() {
            match (&spec.projection, k) {
                (Some(_), 0) => {
                    return Err(PlannerError::Configuration(
                        "the base level cannot carry a projection".into(),
                    ));
                }
                (None, k) if k > 0 => {
                    return Err(PlannerError::Configuration(format!(
                        "level {k} needs a projection to level {}",
                        k - 1
                    )));
                }
                (Some(projection), k) => {
                    projection
                        .validate(specs[k - 1].space.space.as_ref(), spec.space.space.as_ref())?;
                }
                (None, _) => {}
            }
        }

        let top = specs.len() - 1;
        let stop_at_level = settings
            .scheduler
            .stop_at_level
            .map(|s| s.min(top))
            .unwrap_or(top);

        let mut levels: Vec<Box<dyn BundlePlanner>> = Vec::with_capacity(specs.len());
        for (k, spec) in specs.into_iter().enumerate() {
            let objective: Arc<dyn OptimizationObjective> = if k == top {
                problem
                    .objective
                    .clone()
                    .unwrap_or_else(|| Arc::new(PathLengthObjective::new(spec.space.space.clone())))
            } else {
                Arc::new(PathLengthObjective::new(spec.space.space.clone()))
            };
            let planner: Box<dyn BundlePlanner> = match kind {
                PlannerKind::Qrrt => Box::new(Qrrt::new(
                    k,
                    spec.space,
                    spec.projection,
                    objective,
                    &settings,
                )?),
                PlannerKind::QrrtStar => Box::new(QrrtStar::new(
                    k,
                    spec.space,
                    spec.projection,
                    objective,
                    &settings,
                )?),
                PlannerKind::Qmp => Box::new(Qmp::new(
                    k,
                    spec.space,
                    spec.projection,
                    objective,
                    &settings,
                )?),
                PlannerKind::Sqmp => Box::new(Sqmp::new(
                    k,
                    spec.space,
                    spec.projection,
                    objective,
                    &settings,
                )?),
            };
            levels.push(planner);
        }

        Ok(Self {
            levels,
            settings,
            problem,
            current_level: 0,
            stop_at_level,
            seeded: false,
        })
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, k: usize) -> &dyn BundlePlanner {
        self.levels[k].as_ref()
    }

    pub fn current_level(&self) -> usize {
        self.current_level
    }

    /// Validate the problem and push start/goal down the level stack.
    /// Returns the failure status when the problem is unusable.
    fn seed_levels(&mut self) -> std::result::Result<(), SolveStatus> {
        let top = self.levels.len() - 1;
        let top_space = self.levels[top].base().space.clone();

        let Some(start) = self.problem.starts.first().cloned() else {
            return Err(SolveStatus::InvalidStart);
        };
        if !top_space.space.satisfies_bounds(&start) || !top_space.is_valid(&start) {
            debug!("[BundleSequence] start state rejected");
            return Err(SolveStatus::InvalidStart);
        }

        let mut rng = match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(104_729)),
            None => StdRng::from_os_rng(),
        };
        let Some(goal_state) = self.problem.goal.sample_goal(&mut rng) else {
            return Err(SolveStatus::InvalidGoal);
        };
        if !top_space.space.satisfies_bounds(&goal_state) || !top_space.is_valid(&goal_state) {
            debug!("[BundleSequence] goal state rejected");
            return Err(SolveStatus::InvalidGoal);
        }

        // project the endpoints down the stack, top to base
        let mut starts: Vec<State> = vec![start];
        let mut goals: Vec<State> = vec![goal_state];
        for k in (1..=top).rev() {
            let projection = self.levels[k]
                .base()
                .projection
                .clone()
                .expect("non-base levels carry projections");
            let mut s = projection.alloc_base();
            let mut g = projection.alloc_base();
            projection.project(starts.last().unwrap(), &mut s);
            projection.project(goals.last().unwrap(), &mut g);
            starts.push(s);
            goals.push(g);
        }
        starts.reverse();
        goals.reverse();

        for (k, level) in self.levels.iter_mut().enumerate() {
            let goal: Arc<dyn Goal> = if k == top {
                self.problem.goal.clone()
            } else {
                let space = level.base().space.space.clone();
                let threshold =
                    self.settings.level.goal_threshold_fraction * space.maximum_extent();
                Arc::new(GoalRegion::new(space, goals[k].clone(), threshold))
            };
            level
                .base_mut()
                .set_problem(starts[k].clone(), goals[k].clone(), goal);
        }
        Ok(())
    }

    /// Run the cooperative scheduling loop until the termination condition
    /// fires or the stop level is solved.
    pub fn solve(&mut self, ptc: &mut dyn FnMut() -> bool) -> SolveStatus {
        if !self.seeded {
            match self.seed_levels() {
                Ok(()) => self.seeded = true,
                Err(status) => return status,
            }
        }

        // levels enter the queue once the level beneath them is solved, so a
        // level's first grow always sees its parent's solution (and can take
        // the path-restriction shortcut)
        let mut queue: BinaryHeap<LevelPriority> = (0..=self.current_level.min(self.stop_at_level))
            .map(|index| LevelPriority {
                importance: self.levels[index].base().importance_value(),
                index,
            })
            .collect();

        while !ptc() {
            if self.current_level > self.stop_at_level {
                break;
            }
            let Some(LevelPriority { index: k, .. }) = queue.pop() else {
                break;
            };

            {
                let (lower, upper) = self.levels.split_at_mut(k);
                let pv = lower.last().map(|p| parent_view(p.as_ref()));

                if upper[0].base().first_run
                    && self.settings.scheduler.feasible_path_restriction
                    && let Some(pv_ref) = pv.as_ref()
                    && pv_ref.has_solution
                {
                    restriction::try_feasible_section(upper[0].base_mut(), pv_ref);
                }
                upper[0].grow(pv.as_ref());
            }

            // advance past every solved level, enumerating its path classes
            // on the way up (a level may have solved out of order, before
            // the current level reached it)
            while self.current_level <= self.stop_at_level
                && self.levels[self.current_level].base().has_solution
            {
                let solved = self.current_level;
                let (lower, upper) = self.levels.split_at_mut(solved);
                let pv: Option<ParentView<'_>> = lower.last().map(|p| parent_view(p.as_ref()));
                upper[0].update_path_stack(pv.as_ref());
                info!(
                    "[BundleSequence] level {solved} solved with {} path class(es), advancing",
                    upper[0].base().path_stack.len()
                );
                self.current_level += 1;
                if self.current_level <= self.stop_at_level {
                    queue.push(LevelPriority {
                        importance: self.levels[self.current_level].base().importance_value(),
                        index: self.current_level,
                    });
                }
            }

            queue.push(LevelPriority {
                importance: self.levels[k].base().importance_value(),
                index: k,
            });
        }

        self.status()
    }

    /// Convenience wrapper: terminate after `max_iterations` grow steps.
    pub fn solve_iterations(&mut self, max_iterations: usize) -> SolveStatus {
        let mut remaining = max_iterations;
        self.solve(&mut || {
            if remaining == 0 {
                true
            } else {
                remaining -= 1;
                false
            }
        })
    }

    fn status(&self) -> SolveStatus {
        if self.levels[self.stop_at_level].base().has_solution {
            SolveStatus::ExactSolution
        } else if self.levels[..self.stop_at_level]
            .iter()
            .any(|l| l.base().has_solution)
        {
            SolveStatus::ApproximateSolution
        } else {
            SolveStatus::Timeout
        }
    }

    /// Solution path on the highest solved level (the stop level for an
    /// exact solution).
    pub fn solution_path(&mut self) -> Option<Path> {
        for k in (0..=self.stop_at_level).rev() {
            if self.levels[k].base().has_solution
                && let Some(path) = self.levels[k].compute_solution()
            {
                return Some((*path).clone());
            }
        }
        None
    }

    /// Annotated multilevel graph export: every level's graph, tagged with
    /// its level index and the selected path-class vector up the hierarchy.
    pub fn planner_data(&self) -> PlannerData {
        let mut levels = Vec::with_capacity(self.levels.len());
        for (k, level) in self.levels.iter().enumerate() {
            let mut data = level.planner_data();
            data.path_class = self.levels[..=k]
                .iter()
                .map(|l| l.base().selected_path.map(|v| v as i64).unwrap_or(0))
                .collect();
            levels.push(data);
        }
        PlannerData { levels }
    }

    /// Clear every level and restart planning from scratch.
    pub fn clear(&mut self) {
        for level in &mut self.levels {
            level.clear();
        }
        self.current_level = 0;
        self.seeded = false;
    }
}

/// Max-heap entry keyed by importance.
struct LevelPriority {
    importance: f64,
    index: usize,
}

impl PartialEq for LevelPriority {
    fn eq(&self, other: &Self) -> bool {
        self.importance == other.importance && self.index == other.index
    }
}

impl Eq for LevelPriority {}

impl PartialOrd for LevelPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LevelPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.importance.total_cmp(&other.importance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::problem::{AlwaysValid, GoalRegion};
    use crate::core::space::{RealVectorSpace, StateSpace};

    fn unit_square_level() -> LevelSpace {
        let space: Arc<dyn StateSpace> = Arc::new(RealVectorSpace::cube(2, 0.0, 1.0));
        LevelSpace::with_discrete_motion(space, Arc::new(AlwaysValid), 0.01)
    }

    fn simple_problem(space: Arc<dyn StateSpace>) -> ProblemDefinition {
        let goal_state = State::new(vec![0.9, 0.9]);
        ProblemDefinition::new(
            State::new(vec![0.1, 0.1]),
            Arc::new(GoalRegion::new(space, goal_state, 0.05)),
        )
    }

    #[test]
    fn test_single_level_qrrt_solves() {
        let level = unit_square_level();
        let problem = simple_problem(level.space.clone());
        let settings = PlannerSettings::new().with_seed(7);
        let mut seq = BundleSequence::new(
            vec![LevelSpec::new(level, None)],
            problem,
            PlannerKind::Qrrt,
            settings,
        )
        .unwrap();
        let status = seq.solve_iterations(1000);
        assert_eq!(status, SolveStatus::ExactSolution);
        assert!(seq.solution_path().is_some());
    }

    #[test]
    fn test_invalid_start_leaves_roadmap_empty() {
        let level = unit_square_level();
        let space = level.space.clone();
        let goal_state = State::new(vec![0.9, 0.9]);
        let problem = ProblemDefinition::new(
            State::new(vec![-2.0, 0.5]),
            Arc::new(GoalRegion::new(space, goal_state, 0.05)),
        );
        let mut seq = BundleSequence::new(
            vec![LevelSpec::new(level, None)],
            problem,
            PlannerKind::Qrrt,
            PlannerSettings::new().with_seed(1),
        )
        .unwrap();
        assert_eq!(seq.solve_iterations(100), SolveStatus::InvalidStart);
        assert_eq!(seq.level(0).base().roadmap.num_vertices(), 0);
    }

    #[test]
    fn test_projection_mismatch_rejected() {
        let level0 = unit_square_level();
        let level1 = unit_square_level();
        let problem = simple_problem(level1.space.clone());
        let bad = Projection::DropTail {
            base_len: 3,
            fiber_len: 1,
        };
        let result = BundleSequence::new(
            vec![
                LevelSpec::new(level0, None),
                LevelSpec::new(level1, Some(bad)),
            ],
            problem,
            PlannerKind::Qrrt,
            PlannerSettings::new(),
        );
        assert!(matches!(result, Err(PlannerError::Configuration(_))));
    }

    #[test]
    fn test_base_level_with_projection_rejected() {
        let level = unit_square_level();
        let problem = simple_problem(level.space.clone());
        let result = BundleSequence::new(
            vec![LevelSpec::new(level, Some(Projection::Identity { len: 2 }))],
            problem,
            PlannerKind::Qrrt,
            PlannerSettings::new(),
        );
        assert!(result.is_err());
    }
}
