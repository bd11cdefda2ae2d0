//! Problem interfaces: validity, motion checking, goals and problem
//! definitions.
//!
//! Collision checking itself is the caller's business; the planner only sees
//! the boolean capabilities defined here.

use std::sync::Arc;

use rand::rngs::StdRng;

use super::cost::OptimizationObjective;
use super::space::StateSpace;
use super::state::State;

/// Point-wise state validity (collision/constraint check).
pub trait ValidityChecker {
    fn is_valid(&self, s: &State) -> bool;
}

/// A checker that accepts every state.
pub struct AlwaysValid;

impl ValidityChecker for AlwaysValid {
    fn is_valid(&self, _s: &State) -> bool {
        true
    }
}

/// Validity of a checker backed by a closure; convenient for tests and
/// simple geometric worlds.
pub struct FnValidityChecker<F: Fn(&State) -> bool>(pub F);

impl<F: Fn(&State) -> bool> ValidityChecker for FnValidityChecker<F> {
    fn is_valid(&self, s: &State) -> bool {
        (self.0)(s)
    }
}

/// Local-planner feasibility of the straight motion between two states.
pub trait MotionValidator {
    fn check_motion(&self, a: &State, b: &State) -> bool;
}

/// Discretized motion validator: walks the geodesic at a fixed resolution
/// and point-checks every interpolated state, endpoints included.
pub struct DiscreteMotionValidator {
    space: Arc<dyn StateSpace>,
    validity: Arc<dyn ValidityChecker>,
    resolution: f64,
}

impl DiscreteMotionValidator {
    /// `resolution` is the step length in distance units; non-positive values
    /// fall back to 1% of the space extent.
    pub fn new(
        space: Arc<dyn StateSpace>,
        validity: Arc<dyn ValidityChecker>,
        resolution: f64,
    ) -> Self {
        let resolution = if resolution > 0.0 {
            resolution
        } else {
            0.01 * space.maximum_extent()
        };
        Self {
            space,
            validity,
            resolution,
        }
    }
}

impl MotionValidator for DiscreteMotionValidator {
    fn check_motion(&self, a: &State, b: &State) -> bool {
        if !self.validity.is_valid(a) || !self.validity.is_valid(b) {
            return false;
        }
        let d = self.space.distance(a, b);
        if d <= self.resolution {
            return true;
        }
        let steps = (d / self.resolution).ceil() as usize;
        let mut probe = self.space.alloc_state();
        for i in 1..steps {
            let t = i as f64 / steps as f64;
            self.space.interpolate(a, b, t, &mut probe);
            if !self.validity.is_valid(&probe) {
                return false;
            }
        }
        true
    }
}

/// Goal test. `is_satisfied` also reports the distance to the goal set so
/// planners can track approximate solutions.
pub trait Goal {
    fn is_satisfied(&self, s: &State) -> (bool, f64);

    /// Draw a state from the goal set, when the goal is sampleable.
    fn sample_goal(&self, rng: &mut StdRng) -> Option<State> {
        let _ = rng;
        None
    }
}

/// Ball-shaped sampleable goal region around a center state.
pub struct GoalRegion {
    space: Arc<dyn StateSpace>,
    center: State,
    threshold: f64,
}

impl GoalRegion {
    pub fn new(space: Arc<dyn StateSpace>, center: State, threshold: f64) -> Self {
        Self {
            space,
            center,
            threshold,
        }
    }

    pub fn center(&self) -> &State {
        &self.center
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Goal for GoalRegion {
    fn is_satisfied(&self, s: &State) -> (bool, f64) {
        let d = self.space.distance(s, &self.center);
        (d <= self.threshold, d)
    }

    fn sample_goal(&self, rng: &mut StdRng) -> Option<State> {
        let mut out = self.space.alloc_state();
        if self.threshold > 0.0 {
            self.space
                .sample_uniform_near(&self.center, self.threshold, rng, &mut out);
            // near-sampling is per-axis; pull corner cases back into the ball
            let d = self.space.distance(&out, &self.center);
            if d > self.threshold {
                let mut pulled = self.space.alloc_state();
                self.space
                    .interpolate(&self.center, &out, 0.999 * self.threshold / d, &mut pulled);
                out = pulled;
            }
        } else {
            out.copy_from(&self.center);
        }
        Some(out)
    }
}

/// The capability bundle one level plans in: its space plus the validity and
/// motion checkers the caller supplies for that level.
#[derive(Clone)]
pub struct LevelSpace {
    pub space: Arc<dyn StateSpace>,
    pub validity: Arc<dyn ValidityChecker>,
    pub motion: Arc<dyn MotionValidator>,
}

impl LevelSpace {
    pub fn new(
        space: Arc<dyn StateSpace>,
        validity: Arc<dyn ValidityChecker>,
        motion: Arc<dyn MotionValidator>,
    ) -> Self {
        Self {
            space,
            validity,
            motion,
        }
    }

    /// Convenience constructor wiring a [`DiscreteMotionValidator`] at the
    /// given resolution over the supplied validity checker.
    pub fn with_discrete_motion(
        space: Arc<dyn StateSpace>,
        validity: Arc<dyn ValidityChecker>,
        resolution: f64,
    ) -> Self {
        let motion = Arc::new(DiscreteMotionValidator::new(
            space.clone(),
            validity.clone(),
            resolution,
        ));
        Self {
            space,
            validity,
            motion,
        }
    }

    #[inline]
    pub fn is_valid(&self, s: &State) -> bool {
        self.validity.is_valid(s)
    }

    #[inline]
    pub fn check_motion(&self, a: &State, b: &State) -> bool {
        self.motion.check_motion(a, b)
    }

    #[inline]
    pub fn distance(&self, a: &State, b: &State) -> f64 {
        self.space.distance(a, b)
    }
}

/// What the caller wants solved on the finest level: start states, a goal,
/// and an optional optimization objective (path length when absent).
pub struct ProblemDefinition {
    pub starts: Vec<State>,
    pub goal: Arc<dyn Goal>,
    pub objective: Option<Arc<dyn OptimizationObjective>>,
}

impl ProblemDefinition {
    pub fn new(start: State, goal: Arc<dyn Goal>) -> Self {
        Self {
            starts: vec![start],
            goal,
            objective: None,
        }
    }

    pub fn with_objective(mut self, objective: Arc<dyn OptimizationObjective>) -> Self {
        self.objective = Some(objective);
        self
    }
}
