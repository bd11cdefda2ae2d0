//! Path costs and optimization objectives.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::space::StateSpace;
use super::state::State;

/// Scalar cost of a motion or a path prefix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cost(pub f64);

impl Cost {
    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

/// How motions are priced and costs ordered.
///
/// Tree planners accumulate costs with [`combine`](Self::combine) and compare
/// with [`is_better_than`](Self::is_better_than); the A\* heuristic must
/// never overestimate [`motion_cost`](Self::motion_cost).
pub trait OptimizationObjective {
    fn motion_cost(&self, a: &State, b: &State) -> Cost;

    fn motion_cost_heuristic(&self, a: &State, b: &State) -> Cost;

    fn combine(&self, a: Cost, b: Cost) -> Cost {
        Cost(a.0 + b.0)
    }

    fn is_better_than(&self, a: Cost, b: Cost) -> bool {
        a.0 < b.0
    }

    fn identity(&self) -> Cost {
        Cost(0.0)
    }

    fn infinite(&self) -> Cost {
        Cost(f64::INFINITY)
    }
}

/// Path-length objective: motion cost is geodesic distance.
pub struct PathLengthObjective {
    space: Arc<dyn StateSpace>,
}

impl PathLengthObjective {
    pub fn new(space: Arc<dyn StateSpace>) -> Self {
        Self { space }
    }
}

impl OptimizationObjective for PathLengthObjective {
    fn motion_cost(&self, a: &State, b: &State) -> Cost {
        Cost(self.space.distance(a, b))
    }

    fn motion_cost_heuristic(&self, a: &State, b: &State) -> Cost {
        Cost(self.space.distance(a, b))
    }
}
