//! Propagator strategies: how a level steers from one state toward another.

use log::trace;

use crate::core::problem::MotionValidator;
use crate::core::state::State;
use crate::error::{PlannerError, Result};

/// Steering substitution for a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagator {
    /// Straight-line steering validated by the motion checker.
    Geometric,
    /// Reserved for control-space models; refuses every pair until a
    /// controller backend exists.
    Dynamic,
}

impl Propagator {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "geometric" => Ok(Propagator::Geometric),
            "dynamic" => Ok(Propagator::Dynamic),
            other => Err(PlannerError::Configuration(format!(
                "unknown propagator: {other}"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Propagator::Geometric => "geometric",
            Propagator::Dynamic => "dynamic",
        }
    }

    /// Attempt to drive from `from` to `to`; on success writes the reached
    /// state into `out` and returns `true`.
    pub fn steer(
        &self,
        motion: &dyn MotionValidator,
        from: &State,
        to: &State,
        out: &mut State,
    ) -> bool {
        match self {
            Propagator::Geometric => {
                if motion.check_motion(from, to) {
                    out.copy_from(to);
                    true
                } else {
                    false
                }
            }
            Propagator::Dynamic => {
                trace!("[Propagator] dynamic steering has no controller, refusing pair");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::problem::{DiscreteMotionValidator, FnValidityChecker};
    use crate::core::space::{RealVectorSpace, StateSpace};
    use std::sync::Arc;

    #[test]
    fn test_geometric_steer_respects_motion_check() {
        let space = Arc::new(RealVectorSpace::cube(1, 0.0, 1.0));
        let validity = Arc::new(FnValidityChecker(|s: &State| s.values()[0] < 0.6));
        let mv = DiscreteMotionValidator::new(space.clone(), validity, 0.01);

        let a = State::new(vec![0.0]);
        let ok = State::new(vec![0.5]);
        let blocked = State::new(vec![0.9]);
        let mut out = space.alloc_state();

        assert!(Propagator::Geometric.steer(&mv, &a, &ok, &mut out));
        assert_eq!(out, ok);
        assert!(!Propagator::Geometric.steer(&mv, &a, &blocked, &mut out));
    }

    #[test]
    fn test_dynamic_refuses() {
        let space = Arc::new(RealVectorSpace::cube(1, 0.0, 1.0));
        let validity = Arc::new(FnValidityChecker(|_: &State| true));
        let mv = DiscreteMotionValidator::new(space.clone(), validity, 0.01);
        let a = State::new(vec![0.0]);
        let b = State::new(vec![0.5]);
        let mut out = space.alloc_state();
        assert!(!Propagator::Dynamic.steer(&mv, &a, &b, &mut out));
    }
}
