//! Discrete path-visibility test: the homotopy-style equivalence relation
//! behind path classes.
//!
//! Two paths with shared endpoints are *visible* to each other when the
//! straight interpolation sweeping one into the other stays valid: both are
//! resampled to the same number of arc-length waypoints and every rung
//! between corresponding waypoints must pass the motion checker.

use crate::core::problem::LevelSpace;
use crate::roadmap::path::Path;

/// Default number of rungs checked between two paths.
const DEFAULT_SAMPLES: usize = 23;

/// Checker for the path-visibility equivalence relation.
#[derive(Debug, Clone)]
pub struct PathVisibilityChecker {
    samples: usize,
}

impl Default for PathVisibilityChecker {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
        }
    }
}

impl PathVisibilityChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples.max(2);
        self
    }

    /// Whether every waypoint-to-waypoint motion along the path is valid.
    pub fn check_validity(&self, space: &LevelSpace, path: &Path) -> bool {
        path.states()
            .windows(2)
            .all(|w| space.check_motion(&w[0], &w[1]))
    }

    /// Whether `a` can be swept into `b` through valid straight rungs
    /// (endpoints held fixed). Visible paths belong to the same path class.
    pub fn is_path_visible(&self, space: &LevelSpace, a: &Path, b: &Path) -> bool {
        if a.is_empty() || b.is_empty() {
            return false;
        }
        let sa = a.resample(space.space.as_ref(), self.samples);
        let sb = b.resample(space.space.as_ref(), self.samples);
        for (pa, pb) in sa.states().iter().zip(sb.states()) {
            if !space.check_motion(pa, pb) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::problem::{AlwaysValid, FnValidityChecker};
    use crate::core::space::{RealVectorSpace, StateSpace};
    use crate::core::state::State;
    use std::sync::Arc;

    fn path(points: &[[f64; 2]]) -> Path {
        Path::from_states(points.iter().map(|p| State::new(p.to_vec())).collect())
    }

    #[test]
    fn test_paths_in_free_space_are_equivalent() {
        let space: Arc<dyn StateSpace> = Arc::new(RealVectorSpace::cube(2, 0.0, 1.0));
        let level = LevelSpace::with_discrete_motion(space, Arc::new(AlwaysValid), 0.01);
        let checker = PathVisibilityChecker::new();
        let a = path(&[[0.1, 0.1], [0.5, 0.2], [0.9, 0.9]]);
        let b = path(&[[0.1, 0.1], [0.2, 0.6], [0.9, 0.9]]);
        assert!(checker.is_path_visible(&level, &a, &b));
    }

    #[test]
    fn test_paths_around_obstacle_are_distinct() {
        let space: Arc<dyn StateSpace> = Arc::new(RealVectorSpace::cube(2, 0.0, 1.0));
        // disc obstacle in the middle
        let validity = Arc::new(FnValidityChecker(|s: &State| {
            let (x, y) = (s.values()[0] - 0.5, s.values()[1] - 0.5);
            x * x + y * y > 0.04
        }));
        let level = LevelSpace::with_discrete_motion(space, validity, 0.005);
        let checker = PathVisibilityChecker::new();
        // one path above the disc, one below
        let above = path(&[[0.1, 0.5], [0.5, 0.9], [0.9, 0.5]]);
        let below = path(&[[0.1, 0.5], [0.5, 0.1], [0.9, 0.5]]);
        assert!(!checker.is_path_visible(&level, &above, &below));
        // two paths on the same side stay equivalent
        let above2 = path(&[[0.1, 0.5], [0.4, 0.85], [0.9, 0.5]]);
        assert!(checker.is_path_visible(&level, &above, &above2));
    }

    #[test]
    fn test_check_validity() {
        let space: Arc<dyn StateSpace> = Arc::new(RealVectorSpace::cube(2, 0.0, 1.0));
        let validity = Arc::new(FnValidityChecker(|s: &State| s.values()[0] < 0.45));
        let level = LevelSpace::with_discrete_motion(space, validity, 0.01);
        let checker = PathVisibilityChecker::new();
        assert!(checker.check_validity(&level, &path(&[[0.1, 0.1], [0.4, 0.4]])));
        assert!(!checker.check_validity(&level, &path(&[[0.1, 0.1], [0.8, 0.4]])));
    }
}
