//! Projections between adjacent bundle levels.
//!
//! A projection maps a total-space state `x` in `X_k` down to a base-space
//! state in `X_{k-1}`; the coordinates it forgets form the fiber `F_k`.
//! `merge` runs the other way: a base state plus fiber coordinates
//! reassemble a total state, with `project(merge(b, f)) == b` always.

use crate::core::space::{StateSpace, quat_from_euler, quat_to_euler};
use crate::core::state::State;
use crate::error::{PlannerError, Result};

/// A slot-level projection between two adjacent bundle levels.
///
/// Variants carry explicit slot counts so that `project`/`merge` are pure
/// coordinate shuffles; compatibility with the actual spaces is checked once
/// at construction via [`Projection::validate`].
#[derive(Debug, Clone)]
pub enum Projection {
    /// Base equals total; the fiber is empty and `merge` is the identity lift.
    Identity { len: usize },
    /// Forget the trailing `fiber_len` coordinates of a vector state.
    DropTail { base_len: usize, fiber_len: usize },
    /// `SE(2) -> R^2`: forget the heading.
    Se2ToR2,
    /// `SE(3) -> R^3`: forget the orientation quaternion.
    Se3ToR3,
    /// `SO(3) -> SO(2)`: keep only the yaw; the fiber is the remaining tilt.
    So3ToSo2,
    /// Component-wise product of projections over a compound state.
    Product(Vec<Projection>),
}

impl Projection {
    /// Slot count of a base-space state.
    pub fn base_len(&self) -> usize {
        match self {
            Projection::Identity { len } => *len,
            Projection::DropTail { base_len, .. } => *base_len,
            Projection::Se2ToR2 => 2,
            Projection::Se3ToR3 => 3,
            Projection::So3ToSo2 => 1,
            Projection::Product(parts) => parts.iter().map(|p| p.base_len()).sum(),
        }
    }

    /// Slot count of a total-space state.
    pub fn total_len(&self) -> usize {
        match self {
            Projection::Identity { len } => *len,
            Projection::DropTail {
                base_len,
                fiber_len,
            } => base_len + fiber_len,
            Projection::Se2ToR2 => 3,
            Projection::Se3ToR3 => 7,
            Projection::So3ToSo2 => 4,
            Projection::Product(parts) => parts.iter().map(|p| p.total_len()).sum(),
        }
    }

    /// Slot count of a fiber state.
    pub fn fiber_len(&self) -> usize {
        match self {
            Projection::Identity { .. } => 0,
            Projection::DropTail { fiber_len, .. } => *fiber_len,
            Projection::Se2ToR2 => 1,
            Projection::Se3ToR3 => 4,
            // full quaternion; merge overrides its yaw with the base angle
            Projection::So3ToSo2 => 4,
            Projection::Product(parts) => parts.iter().map(|p| p.fiber_len()).sum(),
        }
    }

    /// Degrees of freedom of the fiber.
    pub fn fiber_dimension(&self) -> usize {
        match self {
            Projection::Identity { .. } => 0,
            Projection::DropTail { fiber_len, .. } => *fiber_len,
            Projection::Se2ToR2 => 1,
            Projection::Se3ToR3 => 3,
            Projection::So3ToSo2 => 2,
            Projection::Product(parts) => parts.iter().map(|p| p.fiber_dimension()).sum(),
        }
    }

    /// Check that the slot counts match the spaces this projection is wired
    /// between.
    pub fn validate(&self, base: &dyn StateSpace, total: &dyn StateSpace) -> Result<()> {
        if base.value_count() != self.base_len() {
            return Err(PlannerError::Configuration(format!(
                "projection expects a {}-slot base space, got {}",
                self.base_len(),
                base.value_count()
            )));
        }
        if total.value_count() != self.total_len() {
            return Err(PlannerError::Configuration(format!(
                "projection expects a {}-slot total space, got {}",
                self.total_len(),
                total.value_count()
            )));
        }
        Ok(())
    }

    /// Project a total-space state down to the base.
    pub fn project(&self, total: &State, base: &mut State) {
        debug_assert_eq!(total.len(), self.total_len());
        debug_assert_eq!(base.len(), self.base_len());
        self.project_slices(total.values(), base.values_mut());
    }

    /// Reassemble a total-space state from base and fiber coordinates.
    pub fn merge(&self, base: &State, fiber: &State, total: &mut State) {
        debug_assert_eq!(base.len(), self.base_len());
        debug_assert_eq!(fiber.len(), self.fiber_len());
        debug_assert_eq!(total.len(), self.total_len());
        self.merge_slices(base.values(), fiber.values(), total.values_mut());
    }

    /// Extract the fiber coordinates of a total-space state.
    ///
    /// Drawing a uniform total-space sample and extracting its fiber is the
    /// planner's way of sampling the fiber uniformly without a dedicated
    /// fiber space.
    pub fn extract_fiber(&self, total: &State, fiber: &mut State) {
        debug_assert_eq!(total.len(), self.total_len());
        debug_assert_eq!(fiber.len(), self.fiber_len());
        self.fiber_slices(total.values(), fiber.values_mut());
    }

    fn project_slices(&self, total: &[f64], base: &mut [f64]) {
        match self {
            Projection::Identity { .. } => base.copy_from_slice(total),
            Projection::DropTail { base_len, .. } => base.copy_from_slice(&total[..*base_len]),
            Projection::Se2ToR2 => base.copy_from_slice(&total[..2]),
            Projection::Se3ToR3 => base.copy_from_slice(&total[..3]),
            Projection::So3ToSo2 => {
                let (_, _, yaw) = quat_to_euler(total);
                base[0] = yaw;
            }
            Projection::Product(parts) => {
                let (mut to, mut bo) = (0, 0);
                for p in parts {
                    p.project_slices(
                        &total[to..to + p.total_len()],
                        &mut base[bo..bo + p.base_len()],
                    );
                    to += p.total_len();
                    bo += p.base_len();
                }
            }
        }
    }

    fn merge_slices(&self, base: &[f64], fiber: &[f64], total: &mut [f64]) {
        match self {
            Projection::Identity { .. } => total.copy_from_slice(base),
            Projection::DropTail { base_len, .. } => {
                total[..*base_len].copy_from_slice(base);
                total[*base_len..].copy_from_slice(fiber);
            }
            Projection::Se2ToR2 => {
                total[..2].copy_from_slice(base);
                total[2] = fiber[0];
            }
            Projection::Se3ToR3 => {
                total[..3].copy_from_slice(base);
                total[3..].copy_from_slice(fiber);
            }
            Projection::So3ToSo2 => {
                let (roll, pitch, _) = quat_to_euler(fiber);
                quat_from_euler(roll, pitch, base[0], total);
            }
            Projection::Product(parts) => {
                let (mut to, mut bo, mut fo) = (0, 0, 0);
                for p in parts {
                    p.merge_slices(
                        &base[bo..bo + p.base_len()],
                        &fiber[fo..fo + p.fiber_len()],
                        &mut total[to..to + p.total_len()],
                    );
                    to += p.total_len();
                    bo += p.base_len();
                    fo += p.fiber_len();
                }
            }
        }
    }

    fn fiber_slices(&self, total: &[f64], fiber: &mut [f64]) {
        match self {
            Projection::Identity { .. } => {}
            Projection::DropTail { base_len, .. } => fiber.copy_from_slice(&total[*base_len..]),
            Projection::Se2ToR2 => fiber[0] = total[2],
            Projection::Se3ToR3 => fiber.copy_from_slice(&total[3..]),
            Projection::So3ToSo2 => fiber.copy_from_slice(total),
            Projection::Product(parts) => {
                let (mut to, mut fo) = (0, 0);
                for p in parts {
                    p.fiber_slices(
                        &total[to..to + p.total_len()],
                        &mut fiber[fo..fo + p.fiber_len()],
                    );
                    to += p.total_len();
                    fo += p.fiber_len();
                }
            }
        }
    }

    /// Allocate a zeroed base-space state with the right slot count.
    pub fn alloc_base(&self) -> State {
        State::zeros(self.base_len())
    }

    /// Allocate a zeroed fiber state with the right slot count.
    pub fn alloc_fiber(&self) -> State {
        State::zeros(self.fiber_len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_merge_is_lift() {
        let p = Projection::Identity { len: 3 };
        assert_eq!(p.fiber_dimension(), 0);
        let base = State::new(vec![1.0, 2.0, 3.0]);
        let fiber = p.alloc_fiber();
        let mut total = State::zeros(3);
        p.merge(&base, &fiber, &mut total);
        assert_eq!(total, base);
    }

    #[test]
    fn test_drop_tail_round_trip() {
        let p = Projection::DropTail {
            base_len: 3,
            fiber_len: 3,
        };
        let total = State::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mut base = p.alloc_base();
        let mut fiber = p.alloc_fiber();
        p.project(&total, &mut base);
        p.extract_fiber(&total, &mut fiber);
        assert_eq!(base.values(), &[1.0, 2.0, 3.0]);
        assert_eq!(fiber.values(), &[4.0, 5.0, 6.0]);

        let mut rebuilt = State::zeros(6);
        p.merge(&base, &fiber, &mut rebuilt);
        assert_eq!(rebuilt, total);
    }

    #[test]
    fn test_se2_round_trip() {
        let p = Projection::Se2ToR2;
        let total = State::new(vec![0.3, 0.7, 1.2]);
        let mut base = p.alloc_base();
        p.project(&total, &mut base);
        assert_eq!(base.values(), &[0.3, 0.7]);
        let mut rebuilt = State::zeros(3);
        p.merge(&base, &State::new(vec![1.2]), &mut rebuilt);
        assert_eq!(rebuilt, total);
    }

    #[test]
    fn test_so3_to_so2_projects_merge() {
        let p = Projection::So3ToSo2;
        let mut q = State::zeros(4);
        quat_from_euler(0.2, -0.1, 0.8, q.values_mut());

        let base = State::new(vec![1.4]);
        let mut total = State::zeros(4);
        p.merge(&base, &q, &mut total);

        // project(merge(b, f)) == b
        let mut back = p.alloc_base();
        p.project(&total, &mut back);
        assert_relative_eq!(back.values()[0], 1.4, epsilon = 1e-9);

        // the tilt part came from the fiber
        let (roll, pitch, _) = quat_to_euler(total.values());
        assert_relative_eq!(roll, 0.2, epsilon = 1e-9);
        assert_relative_eq!(pitch, -0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_product_composition() {
        // SE(2) x R^2 -> R^2 x R^2 (keep positions, forget heading)
        let p = Projection::Product(vec![
            Projection::Se2ToR2,
            Projection::Identity { len: 2 },
        ]);
        assert_eq!(p.total_len(), 5);
        assert_eq!(p.base_len(), 4);
        assert_eq!(p.fiber_len(), 1);

        let total = State::new(vec![1.0, 2.0, 0.5, 3.0, 4.0]);
        let mut base = p.alloc_base();
        let mut fiber = p.alloc_fiber();
        p.project(&total, &mut base);
        p.extract_fiber(&total, &mut fiber);
        assert_eq!(base.values(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(fiber.values(), &[0.5]);

        let mut rebuilt = State::zeros(5);
        p.merge(&base, &fiber, &mut rebuilt);
        assert_eq!(rebuilt, total);
    }

    #[test]
    fn test_validate_rejects_mismatch() {
        use crate::core::space::RealVectorSpace;
        let p = Projection::DropTail {
            base_len: 2,
            fiber_len: 1,
        };
        let base = RealVectorSpace::cube(3, 0.0, 1.0);
        let total = RealVectorSpace::cube(3, 0.0, 1.0);
        assert!(p.validate(&base, &total).is_err());
    }
}
