//! Error types for SetuPlan.

use thiserror::Error;

/// SetuPlan error type.
///
/// Planning *outcomes* (no solution yet, termination condition fired) are
/// reported through [`crate::SolveStatus`], never through this enum. Errors
/// here are structural: the problem or the planner configuration is broken,
/// or an internal invariant did not hold.
#[derive(Error, Debug)]
pub enum PlannerError {
    /// Missing or invalid start/goal specification.
    #[error("invalid problem: {0}")]
    InvalidProblem(String),

    /// Unknown strategy name, incompatible projection dimensions, bad tunable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A structural invariant was violated (orphaned tree node,
    /// index/graph disagreement). Always a bug.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
