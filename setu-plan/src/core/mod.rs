//! Fundamental types: states, spaces, costs and problem interfaces.

pub mod cost;
pub mod problem;
pub mod space;
pub mod state;

pub use cost::{Cost, OptimizationObjective, PathLengthObjective};
pub use problem::{
    AlwaysValid, DiscreteMotionValidator, FnValidityChecker, Goal, GoalRegion, LevelSpace,
    MotionValidator, ProblemDefinition, ValidityChecker,
};
pub use space::{
    CompoundSpace, RealVectorSpace, So2Space, So3Space, StateSpace, normalize_angle, se2_space,
    se3_space,
};
pub use state::State;
