//! # SetuPlan: Multilevel Bundle-Space Motion Planning
//!
//! A sampling-based motion planning library that exploits a *bundle-space
//! decomposition* of the configuration space: a nested sequence of base
//! spaces `X0 ⊂ X1 ⊂ … ⊂ Xn = X`, each a projection of the next. Planning
//! runs on all levels at once under a cooperative importance-weighted
//! scheduler; solutions found on a cheap low-dimensional level bias the
//! sampling of the level above ("quotient sampling") until a path exists on
//! the full space.
//!
//! ## Planner families
//!
//! - [`PlannerKind::Qrrt`]: feasibility tree planner (RRT with quotient
//!   sampling)
//! - [`PlannerKind::QrrtStar`]: asymptotically optimal tree planner with
//!   choose-parent/rewire
//! - [`PlannerKind::Qmp`]: probabilistic roadmap with k-nearest connection
//! - [`PlannerKind::Sqmp`]: QMP plus a SPARS-style sparse spanner and
//!   homotopy-distinct path-class enumeration
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use setu_plan::config::PlannerSettings;
//! use setu_plan::core::{
//!     AlwaysValid, GoalRegion, LevelSpace, ProblemDefinition, RealVectorSpace, State, StateSpace,
//! };
//! use setu_plan::scheduler::{BundleSequence, LevelSpec, PlannerKind, SolveStatus};
//!
//! let space: Arc<dyn StateSpace> = Arc::new(RealVectorSpace::cube(2, 0.0, 1.0));
//! let level = LevelSpace::with_discrete_motion(space.clone(), Arc::new(AlwaysValid), 0.01);
//! let goal = Arc::new(GoalRegion::new(space, State::new(vec![0.9, 0.9]), 0.05));
//! let problem = ProblemDefinition::new(State::new(vec![0.1, 0.1]), goal);
//!
//! let mut planner = BundleSequence::new(
//!     vec![LevelSpec::new(level, None)],
//!     problem,
//!     PlannerKind::Qrrt,
//!     PlannerSettings::new().with_seed(1),
//! )
//! .unwrap();
//!
//! let status = planner.solve_iterations(1_000);
//! assert_eq!(status, SolveStatus::ExactSolution);
//! let path = planner.solution_path().unwrap();
//! assert!(path.len() >= 2);
//! ```
//!
//! ## Architecture
//!
//! The library is organized into modules:
//!
//! - [`core`]: states, state spaces, costs and the problem interfaces the
//!   caller implements (validity, motion checking, goals)
//! - [`bundle`]: projections between adjacent levels
//! - [`roadmap`]: configuration arena, nearest-neighbor index, dense graph
//!   with A\* and disjoint sets
//! - [`strategies`]: pluggable metric / importance / graph-sampler /
//!   propagator substitutions
//! - [`planners`]: the per-level planner variants over a shared core
//! - [`sparse`]: sparse spanner, path-visibility test, path-class
//!   enumeration
//! - [`scheduler`]: the bundle-sequence scheduler and path restriction
//!
//! The engine is single-threaded cooperative: exactly one level grows at a
//! time and the termination condition is polled between grows, never inside
//! one.

pub mod bundle;
pub mod config;
pub mod core;
pub mod error;
pub mod planners;
pub mod roadmap;
pub mod scheduler;
pub mod sparse;
pub mod strategies;

pub use crate::bundle::Projection;
pub use crate::config::PlannerSettings;
pub use crate::core::{LevelSpace, ProblemDefinition, State};
pub use crate::error::{PlannerError, Result};
pub use crate::planners::{BundlePlanner, PlannerData};
pub use crate::roadmap::Path;
pub use crate::scheduler::{BundleSequence, LevelSpec, PlannerKind, SolveStatus};
