//! Sparse spanner, path-visibility equivalence and path-class enumeration.

pub mod enumerate;
pub mod spanner;
pub mod visibility;

pub use enumerate::{Enumerator, remove_reducible_loops};
pub use spanner::{SparseRoadmap, SparseVertex};
pub use visibility::PathVisibilityChecker;
