//! Configuration store, nearest-neighbor index and the dense roadmap graph.

pub mod disjoint;
pub mod graph;
pub mod nearest;
pub mod path;

pub use disjoint::DisjointSets;
pub use graph::{ConfigId, Configuration, Roadmap, SparseId};
pub use nearest::NearestIndex;
pub use path::Path;
