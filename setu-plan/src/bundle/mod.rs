//! Bundle-space decomposition: projections between adjacent levels.

mod projection;

pub use projection::Projection;
