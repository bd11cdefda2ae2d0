//! Per-level planners: QRRT, QRRT*, QMP and SQMP over a shared
//! [`BundleGraph`] core.
//!
//! A planner is a capability set, not a class hierarchy: the scheduler holds
//! `Box<dyn BundlePlanner>` handles and drives them one `grow` at a time,
//! passing a read-only [`ParentView`] of the level beneath for quotient
//! sampling.

pub mod base;
mod qmp;
mod qrrt;
mod qrrt_star;
mod sqmp;

use std::sync::Arc;

use serde::Serialize;

pub use base::BundleGraph;
pub use qmp::Qmp;
pub use qrrt::Qrrt;
pub use qrrt_star::QrrtStar;
pub use sqmp::Sqmp;

use crate::core::problem::LevelSpace;
use crate::roadmap::graph::Roadmap;
use crate::roadmap::path::Path;
use crate::strategies::GraphSampler;

/// Read-only window onto a parent level, handed to a child's `grow` for
/// quotient sampling and path restriction. Exactly one level is active at a
/// time, so no synchronization is involved.
pub struct ParentView<'a> {
    pub level_space: &'a LevelSpace,
    pub roadmap: &'a Roadmap,
    pub sampler: GraphSampler,
    /// Immutable snapshots of the parent's distinct solution paths.
    pub path_stack: &'a [Arc<Path>],
    pub selected_path: Option<usize>,
    /// Perturbation radius for path-stack sampling, in parent-space units.
    pub path_bias: f64,
    pub solution: Option<&'a Path>,
    pub has_solution: bool,
}

/// The capability set every per-level planner exposes to the scheduler.
pub trait BundlePlanner {
    fn name(&self) -> &'static str;

    fn base(&self) -> &BundleGraph;

    fn base_mut(&mut self) -> &mut BundleGraph;

    /// One growth iteration; runs to completion without suspension.
    fn grow(&mut self, parent: Option<&ParentView<'_>>);

    /// Extract (and cache) the level's current solution path.
    fn compute_solution(&mut self) -> Option<Arc<Path>>;

    /// Refresh the level's path stack after it found a solution. The default
    /// stacks the single solution path; sparse planners enumerate distinct
    /// path classes instead.
    fn update_path_stack(&mut self, parent: Option<&ParentView<'_>>) {
        let _ = parent;
        if let Some(path) = self.compute_solution() {
            let base = self.base_mut();
            base.path_stack = vec![path];
            base.selected_path = Some(0);
        }
    }

    fn clear(&mut self) {
        self.base_mut().clear();
    }

    /// Annotated graph export for this level.
    fn planner_data(&self) -> LevelData {
        self.base().level_data(self.name())
    }
}

/// Build the read-only sampling view of a planner's level.
pub fn parent_view<'a>(planner: &'a dyn BundlePlanner) -> ParentView<'a> {
    let base = planner.base();
    ParentView {
        level_space: &base.space,
        roadmap: &base.roadmap,
        sampler: base.sampler,
        path_stack: &base.path_stack,
        selected_path: base.selected_path,
        path_bias: base.path_bias(),
        solution: base.solution.as_deref(),
        has_solution: base.has_solution,
    }
}

/// Annotated multilevel graph export.
#[derive(Debug, Clone, Serialize)]
pub struct PlannerData {
    pub levels: Vec<LevelData>,
}

/// One level's annotated graph: every vertex and edge carries the level
/// index; `path_class` is the chain of selected class indices up the
/// hierarchy.
#[derive(Debug, Clone, Serialize)]
pub struct LevelData {
    pub level: usize,
    pub planner: String,
    pub path_class: Vec<i64>,
    pub num_path_classes: usize,
    pub vertices: Vec<VertexData>,
    pub edges: Vec<EdgeData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VertexData {
    pub values: Vec<f64>,
    pub is_start: bool,
    pub is_goal: bool,
    pub on_shortest_path: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeData {
    pub source: usize,
    pub target: usize,
    pub cost: f64,
}
