//! Path-class enumeration over the sparse graph.
//!
//! A depth-bounded DFS walks simple vertex paths from the sparse start to
//! the sparse goal. Every candidate is screened twice before it joins the
//! stack: it must project into an existing path class on the parent level,
//! and it must not be path-visibility-equivalent to a class already found.
//! Enumeration stops at the head size or after too many consecutive
//! rejections.

use std::sync::Arc;

use log::{debug, info};

use super::spanner::SparseRoadmap;
use super::visibility::PathVisibilityChecker;
use crate::bundle::Projection;
use crate::core::problem::LevelSpace;
use crate::core::state::State;
use crate::planners::ParentView;
use crate::roadmap::graph::SparseId;
use crate::roadmap::path::Path;

/// Consecutive rejections tolerated before enumeration gives up.
const MAX_FAILED_ADDS: u32 = 10;

/// Enumeration context for one level.
pub struct Enumerator<'a> {
    pub sparse: &'a SparseRoadmap,
    pub space: &'a LevelSpace,
    pub checker: &'a PathVisibilityChecker,
    /// Projection to the parent level, with the parent's view, when one
    /// exists.
    pub projection: Option<&'a Projection>,
    pub parent: Option<&'a ParentView<'a>>,
    pub n_head: usize,
}

impl<'a> Enumerator<'a> {
    /// Enumerate up to `n_head` pairwise-distinct path classes between the
    /// sparse start and goal.
    pub fn enumerate(&self) -> Vec<Arc<Path>> {
        let (Some(start), Some(goal)) = (self.sparse.v_start, self.sparse.v_goal) else {
            return Vec::new();
        };
        let mut walk = DfsState {
            visited: vec![false; self.sparse.num_vertices()],
            prefix: Vec::new(),
            stack: Vec::new(),
            failed_adds: 0,
        };
        self.dfs(start, goal, &mut walk);
        info!("[Enumerator] found {} path classes", walk.stack.len());
        walk.stack
    }

    fn dfs(&self, u: SparseId, goal: SparseId, walk: &mut DfsState) {
        if walk.stack.len() >= self.n_head || walk.failed_adds > MAX_FAILED_ADDS {
            return;
        }
        walk.visited[u.0] = true;
        walk.prefix.push(u);

        if u == goal {
            let states: Vec<State> = walk
                .prefix
                .iter()
                .map(|id| self.sparse.state(*id).clone())
                .collect();
            self.consider(Path::from_states(states), walk);
        } else {
            for &(next, _) in self.sparse.neighbors(u) {
                if walk.visited[next.0] {
                    continue;
                }
                self.dfs(next, goal, walk);
                if walk.stack.len() >= self.n_head || walk.failed_adds > MAX_FAILED_ADDS {
                    break;
                }
            }
        }

        walk.prefix.pop();
        walk.visited[u.0] = false;
    }

    /// Screen a candidate path and push it when it opens a new class.
    ///
    /// Candidates are kept as sampled: a line-of-sight shortcut could hop
    /// into a different class, which would defeat the distinctness test.
    fn consider(&self, candidate: Path, walk: &mut DfsState) {
        if !self.checker.check_validity(self.space, &candidate) {
            debug!("[Enumerator] rejected (infeasible chain)");
            walk.failed_adds += 1;
            return;
        }
        if !self.is_projectable(&candidate) {
            debug!("[Enumerator] rejected (not projectable)");
            walk.failed_adds += 1;
            return;
        }
        for (k, stacked) in walk.stack.iter().enumerate() {
            if self
                .checker
                .is_path_visible(self.space, &candidate, stacked)
            {
                debug!("[Enumerator] rejected (equal to path {k})");
                walk.failed_adds += 1;
                return;
            }
        }
        walk.stack.push(Arc::new(candidate));
        walk.failed_adds = 0;
    }

    /// Whether the candidate's projection lies in some path class of the
    /// parent level. Base levels are trivially projectable.
    fn is_projectable(&self, candidate: &Path) -> bool {
        self.projection_index(candidate).is_some()
    }

    /// Index of the parent path class the candidate projects into.
    pub fn projection_index(&self, candidate: &Path) -> Option<usize> {
        let (Some(projection), Some(parent)) = (self.projection, self.parent) else {
            return Some(0);
        };
        if parent.path_stack.is_empty() {
            return Some(0);
        }
        let projected = candidate.project(projection);
        let parent_checker = PathVisibilityChecker::new();
        for (k, class) in parent.path_stack.iter().enumerate() {
            if parent_checker.is_path_visible(parent.level_space, &projected, class) {
                return Some(k);
            }
        }
        None
    }
}

struct DfsState {
    visited: Vec<bool>,
    prefix: Vec<SparseId>,
    stack: Vec<Arc<Path>>,
    failed_adds: u32,
}

/// Remove reducible loops: a sparse edge whose two-hop detour through a
/// common neighbor is visibility-equivalent to the edge itself adds no path
/// class and is dropped before enumeration.
pub fn remove_reducible_loops(
    sparse: &mut SparseRoadmap,
    space: &LevelSpace,
    checker: &PathVisibilityChecker,
) {
    let edges: Vec<(SparseId, SparseId)> = sparse.edges().collect();
    for (v1, v2) in edges {
        if !sparse.has_edge(v1, v2) {
            continue;
        }
        let common: Vec<SparseId> = sparse
            .neighbors(v1)
            .iter()
            .map(|(n, _)| *n)
            .filter(|n| *n != v2 && sparse.has_edge(*n, v2))
            .collect();
        for v3 in common {
            let direct = Path::from_states(vec![
                sparse.state(v1).clone(),
                sparse.state(v2).clone(),
            ]);
            let detour = Path::from_states(vec![
                sparse.state(v1).clone(),
                sparse.state(v3).clone(),
                sparse.state(v2).clone(),
            ]);
            if checker.is_path_visible(space, &detour, &direct) {
                debug!("[Enumerator] removing reducible edge {v1:?} - {v2:?}");
                sparse.remove_edge(v1, v2);
                break;
            }
        }
    }
}
