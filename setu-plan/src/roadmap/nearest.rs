//! Nearest-neighbor index over a level's live configurations.
//!
//! The index is the single source of truth for which configurations are
//! active on a level: every vertex in the roadmap graph appears here and
//! vice versa. Queries take the distance function as a closure so the same
//! index serves whichever metric strategy the level is configured with.
//!
//! Bundle levels have runtime-varying dimension and possibly non-Euclidean
//! metrics, which rules out const-dimension k-d structures; a linear
//! metric-space scan keeps the index exact for every metric.

use super::graph::ConfigId;
use crate::core::state::State;

/// Linear metric-space index of `(id, state)` entries.
#[derive(Debug, Clone, Default)]
pub struct NearestIndex {
    entries: Vec<(ConfigId, State)>,
}

impl NearestIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a configuration. The state is cloned; mutating a stored state
    /// requires `remove` followed by a fresh `add`.
    pub fn add(&mut self, id: ConfigId, state: State) {
        debug_assert!(!self.contains(id), "configuration already indexed");
        self.entries.push((id, state));
    }

    /// Remove a configuration; returns whether it was present.
    pub fn remove(&mut self, id: ConfigId) -> bool {
        if let Some(pos) = self.entries.iter().position(|(e, _)| *e == id) {
            self.entries.swap_remove(pos);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, id: ConfigId) -> bool {
        self.entries.iter().any(|(e, _)| *e == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all indexed configuration ids.
    pub fn ids(&self) -> impl Iterator<Item = ConfigId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// Closest entry to `target` under `dist`.
    pub fn nearest(
        &self,
        target: &State,
        dist: impl Fn(&State, &State) -> f64,
    ) -> Option<ConfigId> {
        let mut best: Option<(ConfigId, f64)> = None;
        for (id, state) in &self.entries {
            let d = dist(state, target);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((*id, d));
            }
        }
        best.map(|(id, _)| id)
    }

    /// The `k` closest entries, sorted by increasing distance.
    pub fn nearest_k(
        &self,
        target: &State,
        k: usize,
        dist: impl Fn(&State, &State) -> f64,
    ) -> Vec<ConfigId> {
        let mut scored: Vec<(ConfigId, f64)> = self
            .entries
            .iter()
            .map(|(id, state)| (*id, dist(state, target)))
            .collect();
        if k < scored.len() {
            // partial selection keeps large-roadmap queries linear
            scored.select_nth_unstable_by(k, |a, b| a.1.total_cmp(&b.1));
            scored.truncate(k);
        }
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.into_iter().map(|(id, _)| id).collect()
    }

    /// All entries within radius `r`, sorted by increasing distance.
    pub fn nearest_r(
        &self,
        target: &State,
        r: f64,
        dist: impl Fn(&State, &State) -> f64,
    ) -> Vec<ConfigId> {
        let mut scored: Vec<(ConfigId, f64)> = self
            .entries
            .iter()
            .filter_map(|(id, state)| {
                let d = dist(state, target);
                (d <= r).then_some((*id, d))
            })
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.into_iter().map(|(id, _)| id).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
