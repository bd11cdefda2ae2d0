//! The dense roadmap graph a level grows into.
//!
//! Vertices are [`Configuration`] records held in an arena and referenced by
//! dense [`ConfigId`] indices; parent/child tree links are ids, never
//! references, so subtree rewires stay safe. Edges are undirected, weighted
//! by the optimization objective, and unite disjoint-set components.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use super::disjoint::DisjointSets;
use crate::core::cost::{Cost, OptimizationObjective};
use crate::core::state::State;

/// Dense index of a configuration within its level's roadmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigId(pub usize);

/// Index of a sparse-graph vertex (see the `sparse` module).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SparseId(pub usize);

/// One roadmap vertex: a state plus tree and spanner bookkeeping.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub state: State,
    pub id: ConfigId,
    /// Tree parent (tree planners only); the in-tree is rooted at the start.
    pub parent: Option<ConfigId>,
    pub children: Vec<ConfigId>,
    /// Cost from the tree root.
    pub cost: Cost,
    /// Cost of the edge to the parent.
    pub line_cost: Cost,
    pub is_start: bool,
    pub is_goal: bool,
    pub on_shortest_path: bool,
    pub total_connection_attempts: u32,
    pub successful_connection_attempts: u32,
    /// Sparse vertex whose visibility ball covers this configuration.
    pub representative: Option<SparseId>,
}

impl Configuration {
    fn new(id: ConfigId, state: State) -> Self {
        Self {
            state,
            id,
            parent: None,
            children: Vec::new(),
            cost: Cost(0.0),
            line_cost: Cost(0.0),
            is_start: false,
            is_goal: false,
            on_shortest_path: false,
            total_connection_attempts: 1,
            successful_connection_attempts: 0,
            representative: None,
        }
    }
}

/// Undirected weighted roadmap with disjoint-set component tracking.
#[derive(Debug, Clone, Default)]
pub struct Roadmap {
    configs: Vec<Configuration>,
    adjacency: Vec<Vec<(ConfigId, Cost)>>,
    num_edges: usize,
    sets: DisjointSets,
    /// Vertex chain of the last successful `shortest_path` query.
    shortest_vertex_path: Vec<ConfigId>,
}

impl Roadmap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, state: State) -> ConfigId {
        let id = ConfigId(self.configs.len());
        self.configs.push(Configuration::new(id, state));
        self.adjacency.push(Vec::new());
        let set = self.sets.make_set();
        debug_assert_eq!(set, id.0);
        id
    }

    /// Insert an undirected edge with the given cost and unite components.
    pub fn add_edge(&mut self, a: ConfigId, b: ConfigId, cost: Cost) {
        debug_assert_ne!(a, b);
        self.adjacency[a.0].push((b, cost));
        self.adjacency[b.0].push((a, cost));
        self.num_edges += 1;
        self.sets.union(a.0, b.0);
    }

    pub fn has_edge(&self, a: ConfigId, b: ConfigId) -> bool {
        self.adjacency[a.0].iter().any(|(n, _)| *n == b)
    }

    #[inline]
    pub fn config(&self, id: ConfigId) -> &Configuration {
        &self.configs[id.0]
    }

    #[inline]
    pub fn config_mut(&mut self, id: ConfigId) -> &mut Configuration {
        &mut self.configs[id.0]
    }

    #[inline]
    pub fn state(&self, id: ConfigId) -> &State {
        &self.configs[id.0].state
    }

    pub fn num_vertices(&self) -> usize {
        self.configs.len()
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    pub fn neighbors(&self, id: ConfigId) -> &[(ConfigId, Cost)] {
        &self.adjacency[id.0]
    }

    pub fn degree(&self, id: ConfigId) -> usize {
        self.adjacency[id.0].len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Configuration> {
        self.configs.iter()
    }

    /// Iterate undirected edges once each as `(a, b, cost)` with `a < b`.
    pub fn edges(&self) -> impl Iterator<Item = (ConfigId, ConfigId, Cost)> + '_ {
        self.adjacency.iter().enumerate().flat_map(|(i, nbrs)| {
            nbrs.iter()
                .filter(move |(j, _)| i < j.0)
                .map(move |(j, c)| (ConfigId(i), *j, *c))
        })
    }

    pub fn same_component(&mut self, a: ConfigId, b: ConfigId) -> bool {
        self.sets.same_set(a.0, b.0)
    }

    /// Vertex chain of the last successful A\* query, start to goal.
    pub fn shortest_vertex_path(&self) -> &[ConfigId] {
        &self.shortest_vertex_path
    }

    /// A\* query without side effects: returns the vertex chain and its
    /// accumulated cost, using `motion_cost_heuristic` as the admissible
    /// estimate and early-exiting once the goal is expanded.
    pub fn astar(
        &self,
        start: ConfigId,
        goal: ConfigId,
        objective: &dyn OptimizationObjective,
    ) -> Option<(Vec<ConfigId>, Cost)> {
        if start == goal {
            return Some((vec![start], objective.identity()));
        }
        let n = self.configs.len();
        let mut g = vec![objective.infinite(); n];
        let mut prev: Vec<Option<ConfigId>> = vec![None; n];
        let mut closed = vec![false; n];
        let mut open = BinaryHeap::new();

        g[start.0] = objective.identity();
        let h0 = objective.motion_cost_heuristic(self.state(start), self.state(goal));
        open.push(QueueEntry {
            f: objective.combine(g[start.0], h0).0,
            id: start,
        });

        while let Some(QueueEntry { id: current, .. }) = open.pop() {
            if current == goal {
                let mut chain = vec![goal];
                let mut cursor = goal;
                while let Some(p) = prev[cursor.0] {
                    chain.push(p);
                    cursor = p;
                }
                chain.reverse();
                debug_assert_eq!(chain[0], start);
                return Some((chain, g[goal.0]));
            }
            if closed[current.0] {
                continue;
            }
            closed[current.0] = true;

            for &(next, edge_cost) in &self.adjacency[current.0] {
                if closed[next.0] {
                    continue;
                }
                let tentative = objective.combine(g[current.0], edge_cost);
                if objective.is_better_than(tentative, g[next.0]) {
                    g[next.0] = tentative;
                    prev[next.0] = Some(current);
                    let h = objective.motion_cost_heuristic(self.state(next), self.state(goal));
                    open.push(QueueEntry {
                        f: objective.combine(tentative, h).0,
                        id: next,
                    });
                }
            }
        }
        None
    }

    /// A\* shortest path from `start` to `goal`, additionally marking
    /// `on_shortest_path` along the result and recording the vertex chain
    /// for planner-data export.
    pub fn shortest_path(
        &mut self,
        start: ConfigId,
        goal: ConfigId,
        objective: &dyn OptimizationObjective,
    ) -> Option<Vec<ConfigId>> {
        let (chain, _) = self.astar(start, goal, objective)?;
        for id in &chain {
            self.configs[id.0].on_shortest_path = true;
        }
        self.shortest_vertex_path = chain.clone();
        Some(chain)
    }

    pub fn clear(&mut self) {
        self.configs.clear();
        self.adjacency.clear();
        self.num_edges = 0;
        self.sets.clear();
        self.shortest_vertex_path.clear();
    }
}

/// Min-heap entry ordered by f-cost.
struct QueueEntry {
    f: f64,
    id: ConfigId,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.id == other.id
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed: BinaryHeap is a max-heap, we want the smallest f on top
        other.f.total_cmp(&self.f)
    }
}
