//! SPARS-style sparse roadmap spanner over a level's dense roadmap.
//!
//! The spanner keeps a small guard graph whose shortest paths stay within a
//! stretch factor of the dense paths they summarize. Dense vertices point at
//! the sparse guard whose visibility ball covers them (their
//! *representative*); per-guard interface lists record which dense vertices
//! sit near the boundary between two guards, which is what the path-quality
//! criterion needs.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use log::trace;

use crate::core::cost::{Cost, OptimizationObjective};
use crate::core::problem::LevelSpace;
use crate::core::state::State;
use crate::roadmap::graph::{ConfigId, Roadmap, SparseId};
use crate::roadmap::nearest::NearestIndex;

/// One sparse guard vertex.
#[derive(Debug, Clone)]
pub struct SparseVertex {
    pub state: State,
    pub id: SparseId,
    pub is_start: bool,
    pub is_goal: bool,
    /// Dense vertices covered by this guard that support no interface.
    pub non_interface: BTreeSet<ConfigId>,
    /// For each sparse neighbor, the dense vertices supporting the shared
    /// interface.
    pub interface: BTreeMap<SparseId, BTreeSet<ConfigId>>,
}

/// Sparse spanner graph with its own disjoint sets and representative
/// bookkeeping.
pub struct SparseRoadmap {
    vertices: Vec<SparseVertex>,
    adjacency: Vec<Vec<(SparseId, Cost)>>,
    num_edges: usize,
    set_parent: Vec<usize>,
    pub sparse_delta: f64,
    pub dense_delta: f64,
    pub stretch: f64,
    pub v_start: Option<SparseId>,
    pub v_goal: Option<SparseId>,
    pub consecutive_failures: u32,
}

impl SparseRoadmap {
    pub fn new(sparse_delta: f64, dense_delta: f64, stretch: f64) -> Self {
        Self {
            vertices: Vec::new(),
            adjacency: Vec::new(),
            num_edges: 0,
            set_parent: Vec::new(),
            sparse_delta,
            dense_delta,
            stretch,
            v_start: None,
            v_goal: None,
            consecutive_failures: 0,
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    pub fn vertex(&self, id: SparseId) -> &SparseVertex {
        &self.vertices[id.0]
    }

    pub fn vertex_mut(&mut self, id: SparseId) -> &mut SparseVertex {
        &mut self.vertices[id.0]
    }

    pub fn state(&self, id: SparseId) -> &State {
        &self.vertices[id.0].state
    }

    pub fn iter(&self) -> impl Iterator<Item = &SparseVertex> {
        self.vertices.iter()
    }

    pub fn neighbors(&self, id: SparseId) -> &[(SparseId, Cost)] {
        &self.adjacency[id.0]
    }

    pub fn has_edge(&self, a: SparseId, b: SparseId) -> bool {
        self.adjacency[a.0].iter().any(|(n, _)| *n == b)
    }

    /// Iterate undirected edges once each, `a < b`.
    pub fn edges(&self) -> impl Iterator<Item = (SparseId, SparseId)> + '_ {
        self.adjacency.iter().enumerate().flat_map(|(i, nbrs)| {
            nbrs.iter()
                .filter(move |(j, _)| i < j.0)
                .map(move |(j, _)| (SparseId(i), *j))
        })
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.set_parent[root] != root {
            root = self.set_parent[root];
        }
        let mut cur = x;
        while self.set_parent[cur] != root {
            let next = self.set_parent[cur];
            self.set_parent[cur] = root;
            cur = next;
        }
        root
    }

    pub fn same_component(&mut self, a: SparseId, b: SparseId) -> bool {
        self.find(a.0) == self.find(b.0)
    }

    /// Insert a bare guard (no representative maintenance; used for seeding
    /// the start/goal guards and by the add-criteria internally).
    pub fn add_guard(&mut self, state: State) -> SparseId {
        let id = SparseId(self.vertices.len());
        self.vertices.push(SparseVertex {
            state,
            id,
            is_start: false,
            is_goal: false,
            non_interface: BTreeSet::new(),
            interface: BTreeMap::new(),
        });
        self.adjacency.push(Vec::new());
        self.set_parent.push(id.0);
        self.consecutive_failures = 0;
        id
    }

    pub fn add_edge(&mut self, a: SparseId, b: SparseId, cost: Cost) {
        debug_assert_ne!(a, b);
        if self.has_edge(a, b) {
            return;
        }
        self.adjacency[a.0].push((b, cost));
        self.adjacency[b.0].push((a, cost));
        self.num_edges += 1;
        let (ra, rb) = (self.find(a.0), self.find(b.0));
        if ra != rb {
            self.set_parent[rb] = ra;
        }
    }

    /// Remove an edge; component tracking is left untouched (removal here is
    /// only ever applied to reducible triangle edges, which cannot
    /// disconnect the graph).
    pub fn remove_edge(&mut self, a: SparseId, b: SparseId) {
        let before = self.adjacency[a.0].len();
        self.adjacency[a.0].retain(|(n, _)| *n != b);
        self.adjacency[b.0].retain(|(n, _)| *n != a);
        if self.adjacency[a.0].len() < before {
            self.num_edges -= 1;
        }
    }

    /// All guards within `r` of `q`, sorted by increasing distance.
    pub fn nearest_r(&self, space: &LevelSpace, q: &State, r: f64) -> Vec<SparseId> {
        let mut scored: Vec<(SparseId, f64)> = self
            .vertices
            .iter()
            .filter_map(|v| {
                let d = space.distance(&v.state, q);
                (d <= r).then_some((v.id, d))
            })
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.into_iter().map(|(id, _)| id).collect()
    }

    /// Guards within `sparse_delta`, and the subset visible from `q`.
    pub fn find_graph_neighbors(
        &self,
        space: &LevelSpace,
        q: &State,
    ) -> (Vec<SparseId>, Vec<SparseId>) {
        let graph_neighborhood = self.nearest_r(space, q, self.sparse_delta);
        let visible = graph_neighborhood
            .iter()
            .copied()
            .filter(|id| space.check_motion(q, self.state(*id)))
            .collect();
        (graph_neighborhood, visible)
    }

    /// A\* over the sparse graph.
    pub fn astar(
        &self,
        start: SparseId,
        goal: SparseId,
        objective: &dyn OptimizationObjective,
    ) -> Option<(Vec<SparseId>, Cost)> {
        if start == goal {
            return Some((vec![start], objective.identity()));
        }
        let n = self.vertices.len();
        let mut g = vec![objective.infinite(); n];
        let mut prev: Vec<Option<SparseId>> = vec![None; n];
        let mut closed = vec![false; n];
        let mut open = BinaryHeap::new();
        g[start.0] = objective.identity();
        let h0 = objective.motion_cost_heuristic(self.state(start), self.state(goal));
        open.push(SparseQueueEntry {
            f: objective.combine(g[start.0], h0).0,
            id: start,
        });
        while let Some(SparseQueueEntry { id: current, .. }) = open.pop() {
            if current == goal {
                let mut chain = vec![goal];
                let mut cursor = goal;
                while let Some(p) = prev[cursor.0] {
                    chain.push(p);
                    cursor = p;
                }
                chain.reverse();
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
                    open.push(SparseQueueEntry {
                        f: objective.combine(tentative, h).0,
                        id: next,
                    });
                }
            }
        }
        None
    }

    // -----------------------------------------------------------------------
    // Guard insertion with representative maintenance
    // -----------------------------------------------------------------------

    /// Insert a guard and rewire the representative relation of every dense
    /// vertex the new guard may now cover.
    pub fn add_guard_with_representatives(
        &mut self,
        state: State,
        dense: &mut Roadmap,
        dense_nn: &NearestIndex,
        space: &LevelSpace,
    ) -> SparseId {
        let id = self.add_guard(state);
        self.update_representatives(id, dense, dense_nn, space);
        id
    }

    fn update_representatives(
        &mut self,
        new_guard: SparseId,
        dense: &mut Roadmap,
        dense_nn: &NearestIndex,
        space: &LevelSpace,
    ) {
        // dense samples whose coverage may have changed
        let radius = self.sparse_delta + self.dense_delta;
        let guard_state = self.state(new_guard).clone();
        let affected = dense_nn.nearest_r(&guard_state, radius, |a, b| space.distance(a, b));

        for &dense_id in &affected {
            self.remove_from_representatives(dense, dense_id);
            let covers = self.nearest_r(space, dense.state(dense_id), self.sparse_delta);
            let rep = covers
                .into_iter()
                .find(|g| space.check_motion(dense.state(dense_id), self.state(*g)));
            dense.config_mut(dense_id).representative = rep;
        }

        for &dense_id in &affected {
            let Some(rep) = dense.config(dense_id).representative else {
                continue;
            };
            let interface_reps = self.interface_neighbor_representatives(dense, space, dense_id);
            self.remove_from_representatives(dense, dense_id);
            self.add_to_representatives(dense_id, rep, &interface_reps);
        }
    }

    /// Representatives of dense-graph neighbors of `q` that live under a
    /// different guard within `dense_delta`.
    pub fn interface_neighbor_representatives(
        &self,
        dense: &Roadmap,
        space: &LevelSpace,
        q: ConfigId,
    ) -> BTreeSet<SparseId> {
        let rep = dense.config(q).representative;
        let mut out = BTreeSet::new();
        for &(n, _) in dense.neighbors(q) {
            let orep = dense.config(n).representative;
            if orep != rep
                && let Some(orep) = orep
                && space.distance(dense.state(q), dense.state(n)) < self.dense_delta
            {
                out.insert(orep);
            }
        }
        out
    }

    /// Dense-graph neighbors of `q` under a different guard within
    /// `dense_delta` (the interface support of `q`).
    pub fn interface_neighborhood(
        &self,
        dense: &Roadmap,
        space: &LevelSpace,
        q: ConfigId,
    ) -> Vec<ConfigId> {
        let rep = dense.config(q).representative;
        dense
            .neighbors(q)
            .iter()
            .filter_map(|&(n, _)| {
                (dense.config(n).representative != rep
                    && space.distance(dense.state(q), dense.state(n)) < self.dense_delta)
                    .then_some(n)
            })
            .collect()
    }

    /// Give a dense vertex its representative when insertion-time guard
    /// additions did not already cover it.
    pub fn assign_representative(&mut self, dense: &mut Roadmap, space: &LevelSpace, q: ConfigId) {
        if dense.config(q).representative.is_some() {
            return;
        }
        let covers = self.nearest_r(space, dense.state(q), self.sparse_delta);
        let rep = covers
            .into_iter()
            .find(|g| space.check_motion(dense.state(q), self.state(*g)));
        dense.config_mut(q).representative = rep;
        if let Some(rep) = rep {
            let interface_reps = self.interface_neighbor_representatives(dense, space, q);
            self.add_to_representatives(q, rep, &interface_reps);
        }
    }

    fn add_to_representatives(
        &mut self,
        q: ConfigId,
        rep: SparseId,
        interface_reps: &BTreeSet<SparseId>,
    ) {
        if interface_reps.is_empty() {
            self.vertex_mut(rep).non_interface.insert(q);
        } else {
            for &other in interface_reps {
                self.vertex_mut(rep)
                    .interface
                    .entry(other)
                    .or_default()
                    .insert(q);
            }
        }
    }

    fn remove_from_representatives(&mut self, dense: &Roadmap, q: ConfigId) {
        let Some(rep) = dense.config(q).representative else {
            return;
        };
        let vertex = self.vertex_mut(rep);
        vertex.non_interface.remove(&q);
        for support in vertex.interface.values_mut() {
            support.remove(&q);
        }
    }

    // -----------------------------------------------------------------------
    // SPARS add-criteria
    // -----------------------------------------------------------------------

    /// Coverage criterion: no visible guard within `sparse_delta`.
    pub fn check_add_coverage(
        &mut self,
        q: &State,
        visible: &[SparseId],
        dense: &mut Roadmap,
        dense_nn: &NearestIndex,
        space: &LevelSpace,
    ) -> bool {
        if !visible.is_empty() {
            return false;
        }
        self.add_guard_with_representatives(q.clone(), dense, dense_nn, space);
        true
    }

    /// Connectivity criterion: visible guards span several components.
    pub fn check_add_connectivity(
        &mut self,
        q: &State,
        visible: &[SparseId],
        dense: &mut Roadmap,
        dense_nn: &NearestIndex,
        space: &LevelSpace,
        objective: &dyn OptimizationObjective,
    ) -> bool {
        if visible.len() < 2 {
            return false;
        }
        let mut links: Vec<SparseId> = Vec::new();
        for i in 0..visible.len() {
            for j in (i + 1)..visible.len() {
                if !self.same_component(visible[i], visible[j]) {
                    links.push(visible[i]);
                    links.push(visible[j]);
                }
            }
        }
        if links.is_empty() {
            return false;
        }
        let v = self.add_guard_with_representatives(q.clone(), dense, dense_nn, space);
        for link in links {
            if !self.has_edge(v, link) && !self.same_component(v, link) {
                let cost = objective.motion_cost(self.state(v), self.state(link));
                self.add_edge(v, link, cost);
            }
        }
        true
    }

    /// Interface criterion: the two nearest guards are mutually visible
    /// through `q` but not edge-connected.
    pub fn check_add_interface(
        &mut self,
        q: &State,
        graph_neighborhood: &[SparseId],
        visible: &[SparseId],
        dense: &mut Roadmap,
        dense_nn: &NearestIndex,
        space: &LevelSpace,
        objective: &dyn OptimizationObjective,
    ) -> bool {
        if graph_neighborhood.len() < 2 || visible.len() < 2 {
            return false;
        }
        let (qn0, qn1) = (graph_neighborhood[0], graph_neighborhood[1]);
        let (qv0, qv1) = (visible[0], visible[1]);
        if qn0 != qv0 || qn1 != qv1 || self.has_edge(qv0, qv1) {
            return false;
        }
        if space.check_motion(self.state(qv0), self.state(qv1)) {
            let cost = objective.motion_cost(self.state(qv0), self.state(qv1));
            self.add_edge(qv0, qv1, cost);
            self.consecutive_failures = 0;
        } else {
            let v = self.add_guard_with_representatives(q.clone(), dense, dense_nn, space);
            let c0 = objective.motion_cost(self.state(v), self.state(qv0));
            let c1 = objective.motion_cost(self.state(v), self.state(qv1));
            self.add_edge(v, qv0, c0);
            self.add_edge(v, qv1, c1);
        }
        true
    }

    /// Path-quality criterion: `q` witnesses a dense shortcut that beats the
    /// spanner path by more than the stretch factor; the (shortcut) dense
    /// subpath joins the spanner.
    pub fn check_add_path(
        &mut self,
        q: ConfigId,
        dense: &mut Roadmap,
        dense_nn: &NearestIndex,
        space: &LevelSpace,
        objective: &dyn OptimizationObjective,
    ) -> bool {
        let neigh = self.interface_neighborhood(dense, space, q);
        if neigh.is_empty() {
            return false;
        }
        let Some(v) = dense.config(q).representative else {
            return false;
        };
        let n_rep: BTreeSet<SparseId> = neigh
            .iter()
            .filter_map(|&n| dense.config(n).representative)
            .collect();

        for &vp in &n_rep {
            let vpps = self.compute_vpp(v, vp);
            for &vpp in &vpps {
                // midpoint estimate of the spanner detour through v
                let mut s_max = 0.0f64;
                for x in self.compute_x(v, vp, vpp) {
                    let dist = (space.distance(self.state(x), self.state(v))
                        + space.distance(self.state(v), self.state(vp)))
                        / 2.0;
                    s_max = s_max.max(dist);
                }

                // cheapest dense interface-to-interface path through q
                let support: Vec<ConfigId> = self
                    .vertex(v)
                    .interface
                    .get(&vpp)
                    .map(|s| s.iter().copied().collect())
                    .unwrap_or_default();
                let mut best: Option<(Vec<ConfigId>, f64, ConfigId)> = None;
                for qpp in support {
                    if qpp == q {
                        best = Some((vec![q], 0.0, qpp));
                        continue;
                    }
                    if let Some((chain, _)) = dense.astar(q, qpp, objective) {
                        let length: f64 = chain
                            .windows(2)
                            .map(|w| space.distance(dense.state(w[0]), dense.state(w[1])))
                            .sum();
                        if best.as_ref().is_none_or(|(_, d, _)| length < *d) {
                            best = Some((chain, length, qpp));
                        }
                    }
                }

                let Some((chain, d_min, qpp)) = best else {
                    continue;
                };
                if s_max <= self.stretch * d_min {
                    continue;
                }
                let Some(na) = self.interface_neighbor(dense, space, q, vp) else {
                    continue;
                };
                let Some(nb) = self.interface_neighbor(dense, space, qpp, vpp) else {
                    continue;
                };
                let mut states: Vec<State> = Vec::with_capacity(chain.len() + 2);
                states.push(dense.state(na).clone());
                states.extend(chain.iter().map(|id| dense.state(*id).clone()));
                states.push(dense.state(nb).clone());

                trace!(
                    "[Spanner] path criterion fired: s_max={s_max:.4} > {} * {d_min:.4}",
                    self.stretch
                );
                self.add_path_to_spanner(&states, vp, vpp, dense, dense_nn, space, objective);
                return true;
            }
        }
        false
    }

    /// Sparse neighbors of `v` that are not adjacent to `vp`.
    fn compute_vpp(&self, v: SparseId, vp: SparseId) -> Vec<SparseId> {
        self.adjacency[v.0]
            .iter()
            .filter_map(|&(n, _)| (n != vp && !self.has_edge(n, vp)).then_some(n))
            .collect()
    }

    /// Interface-supporting neighbors of `vpp` adjacent to `v` but not `vp`,
    /// plus `vpp` itself.
    fn compute_x(&self, v: SparseId, vp: SparseId, vpp: SparseId) -> Vec<SparseId> {
        let mut xs: Vec<SparseId> = self.adjacency[vpp.0]
            .iter()
            .filter_map(|&(cx, _)| {
                (self.has_edge(cx, v)
                    && !self.has_edge(cx, vp)
                    && self
                        .vertex(vpp)
                        .interface
                        .get(&cx)
                        .is_some_and(|s| !s.is_empty()))
                .then_some(cx)
            })
            .collect();
        xs.push(vpp);
        xs
    }

    /// First dense-graph neighbor of `q` represented by `rep` within
    /// `dense_delta`.
    fn interface_neighbor(
        &self,
        dense: &Roadmap,
        space: &LevelSpace,
        q: ConfigId,
        rep: SparseId,
    ) -> Option<ConfigId> {
        dense.neighbors(q).iter().find_map(|&(n, _)| {
            (dense.config(n).representative == Some(rep)
                && space.distance(dense.state(q), dense.state(n)) <= self.dense_delta)
                .then_some(n)
        })
    }

    /// Shortcut the dense chain by line of sight and splice it into the
    /// spanner between `vp` and `vpp`.
    #[allow(clippy::too_many_arguments)]
    fn add_path_to_spanner(
        &mut self,
        states: &[State],
        vp: SparseId,
        vpp: SparseId,
        dense: &mut Roadmap,
        dense_nn: &NearestIndex,
        space: &LevelSpace,
        objective: &dyn OptimizationObjective,
    ) {
        if states.len() <= 1 {
            let cost = objective.motion_cost(self.state(vp), self.state(vpp));
            self.add_edge(vp, vpp, cost);
            return;
        }
        let reduced = crate::roadmap::path::Path::from_states(states.to_vec())
            .shortcut(space)
            .states()
            .to_vec();
        let mut added: Vec<SparseId> = Vec::with_capacity(reduced.len());
        for state in &reduced {
            added.push(self.add_guard_with_representatives(
                state.clone(),
                dense,
                dense_nn,
                space,
            ));
        }
        for w in added.windows(2) {
            let cost = objective.motion_cost(self.state(w[0]), self.state(w[1]));
            self.add_edge(w[0], w[1], cost);
        }
        let first = added[0];
        let last = *added.last().unwrap();
        let c_first = objective.motion_cost(self.state(first), self.state(vp));
        let c_last = objective.motion_cost(self.state(last), self.state(vpp));
        self.add_edge(first, vp, c_first);
        self.add_edge(last, vpp, c_last);
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.adjacency.clear();
        self.num_edges = 0;
        self.set_parent.clear();
        self.v_start = None;
        self.v_goal = None;
        self.consecutive_failures = 0;
    }
}

struct SparseQueueEntry {
    f: f64,
    id: SparseId,
}

impl PartialEq for SparseQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.id == other.id
    }
}

impl Eq for SparseQueueEntry {}

impl PartialOrd for SparseQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SparseQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.f.total_cmp(&self.f)
    }
}
