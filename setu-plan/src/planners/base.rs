//! Shared per-level planner core: the dense roadmap, nearest-neighbor index,
//! strategies, sampling and steering that every planner variant builds on.

use std::sync::Arc;

use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{EdgeData, LevelData, ParentView, VertexData};
use crate::bundle::Projection;
use crate::config::{LevelSettings, PlannerSettings};
use crate::core::cost::{Cost, OptimizationObjective};
use crate::core::problem::{Goal, LevelSpace};
use crate::core::state::State;
use crate::error::Result;
use crate::roadmap::graph::{ConfigId, Roadmap};
use crate::roadmap::nearest::NearestIndex;
use crate::roadmap::path::Path;
use crate::strategies::{GraphSampler, Importance, Metric, Propagator};

/// Strategy choices a planner variant starts from when the configuration
/// does not name a substitution.
pub struct StrategyDefaults {
    pub metric: Metric,
    pub importance: Importance,
    pub sampler: GraphSampler,
    pub propagator: Propagator,
}

/// Per-level planning state shared by all planner variants.
pub struct BundleGraph {
    pub level: usize,
    pub space: LevelSpace,
    /// Projection to the level beneath; `None` at the base level.
    pub projection: Option<Projection>,
    pub objective: Arc<dyn OptimizationObjective>,

    pub roadmap: Roadmap,
    pub nn: NearestIndex,

    pub metric: Metric,
    pub importance: Importance,
    pub sampler: GraphSampler,
    pub propagator: Propagator,

    pub rng: StdRng,

    pub q_start: Option<ConfigId>,
    pub q_goal: Option<ConfigId>,
    pub start_state: Option<State>,
    pub goal_state: Option<State>,
    pub goal: Option<Arc<dyn Goal>>,

    pub best_cost: Cost,
    pub has_solution: bool,
    pub first_run: bool,

    /// Cached solution path plus the vertex count it was computed at, so a
    /// grown roadmap invalidates the cache.
    pub solution: Option<Arc<Path>>,
    pub solution_vertex_count: usize,

    /// Immutable snapshots of distinct solution paths, observed read-only by
    /// the level above.
    pub path_stack: Vec<Arc<Path>>,
    pub selected_path: Option<usize>,

    settings: LevelSettings,
    range: f64,
    path_bias: f64,
    degenerate_warned: bool,
}

impl BundleGraph {
    pub fn new(
        level: usize,
        space: LevelSpace,
        projection: Option<Projection>,
        objective: Arc<dyn OptimizationObjective>,
        settings: &PlannerSettings,
        defaults: StrategyDefaults,
    ) -> Result<Self> {
        let metric = match &settings.strategies.metric {
            Some(name) => Metric::from_name(name)?,
            None => defaults.metric,
        };
        let importance = match &settings.strategies.importance {
            Some(name) => Importance::from_name(name)?,
            None => defaults.importance,
        };
        let sampler = match &settings.strategies.graph_sampler {
            Some(name) => GraphSampler::from_name(name)?,
            None => defaults.sampler,
        };
        let propagator = match &settings.strategies.propagator {
            Some(name) => Propagator::from_name(name)?,
            None => defaults.propagator,
        };

        let extent = space.space.maximum_extent();
        let mut range = if settings.level.range > 0.0 {
            settings.level.range
        } else {
            settings.level.range_fraction * extent
        };
        let mut degenerate_warned = false;
        if !(range > 0.0) {
            warn!(
                "[BundleGraph] level {level}: degenerate extension range ({range}), falling back to 1.0"
            );
            range = 1.0;
            degenerate_warned = true;
        }

        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(7919 * level as u64)),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            level,
            space,
            projection,
            objective,
            roadmap: Roadmap::new(),
            nn: NearestIndex::new(),
            metric,
            importance,
            sampler,
            propagator,
            rng,
            q_start: None,
            q_goal: None,
            start_state: None,
            goal_state: None,
            goal: None,
            best_cost: Cost(f64::INFINITY),
            has_solution: false,
            first_run: true,
            solution: None,
            solution_vertex_count: 0,
            path_stack: Vec::new(),
            selected_path: None,
            settings: settings.level.clone(),
            range,
            path_bias: settings.sparse.path_bias_fraction * extent,
            degenerate_warned,
        })
    }

    /// Bind the level's start/goal. States are inserted lazily on the first
    /// `grow` so an unsolved problem leaves the roadmap empty.
    pub fn set_problem(&mut self, start: State, goal_state: State, goal: Arc<dyn Goal>) {
        self.start_state = Some(start);
        self.goal_state = Some(goal_state);
        self.goal = Some(goal);
    }

    /// Insert the start configuration as the roadmap root.
    pub fn init_start(&mut self) -> ConfigId {
        debug_assert!(self.q_start.is_none());
        let start = self
            .start_state
            .clone()
            .expect("set_problem must run before growth");
        let id = self.add_configuration(start);
        self.roadmap.config_mut(id).is_start = true;
        self.q_start = Some(id);
        id
    }

    /// Maximum extension distance per grow step.
    pub fn range(&self) -> f64 {
        self.range
    }

    pub fn goal_bias(&self) -> f64 {
        self.settings.goal_bias
    }

    pub fn use_k_nearest(&self) -> bool {
        self.settings.use_k_nearest
    }

    pub fn connection_count(&self) -> usize {
        self.settings.connection_count
    }

    pub fn path_bias(&self) -> f64 {
        self.path_bias
    }

    /// Distance under the level's metric strategy.
    pub fn distance(&self, a: &State, b: &State) -> f64 {
        self.metric.distance(
            self.space.space.as_ref(),
            &self.roadmap,
            self.objective.as_ref(),
            a,
            b,
        )
    }

    /// Interpolate under the level's metric strategy.
    pub fn interpolate(&self, a: &State, b: &State, t: f64, out: &mut State) {
        self.metric.interpolate(
            self.space.space.as_ref(),
            &self.roadmap,
            self.objective.as_ref(),
            a,
            b,
            t,
            out,
        );
    }

    /// Scheduler priority of this level.
    pub fn importance_value(&self) -> f64 {
        self.importance.eval(self.roadmap.num_vertices(), self.level)
    }

    /// Goal-biased bundle sampling; biasing stops once the level is solved.
    pub fn sample_bundle_goal_bias(&mut self, parent: Option<&ParentView<'_>>, out: &mut State) {
        if !self.has_solution
            && self.rng.random_range(0.0..1.0) < self.settings.goal_bias
            && let Some(goal) = &self.goal_state
        {
            out.copy_from(goal);
            return;
        }
        self.sample_bundle(parent, out);
    }

    /// Draw a bundle sample: uniform at the base level, quotient-sampled
    /// (base from the parent's roadmap or path stack, fiber uniform)
    /// everywhere above.
    pub fn sample_bundle(&mut self, parent: Option<&ParentView<'_>>, out: &mut State) {
        let space = self.space.space.clone();
        let Some(pv) = parent else {
            space.sample_uniform(&mut self.rng, out);
            return;
        };
        let Some(projection) = self.projection.clone() else {
            space.sample_uniform(&mut self.rng, out);
            return;
        };

        let mut base = projection.alloc_base();
        if !self.sample_base_from(pv, &mut base) {
            // parent has nothing to offer yet
            space.sample_uniform(&mut self.rng, out);
            return;
        }

        if projection.fiber_len() == 0 {
            let fiber = projection.alloc_fiber();
            projection.merge(&base, &fiber, out);
            return;
        }
        if projection.fiber_dimension() == 0 && !self.degenerate_warned {
            warn!(
                "[BundleGraph] level {}: zero-measure fiber, lift degenerates to identity",
                self.level
            );
            self.degenerate_warned = true;
        }

        let mut total = space.alloc_state();
        space.sample_uniform(&mut self.rng, &mut total);
        let mut fiber = projection.alloc_fiber();
        projection.extract_fiber(&total, &mut fiber);
        projection.merge(&base, &fiber, out);
    }

    /// Base-space sample from the parent: its path stack when one exists,
    /// its roadmap otherwise.
    fn sample_base_from(&mut self, pv: &ParentView<'_>, out: &mut State) -> bool {
        let parent_space = pv.level_space.space.as_ref();
        if !pv.path_stack.is_empty() {
            let idx = pv
                .selected_path
                .filter(|i| *i < pv.path_stack.len())
                .unwrap_or(0);
            let path = &pv.path_stack[idx];
            let t = self.rng.random_range(0.0..1.0);
            let mut on_path = parent_space.alloc_state();
            path.sample_along(parent_space, t, &mut on_path);
            parent_space.sample_uniform_near(&on_path, pv.path_bias, &mut self.rng, out);
            return true;
        }
        pv.sampler
            .sample(pv.roadmap, parent_space, &mut self.rng, out)
    }

    /// Bounded steering: truncate the target to `range` under the metric and
    /// run the propagator. Returns the reached state on success.
    pub fn steer_towards_range(&mut self, from: ConfigId, target: &State) -> Option<State> {
        let from_state = self.roadmap.state(from).clone();
        let d = self.distance(&from_state, target);
        let mut to = target.clone();
        if d > self.range {
            let mut truncated = self.space.space.alloc_state();
            self.interpolate(&from_state, target, self.range / d, &mut truncated);
            to = truncated;
        }
        let mut reached = self.space.space.alloc_state();
        if self
            .propagator
            .steer(self.space.motion.as_ref(), &from_state, &to, &mut reached)
        {
            Some(reached)
        } else {
            None
        }
    }

    /// Insert a configuration into the roadmap and the index.
    pub fn add_configuration(&mut self, state: State) -> ConfigId {
        let id = self.roadmap.add_vertex(state.clone());
        self.nn.add(id, state);
        id
    }

    /// Insert an edge weighted by the objective's motion cost.
    pub fn add_edge(&mut self, a: ConfigId, b: ConfigId) {
        let cost = self
            .objective
            .motion_cost(self.roadmap.state(a), self.roadmap.state(b));
        self.roadmap.add_edge(a, b, cost);
    }

    /// Nearest roadmap configuration under the level metric.
    pub fn nearest(&self, target: &State) -> Option<ConfigId> {
        self.nn.nearest(target, |a, b| self.distance(a, b))
    }

    pub fn goal_satisfied(&self, s: &State) -> (bool, f64) {
        match &self.goal {
            Some(goal) => goal.is_satisfied(s),
            None => (false, f64::INFINITY),
        }
    }

    /// Walk the tree parents from `q_goal` back to the root.
    pub fn tree_solution(&self) -> Option<Path> {
        let goal = self.q_goal?;
        let mut states = Vec::new();
        let mut cursor = Some(goal);
        while let Some(id) = cursor {
            let config = self.roadmap.config(id);
            states.push(config.state.clone());
            cursor = config.parent;
        }
        states.reverse();
        Some(Path::from_states(states))
    }

    /// A\* solution over the roadmap between start and goal vertices.
    pub fn graph_solution(&mut self) -> Option<Path> {
        let (start, goal) = (self.q_start?, self.q_goal?);
        let chain = self
            .roadmap
            .shortest_path(start, goal, self.objective.as_ref())?;
        let states = chain
            .iter()
            .map(|id| self.roadmap.state(*id).clone())
            .collect();
        Some(Path::from_states(states))
    }

    pub fn clear(&mut self) {
        self.roadmap.clear();
        self.nn.clear();
        self.q_start = None;
        self.q_goal = None;
        self.best_cost = Cost(f64::INFINITY);
        self.has_solution = false;
        self.first_run = true;
        self.solution = None;
        self.solution_vertex_count = 0;
        self.path_stack.clear();
        self.selected_path = None;
    }

    /// Annotated export of the dense graph.
    pub fn level_data(&self, planner: &str) -> LevelData {
        let vertices = self
            .roadmap
            .iter()
            .map(|c| VertexData {
                values: c.state.values().to_vec(),
                is_start: c.is_start,
                is_goal: c.is_goal,
                on_shortest_path: c.on_shortest_path,
            })
            .collect();
        let edges = self
            .roadmap
            .edges()
            .map(|(a, b, c)| EdgeData {
                source: a.0,
                target: b.0,
                cost: c.0,
            })
            .collect();
        LevelData {
            level: self.level,
            planner: planner.to_string(),
            path_class: Vec::new(),
            num_path_classes: self.path_stack.len(),
            vertices,
            edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cost::PathLengthObjective;
    use crate::core::problem::{AlwaysValid, GoalRegion};
    use crate::core::space::{RealVectorSpace, StateSpace};

    fn test_graph(seed: u64) -> BundleGraph {
        let space: Arc<dyn StateSpace> = Arc::new(RealVectorSpace::cube(2, 0.0, 1.0));
        let level = LevelSpace::with_discrete_motion(space.clone(), Arc::new(AlwaysValid), 0.01);
        let objective = Arc::new(PathLengthObjective::new(space));
        let settings = PlannerSettings::new().with_seed(seed);
        let defaults = StrategyDefaults {
            metric: Metric::Geodesic,
            importance: Importance::Greedy,
            sampler: GraphSampler::RandomVertex,
            propagator: Propagator::Geometric,
        };
        BundleGraph::new(0, level, None, objective, &settings, defaults).unwrap()
    }

    fn seeded(mut g: BundleGraph) -> BundleGraph {
        let goal_state = State::new(vec![0.9, 0.9]);
        let goal = Arc::new(GoalRegion::new(
            g.space.space.clone(),
            goal_state.clone(),
            0.05,
        ));
        g.set_problem(State::new(vec![0.1, 0.1]), goal_state, goal);
        g
    }

    #[test]
    fn test_nn_roadmap_parity() {
        let mut g = seeded(test_graph(1));
        g.init_start();
        for k in 0..10 {
            let id = g.add_configuration(State::new(vec![0.05 * k as f64, 0.0]));
            if k > 0 {
                g.add_edge(ConfigId(id.0 - 1), id);
            }
        }
        assert_eq!(g.nn.len(), g.roadmap.num_vertices());
        let mut from_nn: Vec<_> = g.nn.ids().collect();
        from_nn.sort();
        let from_graph: Vec<_> = g.roadmap.iter().map(|c| c.id).collect();
        assert_eq!(from_nn, from_graph);
    }

    #[test]
    fn test_steer_truncates_to_range() {
        let mut g = seeded(test_graph(2));
        let root = g.init_start();
        let far = State::new(vec![0.9, 0.1]);
        let reached = g.steer_towards_range(root, &far).unwrap();
        let d = g.space.space.distance(g.roadmap.state(root), &reached);
        assert!(d <= g.range() + 1e-9);
    }

    #[test]
    fn test_goal_bias_hits_goal_state() {
        let mut g = seeded(test_graph(3));
        // force the bias to always fire
        g.settings.goal_bias = 1.0;
        let mut out = g.space.space.alloc_state();
        g.sample_bundle_goal_bias(None, &mut out);
        assert_eq!(out, State::new(vec![0.9, 0.9]));
    }

    #[test]
    fn test_no_goal_bias_after_solution() {
        let mut g = seeded(test_graph(4));
        g.settings.goal_bias = 1.0;
        g.has_solution = true;
        let mut out = g.space.space.alloc_state();
        g.sample_bundle_goal_bias(None, &mut out);
        assert_ne!(out, State::new(vec![0.9, 0.9]));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut g = seeded(test_graph(5));
        g.init_start();
        g.add_configuration(State::new(vec![0.5, 0.5]));
        g.has_solution = true;
        g.clear();
        assert_eq!(g.roadmap.num_vertices(), 0);
        assert_eq!(g.nn.len(), 0);
        assert!(!g.has_solution);
        assert!(g.first_run);
        assert!(g.q_start.is_none());
    }
}
