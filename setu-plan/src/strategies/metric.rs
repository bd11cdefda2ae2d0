//! Metric strategies: how a level measures distance and interpolates.

use crate::core::cost::OptimizationObjective;
use crate::core::space::StateSpace;
use crate::core::state::State;
use crate::error::{PlannerError, Result};
use crate::roadmap::graph::{ConfigId, Roadmap};
use crate::roadmap::path::Path;

/// Distance/interpolation substitution for a level.
///
/// `Geodesic` is the plain state-space metric. `ShortestPath` routes through
/// the level's current roadmap: the distance of the composite
/// `a -> nearest(a) -> A* -> nearest(b) -> b` chain, with interpolation
/// walking that chain by arc length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Geodesic,
    ShortestPath,
}

impl Metric {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "geodesic" => Ok(Metric::Geodesic),
            "shortestpath" => Ok(Metric::ShortestPath),
            other => Err(PlannerError::Configuration(format!(
                "unknown metric: {other}"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Geodesic => "geodesic",
            Metric::ShortestPath => "shortestpath",
        }
    }

    pub fn distance(
        &self,
        space: &dyn StateSpace,
        roadmap: &Roadmap,
        objective: &dyn OptimizationObjective,
        a: &State,
        b: &State,
    ) -> f64 {
        match self {
            Metric::Geodesic => space.distance(a, b),
            Metric::ShortestPath => match self.route(space, roadmap, objective, a, b) {
                Some(route) => route.length(space),
                None => space.distance(a, b),
            },
        }
    }

    pub fn interpolate(
        &self,
        space: &dyn StateSpace,
        roadmap: &Roadmap,
        objective: &dyn OptimizationObjective,
        a: &State,
        b: &State,
        t: f64,
        out: &mut State,
    ) {
        match self {
            Metric::Geodesic => space.interpolate(a, b, t, out),
            Metric::ShortestPath => match self.route(space, roadmap, objective, a, b) {
                Some(route) => route.sample_along(space, t, out),
                None => space.interpolate(a, b, t, out),
            },
        }
    }

    /// The composite chain through the roadmap, or `None` when the graph is
    /// too small or disconnected (callers fall back to the geodesic).
    fn route(
        &self,
        space: &dyn StateSpace,
        roadmap: &Roadmap,
        objective: &dyn OptimizationObjective,
        a: &State,
        b: &State,
    ) -> Option<Path> {
        if roadmap.num_vertices() < 2 {
            return None;
        }
        let va = nearest_vertex(space, roadmap, a)?;
        let vb = nearest_vertex(space, roadmap, b)?;
        let (chain, _) = roadmap.astar(va, vb, objective)?;
        let mut states = Vec::with_capacity(chain.len() + 2);
        states.push(a.clone());
        for id in chain {
            states.push(roadmap.state(id).clone());
        }
        states.push(b.clone());
        Some(Path::from_states(states))
    }
}

fn nearest_vertex(space: &dyn StateSpace, roadmap: &Roadmap, q: &State) -> Option<ConfigId> {
    roadmap
        .iter()
        .map(|c| (c.id, space.distance(&c.state, q)))
        .min_by(|x, y| x.1.total_cmp(&y.1))
        .map(|(id, _)| id)
}
