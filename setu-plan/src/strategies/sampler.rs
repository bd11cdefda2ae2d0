//! Graph samplers: how a child level draws base samples from the roadmap
//! beneath it (quotient sampling).

use rand::Rng;
use rand::rngs::StdRng;

use crate::core::space::StateSpace;
use crate::core::state::State;
use crate::error::{PlannerError, Result};
use crate::roadmap::graph::Roadmap;

/// Sampling substitution over an existing roadmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphSampler {
    /// Uniform vertex; copies its state.
    RandomVertex,
    /// Edge drawn by cost-weighted distribution, then a uniform point
    /// along it.
    RandomEdge,
}

impl GraphSampler {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "randomvertex" => Ok(GraphSampler::RandomVertex),
            "randomedge" => Ok(GraphSampler::RandomEdge),
            other => Err(PlannerError::Configuration(format!(
                "unknown graph sampler: {other}"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GraphSampler::RandomVertex => "randomvertex",
            GraphSampler::RandomEdge => "randomedge",
        }
    }

    /// Draw a state from the roadmap into `out`. Returns `false` when the
    /// roadmap has nothing to sample from.
    pub fn sample(
        &self,
        roadmap: &Roadmap,
        space: &dyn StateSpace,
        rng: &mut StdRng,
        out: &mut State,
    ) -> bool {
        if roadmap.num_vertices() == 0 {
            return false;
        }
        match self {
            GraphSampler::RandomVertex => {
                let k = rng.random_range(0..roadmap.num_vertices());
                out.copy_from(roadmap.state(crate::roadmap::graph::ConfigId(k)));
                true
            }
            GraphSampler::RandomEdge => {
                let total: f64 = roadmap.edges().map(|(_, _, c)| c.0.max(0.0)).sum();
                if total <= f64::EPSILON {
                    // no edges yet: degrade to vertex sampling
                    return GraphSampler::RandomVertex.sample(roadmap, space, rng, out);
                }
                let mut pick = rng.random_range(0.0..total);
                for (a, b, c) in roadmap.edges() {
                    let w = c.0.max(0.0);
                    if pick <= w {
                        let t = rng.random_range(0.0..1.0);
                        space.interpolate(roadmap.state(a), roadmap.state(b), t, out);
                        return true;
                    }
                    pick -= w;
                }
                // floating-point tail: fall back to the last edge's target
                let (_, b, _) = roadmap.edges().last().unwrap();
                out.copy_from(roadmap.state(b));
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cost::Cost;
    use crate::core::space::RealVectorSpace;
    use rand::SeedableRng;

    fn segment_roadmap() -> Roadmap {
        let mut g = Roadmap::new();
        let a = g.add_vertex(State::new(vec![0.0, 0.0]));
        let b = g.add_vertex(State::new(vec![1.0, 0.0]));
        g.add_edge(a, b, Cost(1.0));
        g
    }

    #[test]
    fn test_random_vertex_copies_graph_state() {
        let g = segment_roadmap();
        let space = RealVectorSpace::cube(2, 0.0, 1.0);
        let mut rng = StdRng::seed_from_u64(1);
        let mut out = space.alloc_state();
        for _ in 0..10 {
            assert!(GraphSampler::RandomVertex.sample(&g, &space, &mut rng, &mut out));
            assert!(out.values()[1].abs() < 1e-12);
            assert!(out.values()[0] == 0.0 || out.values()[0] == 1.0);
        }
    }

    #[test]
    fn test_random_edge_lies_on_segment() {
        let g = segment_roadmap();
        let space = RealVectorSpace::cube(2, 0.0, 1.0);
        let mut rng = StdRng::seed_from_u64(2);
        let mut out = space.alloc_state();
        for _ in 0..20 {
            assert!(GraphSampler::RandomEdge.sample(&g, &space, &mut rng, &mut out));
            assert!((0.0..=1.0).contains(&out.values()[0]));
            assert!(out.values()[1].abs() < 1e-12);
        }
    }

    #[test]
    fn test_empty_roadmap_refuses() {
        let g = Roadmap::new();
        let space = RealVectorSpace::cube(2, 0.0, 1.0);
        let mut rng = StdRng::seed_from_u64(3);
        let mut out = space.alloc_state();
        assert!(!GraphSampler::RandomVertex.sample(&g, &space, &mut rng, &mut out));
    }
}
