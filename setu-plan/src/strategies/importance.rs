//! Importance strategies: how the scheduler ranks levels for growth.

use crate::error::{PlannerError, Result};

/// Scalar ranking of a level in the scheduler's priority queue; higher is
/// scheduled sooner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Importance {
    /// Constant 1: every level equally important.
    Uniform,
    /// `1 / (|V| + 1)`: levels lose priority as their roadmap grows.
    Greedy,
    /// `1 / ((|V| + 1) * 2^k)`: like greedy, halved per level `k`.
    Exponential,
}

impl Importance {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "uniform" => Ok(Importance::Uniform),
            "greedy" => Ok(Importance::Greedy),
            "exponential" => Ok(Importance::Exponential),
            other => Err(PlannerError::Configuration(format!(
                "unknown importance: {other}"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Importance::Uniform => "uniform",
            Importance::Greedy => "greedy",
            Importance::Exponential => "exponential",
        }
    }

    pub fn eval(&self, num_vertices: usize, level: usize) -> f64 {
        let n = num_vertices as f64;
        match self {
            Importance::Uniform => 1.0,
            Importance::Greedy => 1.0 / (n + 1.0),
            Importance::Exponential => 1.0 / ((n + 1.0) * 2f64.powi(level as i32)),
        }
    }
}
