//! Planner configuration sections.
//!
//! Plain serde-derived structs; loading them from a file is the caller's
//! business. Fractions are of the level's maximum extent, so the same
//! settings work across spaces of very different scale.

use serde::{Deserialize, Serialize};

/// Default value functions for serde deserialization.
mod defaults {
    pub fn goal_bias() -> f64 {
        0.05
    }

    pub fn use_k_nearest() -> bool {
        true
    }

    pub fn range_fraction() -> f64 {
        0.2
    }

    pub fn goal_threshold_fraction() -> f64 {
        0.01
    }

    pub fn connection_count() -> usize {
        7
    }

    pub fn sparse_delta_fraction() -> f64 {
        0.15
    }

    pub fn dense_delta_fraction() -> f64 {
        0.05
    }

    pub fn path_bias_fraction() -> f64 {
        0.05
    }

    pub fn stretch_factor() -> f64 {
        3.0
    }

    pub fn path_head() -> usize {
        7
    }

    pub fn enabled() -> bool {
        true
    }
}

/// Top-level planner settings.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PlannerSettings {
    /// Per-level growth settings
    #[serde(default)]
    pub level: LevelSettings,

    /// Sparse spanner and path-class enumeration settings
    #[serde(default)]
    pub sparse: SparseSettings,

    /// Scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerSettings,

    /// Strategy name overrides (planner defaults apply when absent)
    #[serde(default)]
    pub strategies: StrategySettings,

    /// RNG seed; fresh OS entropy per level when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

impl PlannerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter for the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Growth settings shared by every per-level planner.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LevelSettings {
    /// Maximum tree-extension distance in state units; 0 = auto
    /// (`range_fraction` of the level extent)
    #[serde(default)]
    pub range: f64,

    /// Fraction of the level extent used when `range` is 0
    #[serde(default = "defaults::range_fraction")]
    pub range_fraction: f64,

    /// Probability of sampling the goal instead of the space
    #[serde(default = "defaults::goal_bias")]
    pub goal_bias: f64,

    /// k-nearest neighborhood for RRT* (radius form otherwise)
    #[serde(default = "defaults::use_k_nearest")]
    pub use_k_nearest: bool,

    /// Goal-region radius on projected levels, as a fraction of the extent
    #[serde(default = "defaults::goal_threshold_fraction")]
    pub goal_threshold_fraction: f64,

    /// Neighbor count for roadmap planners (QMP/SQMP)
    #[serde(default = "defaults::connection_count")]
    pub connection_count: usize,
}

impl Default for LevelSettings {
    fn default() -> Self {
        Self {
            range: 0.0,
            range_fraction: 0.2,
            goal_bias: 0.05,
            use_k_nearest: true,
            goal_threshold_fraction: 0.01,
            connection_count: 7,
        }
    }
}

impl LevelSettings {
    /// Builder-style setter for the extension range.
    pub fn with_range(mut self, range: f64) -> Self {
        self.range = range;
        self
    }

    /// Builder-style setter for the goal bias.
    pub fn with_goal_bias(mut self, goal_bias: f64) -> Self {
        self.goal_bias = goal_bias;
        self
    }
}

/// Sparse spanner settings (SQMP).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SparseSettings {
    /// Guard visibility radius, fraction of the extent
    #[serde(default = "defaults::sparse_delta_fraction")]
    pub sparse_delta_fraction: f64,

    /// Interface radius on the dense graph, fraction of the extent
    #[serde(default = "defaults::dense_delta_fraction")]
    pub dense_delta_fraction: f64,

    /// Perturbation radius for path-stack sampling, fraction of the extent
    #[serde(default = "defaults::path_bias_fraction")]
    pub path_bias_fraction: f64,

    /// Spanner stretch factor `t`
    #[serde(default = "defaults::stretch_factor")]
    pub stretch_factor: f64,

    /// Maximum number of path classes pushed to the stack
    #[serde(default = "defaults::path_head")]
    pub path_head: usize,
}

impl Default for SparseSettings {
    fn default() -> Self {
        Self {
            sparse_delta_fraction: 0.15,
            dense_delta_fraction: 0.05,
            path_bias_fraction: 0.05,
            stretch_factor: 3.0,
            path_head: 7,
        }
    }
}

impl SparseSettings {
    /// Builder-style setter for the path-class head count.
    pub fn with_path_head(mut self, n: usize) -> Self {
        self.path_head = n;
        self
    }
}

/// Bundle-sequence scheduler settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Stop once this level has a solution; the top level when absent
    #[serde(default)]
    pub stop_at_level: Option<usize>,

    /// Try lifting the lower level's solution before searching
    #[serde(default = "defaults::enabled")]
    pub feasible_path_restriction: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            stop_at_level: None,
            feasible_path_restriction: true,
        }
    }
}

/// Strategy names per §strategy; `None` keeps the planner's own default.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct StrategySettings {
    #[serde(default)]
    pub metric: Option<String>,

    #[serde(default)]
    pub importance: Option<String>,

    #[serde(default)]
    pub graph_sampler: Option<String>,

    #[serde(default)]
    pub propagator: Option<String>,
}
