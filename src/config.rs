//! Run configuration for coloring and optimization.
//!
//! [`EmbeddingConfig`] is plain data with serde support so the binary can read it
//! from TOML. Nothing here touches the filesystem; callers hand in the text.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Root seed used when none is configured.
pub const DEFAULT_SEED: u64 = 0x6b67_6c6f_7665;

/// Adaptive update rule applied per parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationMethod {
    #[default]
    Adagrad,
    Adam,
    Amsgrad,
}

impl fmt::Display for OptimizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationMethod::Adagrad => write!(f, "adagrad"),
            OptimizationMethod::Adam => write!(f, "adam"),
            OptimizationMethod::Amsgrad => write!(f, "amsgrad"),
        }
    }
}

/// Objective being minimized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostFunctionKind {
    /// Weighted least squares against `ln(X)`.
    #[default]
    Glove,
    /// Weighted least squares against `logit(X)`; X must be in (0, 1).
    Pglove,
}

impl fmt::Display for CostFunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostFunctionKind::Glove => write!(f, "glove"),
            CostFunctionKind::Pglove => write!(f, "pglove"),
        }
    }
}

/// How a finished bookmark-coloring vector is rescaled before it enters the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Drop the root entry and rescale to sum just below 1.
    #[default]
    ToUnity,
    /// Drop the root entry and rescale into integer-like counts.
    ToCounts,
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Normalization::ToUnity => write!(f, "to_unity"),
            Normalization::ToCounts => write!(f, "to_counts"),
        }
    }
}

/// Which adjacency lists paint flows along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Out,
    In,
    #[default]
    Both,
}

/// Synchronization of parameter writes during an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    /// Lock-free racy updates over overlapping rows. Fast, approximate.
    #[default]
    Hogwild,
    /// Blocks run in order with CAS writes. Reproducible for a fixed seed.
    Strict,
}

/// Configuration for a full embedding run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Fraction of arriving paint retained at a vertex (0 < alpha < 1).
    pub alpha: f64,
    /// Paint threshold below which a vertex stops propagating.
    pub epsilon: f64,
    /// Embedding vector length.
    pub dimension: usize,
    /// Worker thread count for both phases.
    pub threads: usize,
    pub optimization_method: OptimizationMethod,
    pub cost_function: CostFunctionKind,
    /// Stop once the mean epoch cost changes by at most this much.
    pub tolerance: f64,
    /// Epoch budget.
    pub max_iterations: usize,
    pub learning_rate: f64,
    pub normalization: Normalization,
    /// Deposit paint on relation contexts for every traversed edge.
    pub relation_contexts: bool,
    /// Reuse finished root vectors when propagation reaches another focus vertex.
    pub memoize: bool,
    pub direction: Direction,
    pub consistency: Consistency,
    /// Root seed for initialization and shuffling.
    pub seed: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            epsilon: 1e-5,
            dimension: 50,
            threads: default_threads(),
            optimization_method: OptimizationMethod::default(),
            cost_function: CostFunctionKind::default(),
            tolerance: 1e-5,
            max_iterations: 1000,
            learning_rate: 0.05,
            normalization: Normalization::default(),
            relation_contexts: false,
            memoize: false,
            direction: Direction::default(),
            consistency: Consistency::default(),
            seed: DEFAULT_SEED,
        }
    }
}

/// Available cores minus one, never below one.
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

impl EmbeddingConfig {
    /// Check every field, failing on the first invalid one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ConfigError::InvalidAlpha { value: self.alpha });
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(ConfigError::InvalidEpsilon {
                value: self.epsilon,
            });
        }
        if self.dimension == 0 {
            return Err(ConfigError::InvalidDimension);
        }
        if self.threads == 0 {
            return Err(ConfigError::InvalidThreads);
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(ConfigError::InvalidTolerance {
                value: self.tolerance,
            });
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidMaxIterations);
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ConfigError::InvalidLearningRate {
                value: self.learning_rate,
            });
        }
        if self.cost_function == CostFunctionKind::Pglove
            && self.normalization != Normalization::ToUnity
        {
            return Err(ConfigError::IncompatibleCostFunction {
                cost: self.cost_function.to_string(),
                normalization: self.normalization.to_string(),
            });
        }
        Ok(())
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Render as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }
}
