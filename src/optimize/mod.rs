//! Parallel GloVe-style factorization of the co-occurrence matrix.
//!
//! The optimizer owns dense focus and context parameter matrices plus one bias
//! per row, and runs epochs of per-triplet SGD over a shuffled matrix:
//!
//! - [`params`]: atomic parameter storage ([`SharedArray`], [`ParamSet`])
//! - [`cost`]: regression targets and weights ([`CostFunction`])
//! - [`update`]: Adagrad, Adam and AMSGrad ([`UpdateRule`], [`AdaptiveRule`])
//! - [`trainer`]: the epoch loop ([`Optimizer`])

pub mod cost;
pub mod params;
pub mod trainer;
pub mod update;

use serde::Serialize;

use crate::config::{Consistency, CostFunctionKind, EmbeddingConfig, OptimizationMethod};

pub use cost::{CostFunction, CostTerm};
pub use params::{EmbeddingParameters, ParamSet, ParamShape, SharedArray, Side};
pub use trainer::Optimizer;
pub use update::{AdaptiveRule, UpdateRule};

/// The subset of [`EmbeddingConfig`] the optimizer depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerSettings {
    pub dimension: usize,
    pub threads: usize,
    pub method: OptimizationMethod,
    pub cost_function: CostFunctionKind,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub learning_rate: f64,
    pub consistency: Consistency,
    pub relation_contexts: bool,
    pub seed: u64,
}

impl OptimizerSettings {
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self {
            dimension: config.dimension,
            threads: config.threads,
            method: config.optimization_method,
            cost_function: config.cost_function,
            tolerance: config.tolerance,
            max_iterations: config.max_iterations,
            learning_rate: config.learning_rate,
            consistency: config.consistency,
            relation_contexts: config.relation_contexts,
            seed: config.seed,
        }
    }
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self::from_config(&EmbeddingConfig::default())
    }
}

/// Outcome of an optimization run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptimizationReport {
    /// Epochs executed.
    pub epochs: usize,
    /// Whether the tolerance was met before the epoch budget ran out.
    pub converged: bool,
    /// Mean cost of the last epoch.
    pub final_cost: f64,
    /// Mean cost per epoch.
    pub cost_history: Vec<f64>,
    /// Triplet updates skipped for a non-finite cost, over all epochs.
    pub skipped_updates: usize,
    /// Blocks whose worker panicked, over all epochs.
    pub failed_blocks: usize,
}
