//! Rich diagnostic error types for the kglove pipeline.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so users know exactly what went wrong
//! and how to fix it.
//!
//! Only configuration problems, malformed input and numeric divergence reach the
//! caller. Worker failures inside a phase are caught, logged and counted in the
//! phase report instead.

use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for kglove.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum KgloveError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Matrix(#[from] MatrixError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Optimize(#[from] OptimizeError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("alpha must lie strictly between 0 and 1, got {value}")]
    #[diagnostic(
        code(kglove::config::alpha),
        help(
            "alpha is the fraction of paint retained at each visited vertex. \
             Typical values are 0.1 to 0.2."
        )
    )]
    InvalidAlpha { value: f64 },

    #[error("epsilon must be a positive finite number, got {value}")]
    #[diagnostic(
        code(kglove::config::epsilon),
        help(
            "epsilon is the paint threshold below which propagation stops. \
             Smaller values give wider contexts at higher cost; 1e-4 to 1e-6 is common."
        )
    )]
    InvalidEpsilon { value: f64 },

    #[error("embedding dimension must be positive")]
    #[diagnostic(
        code(kglove::config::dimension),
        help("Set `dimension` to the desired vector length, e.g. 50.")
    )]
    InvalidDimension,

    #[error("thread count must be positive")]
    #[diagnostic(
        code(kglove::config::threads),
        help("Set `threads` to at least 1, or omit it to use available cores minus one.")
    )]
    InvalidThreads,

    #[error("tolerance must be a non-negative finite number, got {value}")]
    #[diagnostic(
        code(kglove::config::tolerance),
        help("Use 0 to always run `max_iterations` epochs.")
    )]
    InvalidTolerance { value: f64 },

    #[error("max_iterations must be positive")]
    #[diagnostic(
        code(kglove::config::max_iterations),
        help("Set `max_iterations` to the epoch budget, e.g. 1000.")
    )]
    InvalidMaxIterations,

    #[error("learning rate must be a positive finite number, got {value}")]
    #[diagnostic(
        code(kglove::config::learning_rate),
        help("The default of 0.05 works for all three update rules.")
    )]
    InvalidLearningRate { value: f64 },

    #[error("cost function {cost} cannot be combined with {normalization} normalization")]
    #[diagnostic(
        code(kglove::config::incompatible),
        help(
            "The probabilistic GloVe cost expects co-occurrence values strictly \
             between 0 and 1. Use `normalization = \"to_unity\"` or switch to \
             `cost_function = \"glove\"`."
        )
    )]
    IncompatibleCostFunction {
        cost: String,
        normalization: String,
    },

    #[error("configuration parse error: {message}")]
    #[diagnostic(
        code(kglove::config::parse),
        help("Check the TOML syntax and the spelling of option values.")
    )]
    Parse { message: String },

    #[error("failed to build worker pool: {message}")]
    #[diagnostic(
        code(kglove::config::thread_pool),
        help("Lower `threads` or check the process thread limits.")
    )]
    ThreadPool { message: String },
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("vertex {vertex} is out of range (graph has {count} vertices)")]
    #[diagnostic(
        code(kglove::graph::vertex_out_of_range),
        help("Add the vertex with `GraphBuilder::add_vertex` before referencing it.")
    )]
    VertexOutOfRange { vertex: u32, count: usize },

    #[error("relation {relation} is out of range (graph has {count} relations)")]
    #[diagnostic(
        code(kglove::graph::relation_out_of_range),
        help("Intern the relation with `GraphBuilder::add_relation` first.")
    )]
    RelationOutOfRange { relation: u32, count: usize },

    #[error("edge weight must be finite and non-negative, got {weight}")]
    #[diagnostic(
        code(kglove::graph::invalid_weight),
        help("Edge weights scale how paint is split between neighbors.")
    )]
    InvalidWeight { weight: f64 },

    #[error("PageRank damping must lie in [0, 1], got {damping}")]
    #[diagnostic(
        code(kglove::graph::invalid_damping),
        help("0.85 is the conventional damping factor.")
    )]
    InvalidDamping { damping: f64 },

    #[error("vertex {vertex} appears more than once in the focus set")]
    #[diagnostic(
        code(kglove::graph::duplicate_focus),
        help("Each focus vertex maps to exactly one output vector.")
    )]
    DuplicateFocus { vertex: u32 },

    #[error("unknown vertex label: {label}")]
    #[diagnostic(
        code(kglove::graph::unknown_label),
        help("The label was never added to the graph.")
    )]
    UnknownLabel { label: String },
}

// ---------------------------------------------------------------------------
// Matrix errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum MatrixError {
    #[error("triplet ({row}, {col}) outside matrix bounds {rows}x{cols}")]
    #[diagnostic(
        code(kglove::matrix::out_of_bounds),
        help(
            "Rows are focus indices and columns are context indices. \
             This indicates a context index computed past the relation block."
        )
    )]
    OutOfBounds {
        row: u32,
        col: u32,
        rows: usize,
        cols: usize,
    },

    #[error("co-occurrence value must be finite, got {value}")]
    #[diagnostic(
        code(kglove::matrix::non_finite),
        help("Paint propagation produced a non-finite value; check edge weights.")
    )]
    NonFinite { value: f64 },
}

// ---------------------------------------------------------------------------
// Optimization errors
// ---------------------------------------------------------------------------

/// Where a non-finite value was detected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DivergenceStage {
    /// Building the regression target for a single co-occurrence value.
    CostTerm { value: f64 },
    /// Aggregating the mean cost of an epoch.
    Epoch { epoch: usize },
}

impl fmt::Display for DivergenceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DivergenceStage::CostTerm { value } => write!(f, "cost term for X = {value}"),
            DivergenceStage::Epoch { epoch } => write!(f, "epoch {epoch}"),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum OptimizeError {
    #[error("numeric divergence in {stage}: cost evaluated to {cost}")]
    #[diagnostic(
        code(kglove::optimize::divergence),
        help(
            "The objective became NaN or infinite. Lower the learning rate, \
             switch to `adagrad`, or check that every co-occurrence value is \
             positive (and below 1 for `pglove`)."
        )
    )]
    NumericDivergence { stage: DivergenceStage, cost: f64 },

    #[error("matrix has {rows}x{cols} entries but the graph provides {focus} focus and {context} context vectors")]
    #[diagnostic(
        code(kglove::optimize::shape_mismatch),
        help("Optimize a matrix produced by coloring the same graph with the same configuration.")
    )]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        focus: usize,
        context: usize,
    },
}

/// Result type for graph construction.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Result type for the optimizer.
pub type OptimizeResult<T> = std::result::Result<T, OptimizeError>;

/// Convenience alias for functions returning kglove results.
pub type KgloveResult<T> = std::result::Result<T, KgloveError>;
