//! Bookmark coloring: bounded paint propagation from every focus vertex.
//!
//! Each focus vertex starts with one unit of wet paint. Visiting a vertex dries
//! an `alpha` share of its wet paint into the root's bookmark-coloring vector
//! and spreads the rest over incident edges by weight. Propagation from a
//! vertex stops once its wet paint drops below `epsilon`.
//!
//! - [`accumulator`]: primitive-keyed open-addressing map
//! - [`paint`]: per-job [`Bcv`] and [`PaintRegistry`]
//! - [`normalize`]: the two row normalization policies
//! - [`engine`]: [`BookmarkColoring`], the parallel job driver

pub mod accumulator;
pub mod engine;
pub mod normalize;
pub mod paint;

use crate::config::{Direction, EmbeddingConfig, Normalization};

pub use engine::BookmarkColoring;
pub use paint::{Bcv, PaintRegistry};

/// The subset of [`EmbeddingConfig`] that coloring depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoringParams {
    pub alpha: f64,
    pub epsilon: f64,
    pub direction: Direction,
    pub relation_contexts: bool,
    pub normalization: Normalization,
    pub memoize: bool,
}

impl ColoringParams {
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self {
            alpha: config.alpha,
            epsilon: config.epsilon,
            direction: config.direction,
            relation_contexts: config.relation_contexts,
            normalization: config.normalization,
            memoize: config.memoize,
        }
    }
}

impl Default for ColoringParams {
    fn default() -> Self {
        Self::from_config(&EmbeddingConfig::default())
    }
}

/// Outcome counters for one coloring phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColoringReport {
    /// Jobs launched (one per focus vertex).
    pub focus_vertices: usize,
    /// Jobs that panicked; their rows are missing from the matrix.
    pub failed_jobs: usize,
    /// Times a memoized root vector was spliced in.
    pub memo_hits: usize,
    /// Triplets in the resulting matrix.
    pub non_zero: usize,
}
