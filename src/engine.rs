//! Engine facade: top-level API for an embedding run.
//!
//! The `EmbeddingEngine` owns the validated configuration and the worker pool
//! shared by both phases, and exposes coloring, optimization, and the two
//! chained together.

use std::time::Instant;

use rayon::ThreadPool;

use crate::bca::{BookmarkColoring, ColoringParams, ColoringReport};
use crate::config::EmbeddingConfig;
use crate::embedding::Embedding;
use crate::error::{ConfigError, KgloveResult};
use crate::graph::GraphView;
use crate::matrix::CoOccurrenceMatrix;
use crate::optimize::{OptimizationReport, Optimizer, OptimizerSettings};

/// Everything produced by [`EmbeddingEngine::run`].
#[derive(Debug, Clone)]
pub struct EmbeddingRun {
    pub embedding: Embedding,
    pub coloring: ColoringReport,
    pub optimization: OptimizationReport,
}

/// Summary of an engine's settings, for logging and the CLI.
#[derive(Debug, Clone)]
pub struct EngineInfo {
    pub threads: usize,
    pub dimension: usize,
    pub method: String,
    pub cost_function: String,
    pub normalization: String,
}

impl std::fmt::Display for EngineInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "kglove engine: {} threads, dimension {}, {} / {}, {} normalization",
            self.threads, self.dimension, self.method, self.cost_function, self.normalization
        )
    }
}

/// The kglove embedding engine.
pub struct EmbeddingEngine {
    config: EmbeddingConfig,
    pool: ThreadPool,
}

impl EmbeddingEngine {
    /// Validate `config` and start the worker pool.
    pub fn new(config: EmbeddingConfig) -> KgloveResult<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("kglove-worker-{i}"))
            .build()
            .map_err(|e| ConfigError::ThreadPool {
                message: e.to_string(),
            })?;

        tracing::info!(
            threads = config.threads,
            dimension = config.dimension,
            method = %config.optimization_method,
            cost = %config.cost_function,
            normalization = %config.normalization,
            "initializing kglove engine"
        );
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    pub fn info(&self) -> EngineInfo {
        EngineInfo {
            threads: self.pool.current_num_threads(),
            dimension: self.config.dimension,
            method: self.config.optimization_method.to_string(),
            cost_function: self.config.cost_function.to_string(),
            normalization: self.config.normalization.to_string(),
        }
    }

    /// Bookmark coloring over every focus vertex of `graph`.
    pub fn color<G: GraphView>(
        &self,
        graph: &G,
    ) -> KgloveResult<(CoOccurrenceMatrix, ColoringReport)> {
        let coloring = BookmarkColoring::new(graph, ColoringParams::from_config(&self.config));
        Ok(coloring.color_all(&self.pool)?)
    }

    /// Factorize a matrix produced by [`color`](Self::color) on the same graph.
    pub fn optimize<G: GraphView>(
        &self,
        graph: &G,
        matrix: &CoOccurrenceMatrix,
    ) -> KgloveResult<(Embedding, OptimizationReport)> {
        let settings = OptimizerSettings::from_config(&self.config);
        let optimizer = Optimizer::new(graph, matrix, settings, &self.pool)?;
        let report = optimizer.run(&self.pool)?;
        Ok((optimizer.embedding(), report))
    }

    /// Color, then optimize, keeping both phase reports.
    pub fn run<G: GraphView>(&self, graph: &G) -> KgloveResult<EmbeddingRun> {
        let started = Instant::now();
        let (matrix, coloring) = self.color(graph)?;
        let (embedding, optimization) = self.optimize(graph, &matrix)?;
        tracing::info!(
            vectors = embedding.size(),
            epochs = optimization.epochs,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "embedding run finished"
        );
        Ok(EmbeddingRun {
            embedding,
            coloring,
            optimization,
        })
    }

    /// Color, then optimize.
    pub fn embed<G: GraphView>(&self, graph: &G) -> KgloveResult<Embedding> {
        self.run(graph).map(|run| run.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KgloveError;
    use crate::graph::GraphBuilder;

    fn config() -> EmbeddingConfig {
        EmbeddingConfig {
            threads: 2,
            dimension: 4,
            max_iterations: 50,
            ..EmbeddingConfig::default()
        }
    }

    #[test]
    fn invalid_config_fails_fast() {
        let result = EmbeddingEngine::new(EmbeddingConfig {
            alpha: 0.0,
            ..config()
        });
        assert!(matches!(
            result,
            Err(KgloveError::Config(ConfigError::InvalidAlpha { .. }))
        ));
    }

    #[test]
    fn info_reports_pool_size() {
        let engine = EmbeddingEngine::new(config()).unwrap();
        let info = engine.info();
        assert_eq!(info.threads, 2);
        assert_eq!(info.dimension, 4);
        assert!(info.to_string().contains("adagrad"));
    }

    #[test]
    fn embed_produces_one_vector_per_focus_vertex() {
        let mut b = GraphBuilder::new();
        b.add_triple("x", "knows", "y");
        b.add_triple("y", "knows", "z");
        let g = b.build().unwrap();
        let engine = EmbeddingEngine::new(config()).unwrap();
        let run = engine.run(&g).unwrap();
        assert_eq!(run.embedding.size(), 3);
        assert_eq!(run.coloring.focus_vertices, 3);
        assert!(run.optimization.epochs > 0);
        assert!(run.embedding.get("y").is_some());
    }

    #[test]
    fn optimize_rejects_matrix_from_other_graph() {
        let mut b = GraphBuilder::new();
        b.add_triple("x", "knows", "y");
        let g = b.build().unwrap();
        let engine = EmbeddingEngine::new(config()).unwrap();
        let foreign = CoOccurrenceMatrix::new(7, 7);
        assert!(matches!(
            engine.optimize(&g, &foreign),
            Err(KgloveError::Optimize(_))
        ));
    }
}
