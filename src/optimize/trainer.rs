//! The epoch loop.

use std::ops::Range;
use std::sync::mpsc;
use std::time::Instant;

use rayon::ThreadPool;

use crate::config::Consistency;
use crate::embedding::{Embedding, normalize_in_place};
use crate::error::{DivergenceStage, OptimizeError, OptimizeResult};
use crate::graph::GraphView;
use crate::matrix::CoOccurrenceMatrix;
use crate::rng::{STREAM_SHUFFLE, SeedSequence};
use crate::worker;

use super::cost::{CostFunction, CostTerm};
use super::params::{EmbeddingParameters, ParamShape, Side};
use super::update::{AdaptiveRule, UpdateRule};
use super::{OptimizationReport, OptimizerSettings};

/// Totals reported by one block job.
#[derive(Debug, Clone, Copy, Default)]
struct BlockStats {
    cost: f64,
    applied: usize,
    skipped: usize,
}

/// Totals for one epoch.
#[derive(Debug, Clone, Copy, Default)]
struct EpochStats {
    cost: f64,
    applied: usize,
    skipped: usize,
    failed: usize,
}

/// Factorizes a co-occurrence matrix produced from `graph`.
///
/// Row `i` of the matrix is focus vertex `graph.focus_vertices()[i]`; column
/// `v` is the context vector of vertex `v` (relation contexts follow the
/// vertices).
pub struct Optimizer<'a, G: GraphView> {
    graph: &'a G,
    matrix: &'a CoOccurrenceMatrix,
    settings: OptimizerSettings,
    cost: CostFunction,
    rule: AdaptiveRule,
    params: EmbeddingParameters,
    terms: Vec<CostTerm>,
    seeds: SeedSequence,
}

impl<'a, G: GraphView> Optimizer<'a, G> {
    /// Check shapes, build every cost term and initialize parameters on `pool`.
    ///
    /// Fails with [`OptimizeError::NumericDivergence`] before any epoch runs if
    /// some matrix value has no finite target.
    pub fn new(
        graph: &'a G,
        matrix: &'a CoOccurrenceMatrix,
        settings: OptimizerSettings,
        pool: &ThreadPool,
    ) -> OptimizeResult<Self> {
        let focus = graph.focus_vertices().len();
        let context = graph.context_count(settings.relation_contexts);
        if matrix.focus_count() != focus || matrix.context_count() != context {
            return Err(OptimizeError::ShapeMismatch {
                rows: matrix.focus_count(),
                cols: matrix.context_count(),
                focus,
                context,
            });
        }

        let cost = CostFunction::from(settings.cost_function);
        let terms = cost.terms(matrix.iter().map(|t| t.value), matrix.max())?;

        let shape = ParamShape {
            focus_rows: focus,
            context_rows: context,
            dimension: settings.dimension,
        };
        let seeds = SeedSequence::new(settings.seed);
        let params = pool.install(|| EmbeddingParameters::random(shape, &seeds));
        let rule = AdaptiveRule::new(
            settings.method,
            shape,
            settings.learning_rate,
            settings.consistency,
        );

        Ok(Self {
            graph,
            matrix,
            settings,
            cost,
            rule,
            params,
            terms,
            seeds,
        })
    }

    pub fn parameters(&self) -> &EmbeddingParameters {
        &self.params
    }

    /// Run epochs until the mean cost settles or the budget runs out.
    pub fn run(&self, pool: &ThreadPool) -> OptimizeResult<OptimizationReport> {
        let started = Instant::now();
        let nnz = self.matrix.non_zero_count();
        let mut report = OptimizationReport::default();
        tracing::info!(
            non_zero = nnz,
            dimension = self.settings.dimension,
            method = %self.settings.method,
            cost = %self.settings.cost_function,
            consistency = ?self.settings.consistency,
            threads = self.settings.threads,
            "optimization started"
        );

        if nnz == 0 {
            tracing::warn!("co-occurrence matrix is empty; keeping initial parameters");
            report.converged = true;
            return Ok(report);
        }

        let mut previous = f64::INFINITY;
        for epoch in 0..self.settings.max_iterations {
            let mut rng = self.seeds.generator(STREAM_SHUFFLE, epoch as u64);
            let permutation = self.matrix.new_permutation(&mut rng);
            let blocks = worker::partition(nnz, self.settings.threads);
            let step_size = self.rule.step_size(epoch);

            let stats = self.run_epoch(pool, &permutation, &blocks, step_size);
            report.epochs = epoch + 1;
            report.skipped_updates += stats.skipped;
            report.failed_blocks += stats.failed;

            let mean = stats.cost / nnz as f64;
            if !mean.is_finite() || (stats.applied == 0 && stats.skipped > 0) {
                tracing::error!(
                    epoch,
                    cost = mean,
                    skipped = stats.skipped,
                    "optimization diverged"
                );
                return Err(OptimizeError::NumericDivergence {
                    stage: DivergenceStage::Epoch { epoch },
                    cost: if stats.applied == 0 { f64::NAN } else { mean },
                });
            }
            if stats.skipped > 0 {
                tracing::warn!(epoch, skipped = stats.skipped, "skipped non-finite updates");
            }

            report.cost_history.push(mean);
            report.final_cost = mean;
            tracing::debug!(epoch, cost = mean, step_size, "epoch finished");

            if (previous - mean).abs() <= self.settings.tolerance {
                report.converged = true;
                break;
            }
            previous = mean;
        }

        tracing::info!(
            epochs = report.epochs,
            converged = report.converged,
            final_cost = report.final_cost,
            skipped = report.skipped_updates,
            failed_blocks = report.failed_blocks,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "optimization finished"
        );
        Ok(report)
    }

    /// One job per block; block outcomes arrive over a channel. In strict mode
    /// the blocks run in order on a single pool thread.
    fn run_epoch(
        &self,
        pool: &ThreadPool,
        permutation: &[usize],
        blocks: &[Range<usize>],
        step_size: f64,
    ) -> EpochStats {
        let (tx, rx) = mpsc::channel::<(usize, Result<BlockStats, String>)>();
        match self.settings.consistency {
            Consistency::Hogwild => pool.scope(|s| {
                for (index, block) in blocks.iter().enumerate() {
                    let tx = tx.clone();
                    let ordinals = &permutation[block.clone()];
                    s.spawn(move |_| {
                        let outcome = worker::guarded(|| self.run_block(ordinals, step_size));
                        let _ = tx.send((index, outcome));
                    });
                }
            }),
            Consistency::Strict => pool.install(|| {
                for (index, block) in blocks.iter().enumerate() {
                    let ordinals = &permutation[block.clone()];
                    let outcome = worker::guarded(|| self.run_block(ordinals, step_size));
                    let _ = tx.send((index, outcome));
                }
            }),
        }
        drop(tx);

        let mut stats = EpochStats::default();
        for (index, outcome) in rx {
            match outcome {
                Ok(block) => {
                    stats.cost += block.cost;
                    stats.applied += block.applied;
                    stats.skipped += block.skipped;
                }
                Err(message) => {
                    stats.failed += 1;
                    tracing::warn!(
                        block = index,
                        error = %message,
                        "optimizer block failed; updates dropped"
                    );
                }
            }
        }
        stats
    }

    /// Apply one update per triplet in `ordinals`.
    fn run_block(&self, ordinals: &[usize], step_size: f64) -> BlockStats {
        let consistency = self.settings.consistency;
        let d = self.settings.dimension;
        let p = &self.params;
        let (focus, context) = (p.side(Side::Focus), p.side(Side::Context));
        let (focus_bias, context_bias) = (p.side(Side::FocusBias), p.side(Side::ContextBias));
        let rule = &self.rule;

        let mut stats = BlockStats::default();
        for &ordinal in ordinals {
            let triplet = self.matrix.get(ordinal);
            let term = &self.terms[ordinal];
            let (i, j) = (triplet.row as usize, triplet.col as usize);

            let inner = self.cost.inner_cost(p.predict(i, j), term);
            let weighted = self.cost.weighted_cost(inner, term);
            if !inner.is_finite() || !weighted.is_finite() {
                stats.skipped += 1;
                tracing::debug!(
                    row = triplet.row,
                    col = triplet.col,
                    inner,
                    "skipping non-finite update"
                );
                continue;
            }
            stats.cost += 0.5 * weighted * inner;
            stats.applied += 1;

            let (fi, cj) = (i * d, j * d);
            for k in 0..d {
                let f = focus.load(fi + k);
                let c = context.load(cj + k);
                let df = rule.step(Side::Focus, fi + k, weighted * c, step_size);
                let dc = rule.step(Side::Context, cj + k, weighted * f, step_size);
                focus.add(fi + k, -df, consistency);
                context.add(cj + k, -dc, consistency);
            }
            let db = rule.step(Side::FocusBias, i, weighted, step_size);
            focus_bias.add(i, -db, consistency);
            let db = rule.step(Side::ContextBias, j, weighted, step_size);
            context_bias.add(j, -db, consistency);
        }
        stats
    }

    /// `normalize((focus[i] + context[v]) / 2)` for every focus index `i` with
    /// vertex `v`, keyed by vertex label.
    pub fn embedding(&self) -> Embedding {
        let d = self.settings.dimension;
        let focus = self.graph.focus_vertices();
        let mut keys = Vec::with_capacity(focus.len());
        let mut vectors = Vec::with_capacity(focus.len() * d);
        for (i, &vertex) in focus.iter().enumerate() {
            let mut row: Vec<f64> = self
                .params
                .focus_row(i)
                .into_iter()
                .zip(self.params.context_row(vertex as usize))
                .map(|(f, c)| (f + c) / 2.0)
                .collect();
            normalize_in_place(&mut row);
            vectors.extend(row.into_iter().map(|x| x as f32));
            keys.push(self.graph.label(vertex).to_string());
        }
        Embedding::new(d, keys, vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Consistency, CostFunctionKind, OptimizationMethod};
    use crate::graph::{GraphBuilder, InputGraph, VertexKind};

    fn pool(threads: usize) -> ThreadPool {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap()
    }

    fn pair() -> InputGraph {
        let mut b = GraphBuilder::new();
        b.add_triple("a", "p", "b");
        b.build().unwrap()
    }

    fn settings(method: OptimizationMethod) -> OptimizerSettings {
        OptimizerSettings {
            dimension: 2,
            threads: 1,
            method,
            tolerance: 1e-6,
            max_iterations: 500,
            ..OptimizerSettings::default()
        }
    }

    fn pair_matrix() -> CoOccurrenceMatrix {
        let mut m = CoOccurrenceMatrix::new(2, 2);
        m.append(0, 1, 0.9).unwrap();
        m.append(1, 0, 0.8).unwrap();
        m
    }

    #[test]
    fn adagrad_fits_log_cooccurrence() {
        let g = pair();
        let m = pair_matrix();
        let pool = pool(1);
        let opt = Optimizer::new(&g, &m, settings(OptimizationMethod::Adagrad), &pool).unwrap();
        let report = opt.run(&pool).unwrap();
        assert!(report.converged);
        assert!(report.epochs < 500);
        assert_eq!(report.cost_history.len(), report.epochs);
        for t in m.iter() {
            let predicted = opt.parameters().predict(t.row as usize, t.col as usize);
            assert!((predicted - t.value.ln()).abs() < 0.05, "{predicted} vs {}", t.value.ln());
        }
    }

    #[test]
    fn cost_decreases_over_training() {
        let g = pair();
        let m = pair_matrix();
        let pool = pool(1);
        let opt = Optimizer::new(&g, &m, settings(OptimizationMethod::Adagrad), &pool).unwrap();
        let report = opt.run(&pool).unwrap();
        assert!(report.final_cost < report.cost_history[0]);
    }

    #[test]
    fn zero_value_refuses_to_start() {
        let g = pair();
        let mut m = CoOccurrenceMatrix::new(2, 2);
        m.append(0, 1, 0.0).unwrap();
        let result = Optimizer::new(&g, &m, settings(OptimizationMethod::Adagrad), &pool(1));
        assert!(matches!(
            result,
            Err(OptimizeError::NumericDivergence {
                stage: DivergenceStage::CostTerm { .. },
                ..
            })
        ));
    }

    #[test]
    fn pglove_with_unit_value_refuses_to_start() {
        let g = pair();
        let mut m = CoOccurrenceMatrix::new(2, 2);
        m.append(0, 1, 1.0).unwrap();
        let result = Optimizer::new(
            &g,
            &m,
            OptimizerSettings {
                cost_function: CostFunctionKind::Pglove,
                ..settings(OptimizationMethod::Adam)
            },
            &pool(1),
        );
        assert!(result.is_err());
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let g = pair();
        let m = CoOccurrenceMatrix::new(3, 2);
        let result = Optimizer::new(&g, &m, settings(OptimizationMethod::Adagrad), &pool(1));
        assert!(matches!(result, Err(OptimizeError::ShapeMismatch { rows: 3, .. })));
    }

    #[test]
    fn empty_matrix_keeps_initial_parameters() {
        let mut b = GraphBuilder::new();
        b.add_vertex(VertexKind::Uri, "alone");
        let g = b.build().unwrap();
        let m = CoOccurrenceMatrix::new(1, 1);
        let pool = pool(1);
        let opt = Optimizer::new(&g, &m, settings(OptimizationMethod::Adam), &pool).unwrap();
        let report = opt.run(&pool).unwrap();
        assert_eq!(report.epochs, 0);
        assert!(report.converged);
        let e = opt.embedding();
        assert_eq!(e.size(), 1);
        let norm: f32 = e.vector(0).iter().map(|x| x * x).sum();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn embedding_is_keyed_by_label_and_unit_norm() {
        let g = pair();
        let m = pair_matrix();
        let pool = pool(1);
        let opt = Optimizer::new(&g, &m, settings(OptimizationMethod::Amsgrad), &pool).unwrap();
        opt.run(&pool).unwrap();
        let e = opt.embedding();
        assert_eq!(e.size(), 2);
        assert_eq!(e.key(0), "a");
        assert_eq!(e.key(1), "b");
        for (_, v) in e.iter() {
            let norm: f32 = v.iter().map(|x| x * x).sum();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn runaway_learning_rate_diverges_mid_training() {
        let g = pair();
        let m = pair_matrix();
        let pool = pool(1);
        let opt = Optimizer::new(
            &g,
            &m,
            OptimizerSettings {
                learning_rate: 1e300,
                ..settings(OptimizationMethod::Adagrad)
            },
            &pool,
        )
        .unwrap();
        assert!(matches!(
            opt.run(&pool),
            Err(OptimizeError::NumericDivergence {
                stage: DivergenceStage::Epoch { .. },
                ..
            })
        ));
    }

    #[test]
    fn non_finite_parameter_skips_only_its_triplets() {
        let g = pair();
        let m = pair_matrix();
        let pool = pool(2);
        let opt = Optimizer::new(
            &g,
            &m,
            OptimizerSettings {
                consistency: Consistency::Strict,
                max_iterations: 20,
                ..settings(OptimizationMethod::Adagrad)
            },
            &pool,
        )
        .unwrap();
        opt.parameters().side(Side::Focus).store(0, f64::NAN);

        let report = opt.run(&pool).unwrap();
        // Only (0, 1) reads focus row 0.
        assert_eq!(report.skipped_updates, report.epochs);
        assert!(report.epochs > 0);
        assert!(report.final_cost.is_finite());
        assert!(opt.parameters().predict(1, 0).is_finite());
    }

    #[test]
    fn panicking_block_is_counted_and_others_still_apply() {
        let g = pair();
        let m = pair_matrix();
        let pool = pool(2);
        let opt = Optimizer::new(&g, &m, settings(OptimizationMethod::Adagrad), &pool).unwrap();
        // Ordinal 7 is past the end of the matrix and panics inside its block.
        let permutation = [0, 1, 7];
        let blocks = [0..2, 2..3];
        let stats = opt.run_epoch(&pool, &permutation, &blocks, 0.05);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.applied, 2);
        assert_eq!(stats.skipped, 0);
        assert!(stats.cost.is_finite());
    }
}
