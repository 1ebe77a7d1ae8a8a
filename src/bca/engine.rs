//! Parallel bookmark coloring over all focus vertices.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Instant;

use dashmap::DashMap;
use rayon::ThreadPool;

use crate::error::MatrixError;
use crate::graph::{GraphView, VertexId};
use crate::matrix::CoOccurrenceMatrix;
use crate::worker;

use super::normalize::normalize;
use super::paint::{Bcv, PaintRegistry};
use super::{ColoringParams, ColoringReport};

/// A finished, normalized row or the reason it is missing.
struct RowOutcome {
    focus_index: usize,
    vertex: VertexId,
    row: Result<ColoredRow, String>,
}

struct ColoredRow {
    entries: Vec<(u32, f64)>,
    memo_hits: usize,
}

/// Bookmark coloring driver over a read-only graph.
///
/// Jobs share nothing but the graph and, when memoization is on, a write-once
/// map of finished root vectors.
pub struct BookmarkColoring<'g, G: GraphView> {
    graph: &'g G,
    params: ColoringParams,
    memo: Option<DashMap<VertexId, Arc<Bcv>>>,
}

impl<'g, G: GraphView> BookmarkColoring<'g, G> {
    pub fn new(graph: &'g G, params: ColoringParams) -> Self {
        let memo = params.memoize.then(DashMap::new);
        Self {
            graph,
            params,
            memo,
        }
    }

    pub fn params(&self) -> &ColoringParams {
        &self.params
    }

    /// Raw (unnormalized) vector for `root`, plus the number of memo splices.
    pub fn color_vertex(&self, root: VertexId) -> (Bcv, usize) {
        let graph = self.graph;
        let ColoringParams {
            alpha,
            epsilon,
            direction,
            relation_contexts,
            ..
        } = self.params;
        let relation_base = graph.vertex_count() as u32;

        let mut bcv = Bcv::new(root);
        let mut wet = PaintRegistry::new();
        let mut memo_hits = 0;
        wet.add(root, 1.0);

        while let Some((vertex, paint)) = wet.pop() {
            if vertex != root {
                if let Some(cached) = self.memo.as_ref().and_then(|m| m.get(&vertex)) {
                    bcv.splice(&cached, paint);
                    memo_hits += 1;
                    continue;
                }
            }

            bcv.deposit(vertex, alpha * paint);
            if paint < epsilon {
                continue;
            }

            let neighbors = graph.neighbors(vertex, direction);
            let edges = graph.edge_ids(vertex, direction);
            let total: f64 = edges.iter().map(|&e| graph.edge_weight(e)).sum();
            if neighbors.is_empty() || !(total > 0.0) {
                // Dead end: the undistributed share leaves the system.
                continue;
            }

            let outgoing = (1.0 - alpha) * paint;
            for (&next, &edge) in neighbors.iter().zip(edges) {
                let weight = graph.edge_weight(edge);
                if weight <= 0.0 {
                    continue;
                }
                let share = outgoing * weight / total;
                if relation_contexts {
                    bcv.deposit(relation_base + graph.edge_relation(edge), alpha * share);
                    wet.add(next, (1.0 - alpha) * share);
                } else {
                    wet.add(next, share);
                }
            }
        }

        (bcv, memo_hits)
    }

    /// Color one focus vertex, memoize the raw vector, normalize.
    fn color_row(&self, root: VertexId) -> ColoredRow {
        let (bcv, memo_hits) = self.color_vertex(root);
        if let Some(memo) = &self.memo {
            memo.entry(root).or_insert_with(|| Arc::new(bcv.clone()));
        }
        ColoredRow {
            entries: normalize(bcv, self.params.normalization),
            memo_hits,
        }
    }

    /// Color every focus vertex on `pool` and merge the rows into a matrix.
    ///
    /// Rows are merged by the calling thread in focus-index order, so the
    /// matrix does not depend on which job finishes first. A panicking job is
    /// logged and its row left empty; it is counted in
    /// [`ColoringReport::failed_jobs`] rather than returned as an error.
    pub fn color_all(
        &self,
        pool: &ThreadPool,
    ) -> Result<(CoOccurrenceMatrix, ColoringReport), MatrixError> {
        let started = Instant::now();
        let focus = self.graph.focus_vertices();
        let context_count = self.graph.context_count(self.params.relation_contexts);
        tracing::info!(
            focus = focus.len(),
            contexts = context_count,
            threads = pool.current_num_threads(),
            alpha = self.params.alpha,
            epsilon = self.params.epsilon,
            "bookmark coloring started"
        );

        let mut matrix = CoOccurrenceMatrix::new(focus.len(), context_count);
        let mut report = ColoringReport {
            focus_vertices: focus.len(),
            ..Default::default()
        };
        let mut merge_error = None;

        let (tx, rx) = mpsc::channel::<RowOutcome>();
        std::thread::scope(|scope| {
            let producer = scope.spawn(move || {
                pool.scope(|s| {
                    for (focus_index, &vertex) in focus.iter().enumerate() {
                        let tx = tx.clone();
                        s.spawn(move |_| {
                            let row = worker::guarded(|| self.color_row(vertex));
                            // The receiver outlives every job.
                            let _ = tx.send(RowOutcome {
                                focus_index,
                                vertex,
                                row,
                            });
                        });
                    }
                });
            });

            let mut reorder: BTreeMap<usize, RowOutcome> = BTreeMap::new();
            let mut next = 0usize;
            for outcome in rx.iter() {
                reorder.insert(outcome.focus_index, outcome);
                while let Some(outcome) = reorder.remove(&next) {
                    next += 1;
                    match outcome.row {
                        Ok(row) => {
                            report.memo_hits += row.memo_hits;
                            if merge_error.is_some() {
                                continue;
                            }
                            for (context, value) in row.entries {
                                let row_index = outcome.focus_index as u32;
                                if let Err(e) = matrix.append(row_index, context, value) {
                                    merge_error = Some(e);
                                    break;
                                }
                            }
                        }
                        Err(message) => {
                            report.failed_jobs += 1;
                            tracing::warn!(
                                vertex = outcome.vertex,
                                focus_index = outcome.focus_index,
                                error = %message,
                                "coloring job failed; row dropped"
                            );
                        }
                    }
                    if next % 10_000 == 0 {
                        tracing::debug!(merged = next, total = focus.len(), "coloring progress");
                    }
                }
            }

            if producer.join().is_err() {
                tracing::error!("coloring producer thread panicked");
            }
        });

        if let Some(e) = merge_error {
            return Err(e);
        }

        report.non_zero = matrix.non_zero_count();
        tracing::info!(
            non_zero = report.non_zero,
            failed = report.failed_jobs,
            memo_hits = report.memo_hits,
            max = matrix.max(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "bookmark coloring finished"
        );
        Ok((matrix, report))
    }
}
