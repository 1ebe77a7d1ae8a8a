//! Edge weighting schemes.
//!
//! Paint is split across incident edges in proportion to edge weight, so the
//! weighting decides which neighbors a vertex's context is biased toward.

use std::collections::HashMap;

use petgraph::Graph;
use petgraph::algo::page_rank;
use petgraph::graph::NodeIndex;

use crate::error::{GraphError, GraphResult};

use super::{Edge, RelationId};

/// How edge weights are derived when the graph is built.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EdgeWeighting {
    /// Keep the weights supplied to the builder.
    #[default]
    Manual,
    /// Every edge weighs 1.
    Uniform,
    /// Weight = number of edges sharing the relation.
    PredicateFrequency,
    /// Weight = 1 / number of edges sharing the relation.
    InversePredicateFrequency,
    /// Weight = PageRank of the edge target.
    PageRank { damping: f64, iterations: usize },
}

impl EdgeWeighting {
    /// Rewrite `edges` in place.
    pub fn apply(&self, vertex_count: usize, edges: &mut [Edge]) -> GraphResult<()> {
        match self {
            EdgeWeighting::Manual => {}
            EdgeWeighting::Uniform => edges.iter_mut().for_each(|e| e.weight = 1.0),
            EdgeWeighting::PredicateFrequency => {
                let freq = relation_frequencies(edges);
                for e in edges.iter_mut() {
                    e.weight = freq[&e.relation] as f64;
                }
            }
            EdgeWeighting::InversePredicateFrequency => {
                let freq = relation_frequencies(edges);
                for e in edges.iter_mut() {
                    e.weight = 1.0 / freq[&e.relation] as f64;
                }
            }
            EdgeWeighting::PageRank {
                damping,
                iterations,
            } => {
                if !(0.0..=1.0).contains(damping) {
                    return Err(GraphError::InvalidDamping { damping: *damping });
                }
                let scores = target_pagerank(vertex_count, edges, *damping, *iterations);
                for e in edges.iter_mut() {
                    e.weight = scores[e.target as usize];
                }
            }
        }
        Ok(())
    }
}

fn relation_frequencies(edges: &[Edge]) -> HashMap<RelationId, usize> {
    let mut freq = HashMap::new();
    for e in edges {
        *freq.entry(e.relation).or_insert(0) += 1;
    }
    freq
}

fn target_pagerank(
    vertex_count: usize,
    edges: &[Edge],
    damping: f64,
    iterations: usize,
) -> Vec<f64> {
    if vertex_count == 0 {
        return vec![];
    }
    let mut graph: Graph<(), ()> = Graph::with_capacity(vertex_count, edges.len());
    for _ in 0..vertex_count {
        graph.add_node(());
    }
    for e in edges {
        graph.add_edge(
            NodeIndex::new(e.source as usize),
            NodeIndex::new(e.target as usize),
            (),
        );
    }
    page_rank(&graph, damping, iterations)
}
