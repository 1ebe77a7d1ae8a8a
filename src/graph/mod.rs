//! Input graph: typed vertices, weighted relation-typed edges, focus set.
//!
//! The graph is built once upstream and is read-only afterwards. Coloring jobs
//! see it only through the [`GraphView`] trait so the propagation code does not
//! depend on how adjacency is stored.
//!
//! - [`InputGraph`] / [`GraphBuilder`]: CSR-backed implementation
//! - [`weighting`]: edge weighting schemes applied at build time
//! - [`document`]: the JSON triple document read by the CLI

pub mod document;
pub mod input;
pub mod weighting;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Direction;

pub use document::{GraphDocument, TripleRecord};
pub use input::{GraphBuilder, InputGraph};
pub use weighting::EdgeWeighting;

/// Dense vertex identifier in `[0, vertex_count)`.
pub type VertexId = u32;
/// Dense relation-type identifier in `[0, relation_count)`.
pub type RelationId = u32;
/// Dense edge identifier in `[0, edge_count)`.
pub type EdgeId = u32;

/// Kind tag carried by every vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexKind {
    Uri,
    Blank,
    Literal,
    /// A predicate that also occurs in subject or object position.
    Predicate,
}

impl fmt::Display for VertexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VertexKind::Uri => write!(f, "uri"),
            VertexKind::Blank => write!(f, "blank"),
            VertexKind::Literal => write!(f, "literal"),
            VertexKind::Predicate => write!(f, "predicate"),
        }
    }
}

/// A vertex with its kind and label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    pub kind: VertexKind,
    pub label: String,
}

/// A directed, relation-typed, weighted edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: VertexId,
    pub target: VertexId,
    pub relation: RelationId,
    pub weight: f64,
}

/// Read-only view of a graph as consumed by bookmark coloring.
///
/// Neighbor and edge-id slices for the same vertex and direction are aligned:
/// `edge_ids(v, d)[k]` connects `v` to `neighbors(v, d)[k]`.
pub trait GraphView: Sync {
    fn vertex_count(&self) -> usize;

    fn relation_count(&self) -> usize;

    fn vertex_kind(&self, vertex: VertexId) -> VertexKind;

    fn label(&self, vertex: VertexId) -> &str;

    fn neighbors(&self, vertex: VertexId, direction: Direction) -> &[VertexId];

    fn edge_ids(&self, vertex: VertexId, direction: Direction) -> &[EdgeId];

    fn edge_relation(&self, edge: EdgeId) -> RelationId;

    fn edge_weight(&self, edge: EdgeId) -> f64;

    /// Focus vertices in focus-index order.
    fn focus_vertices(&self) -> &[VertexId];

    /// Number of context columns: one per vertex, plus one per relation when
    /// relation contexts are enabled.
    fn context_count(&self, relation_contexts: bool) -> usize {
        if relation_contexts {
            self.vertex_count() + self.relation_count()
        } else {
            self.vertex_count()
        }
    }
}
