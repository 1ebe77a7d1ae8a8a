//! JSON triple documents.
//!
//! ```json
//! {
//!   "triples": [
//!     {"subject": "Sun", "predicate": "is-a", "object": "Star"},
//!     {"subject": "Sun", "predicate": "name", "object": "Sol", "literal": true},
//!     {"subject": "_:b0", "predicate": "orbits", "object": "Sun", "weight": 2.0}
//!   ],
//!   "focus": ["Sun"]
//! }
//! ```
//!
//! Labels starting with `_:` are blank nodes. A label that appears both as a
//! predicate and as a subject or object becomes a [`VertexKind::Predicate`]
//! vertex. Without `focus`, every URI vertex is a focus vertex.

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};

use super::{EdgeWeighting, GraphBuilder, InputGraph, VertexKind};

/// Prefix marking blank-node labels.
pub const BLANK_PREFIX: &str = "_:";

/// One `subject predicate object` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripleRecord {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// The object is a literal value rather than a resource.
    #[serde(default)]
    pub literal: bool,
}

fn default_weight() -> f64 {
    1.0
}

/// A whole input document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub triples: Vec<TripleRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<Vec<String>>,
}

impl GraphDocument {
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Build the graph, applying `weighting` to the edges.
    pub fn build(&self, weighting: &EdgeWeighting) -> GraphResult<InputGraph> {
        let mut builder = GraphBuilder::new();
        for t in &self.triples {
            let s = builder.add_vertex(resource_kind(&t.subject), t.subject.as_str());
            let o = if t.literal {
                builder.add_vertex(VertexKind::Literal, t.object.as_str())
            } else {
                builder.add_vertex(resource_kind(&t.object), t.object.as_str())
            };
            let r = builder.add_relation(t.predicate.as_str());
            builder.add_edge(s, r, o, t.weight)?;
        }
        for t in &self.triples {
            if builder.vertex_id(&t.predicate).is_some() {
                builder.add_vertex(VertexKind::Predicate, t.predicate.as_str());
            }
        }

        if let Some(labels) = &self.focus {
            let focus = labels
                .iter()
                .map(|label| {
                    builder
                        .vertex_id(label)
                        .ok_or_else(|| GraphError::UnknownLabel {
                            label: label.clone(),
                        })
                })
                .collect::<GraphResult<Vec<_>>>()?;
            builder.set_focus(focus);
        }
        builder.build_weighted(weighting)
    }
}

fn resource_kind(label: &str) -> VertexKind {
    if label.starts_with(BLANK_PREFIX) {
        VertexKind::Blank
    } else {
        VertexKind::Uri
    }
}
