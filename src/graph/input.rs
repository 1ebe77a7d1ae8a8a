//! CSR-backed [`InputGraph`] and its [`GraphBuilder`].

use std::collections::{HashMap, HashSet};

use crate::config::Direction;
use crate::error::{GraphError, GraphResult};

use super::weighting::EdgeWeighting;
use super::{Edge, EdgeId, GraphView, RelationId, Vertex, VertexId, VertexKind};

/// Compressed adjacency for one direction.
#[derive(Debug, Clone, Default)]
struct Adjacency {
    offsets: Vec<usize>,
    neighbors: Vec<VertexId>,
    edges: Vec<EdgeId>,
}

impl Adjacency {
    /// Build from `(vertex, neighbor, edge)` records grouped by vertex.
    fn build(
        vertex_count: usize,
        records: impl Iterator<Item = (VertexId, VertexId, EdgeId)> + Clone,
    ) -> Self {
        let mut offsets = vec![0usize; vertex_count + 1];
        for (v, _, _) in records.clone() {
            offsets[v as usize + 1] += 1;
        }
        for i in 0..vertex_count {
            offsets[i + 1] += offsets[i];
        }

        let total = offsets[vertex_count];
        let mut cursor = offsets.clone();
        let mut neighbors = vec![0; total];
        let mut edges = vec![0; total];
        for (v, n, e) in records {
            let slot = cursor[v as usize];
            neighbors[slot] = n;
            edges[slot] = e;
            cursor[v as usize] += 1;
        }

        Self {
            offsets,
            neighbors,
            edges,
        }
    }

    fn range(&self, vertex: VertexId) -> std::ops::Range<usize> {
        let v = vertex as usize;
        self.offsets[v]..self.offsets[v + 1]
    }
}

/// Immutable graph with precomputed out, in and undirected adjacency.
#[derive(Debug, Clone)]
pub struct InputGraph {
    vertices: Vec<Vertex>,
    relations: Vec<String>,
    edges: Vec<Edge>,
    outgoing: Adjacency,
    incoming: Adjacency,
    both: Adjacency,
    focus: Vec<VertexId>,
    label_index: HashMap<String, VertexId>,
}

impl InputGraph {
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn relation_label(&self, relation: RelationId) -> &str {
        &self.relations[relation as usize]
    }

    /// Look up a vertex by its label.
    pub fn lookup(&self, label: &str) -> Option<VertexId> {
        self.label_index.get(label).copied()
    }

    fn adjacency(&self, direction: Direction) -> &Adjacency {
        match direction {
            Direction::Out => &self.outgoing,
            Direction::In => &self.incoming,
            Direction::Both => &self.both,
        }
    }
}

impl GraphView for InputGraph {
    fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    fn relation_count(&self) -> usize {
        self.relations.len()
    }

    fn vertex_kind(&self, vertex: VertexId) -> VertexKind {
        self.vertices[vertex as usize].kind
    }

    fn label(&self, vertex: VertexId) -> &str {
        &self.vertices[vertex as usize].label
    }

    fn neighbors(&self, vertex: VertexId, direction: Direction) -> &[VertexId] {
        let adj = self.adjacency(direction);
        &adj.neighbors[adj.range(vertex)]
    }

    fn edge_ids(&self, vertex: VertexId, direction: Direction) -> &[EdgeId] {
        let adj = self.adjacency(direction);
        &adj.edges[adj.range(vertex)]
    }

    fn edge_relation(&self, edge: EdgeId) -> RelationId {
        self.edges[edge as usize].relation
    }

    fn edge_weight(&self, edge: EdgeId) -> f64 {
        self.edges[edge as usize].weight
    }

    fn focus_vertices(&self) -> &[VertexId] {
        &self.focus
    }
}

/// Incremental builder for [`InputGraph`].
///
/// Vertices and relations are interned by label, so adding the same label twice
/// returns the existing id.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    vertices: Vec<Vertex>,
    label_index: HashMap<String, VertexId>,
    relations: Vec<String>,
    relation_index: HashMap<String, RelationId>,
    edges: Vec<Edge>,
    focus: Option<Vec<VertexId>>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or find) a vertex. An existing vertex keeps its original kind unless
    /// the new kind is [`VertexKind::Predicate`].
    pub fn add_vertex(&mut self, kind: VertexKind, label: impl Into<String>) -> VertexId {
        let label = label.into();
        if let Some(&id) = self.label_index.get(&label) {
            if kind == VertexKind::Predicate {
                self.vertices[id as usize].kind = kind;
            }
            return id;
        }
        let id = self.vertices.len() as VertexId;
        self.label_index.insert(label.clone(), id);
        self.vertices.push(Vertex { kind, label });
        id
    }

    /// Add (or find) a relation type.
    pub fn add_relation(&mut self, label: impl Into<String>) -> RelationId {
        let label = label.into();
        if let Some(&id) = self.relation_index.get(&label) {
            return id;
        }
        let id = self.relations.len() as RelationId;
        self.relation_index.insert(label.clone(), id);
        self.relations.push(label);
        id
    }

    /// Add a directed edge `source --relation--> target`.
    pub fn add_edge(
        &mut self,
        source: VertexId,
        relation: RelationId,
        target: VertexId,
        weight: f64,
    ) -> GraphResult<EdgeId> {
        for v in [source, target] {
            if v as usize >= self.vertices.len() {
                return Err(GraphError::VertexOutOfRange {
                    vertex: v,
                    count: self.vertices.len(),
                });
            }
        }
        if relation as usize >= self.relations.len() {
            return Err(GraphError::RelationOutOfRange {
                relation,
                count: self.relations.len(),
            });
        }
        if !(weight.is_finite() && weight >= 0.0) {
            return Err(GraphError::InvalidWeight { weight });
        }
        let id = self.edges.len() as EdgeId;
        self.edges.push(Edge {
            source,
            target,
            relation,
            weight,
        });
        Ok(id)
    }

    /// Convenience: intern labels and add an edge of weight 1.
    pub fn add_triple(&mut self, subject: &str, predicate: &str, object: &str) -> EdgeId {
        let s = self.add_vertex(VertexKind::Uri, subject);
        let o = self.add_vertex(VertexKind::Uri, object);
        let r = self.add_relation(predicate);
        let id = self.edges.len() as EdgeId;
        self.edges.push(Edge {
            source: s,
            target: o,
            relation: r,
            weight: 1.0,
        });
        id
    }

    /// Explicit focus set, in output order. Without it every URI vertex is a focus.
    pub fn set_focus(&mut self, focus: impl IntoIterator<Item = VertexId>) {
        self.focus = Some(focus.into_iter().collect());
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Id of an already added vertex.
    pub fn vertex_id(&self, label: &str) -> Option<VertexId> {
        self.label_index.get(label).copied()
    }

    /// Build with the weights as given.
    pub fn build(self) -> GraphResult<InputGraph> {
        self.build_weighted(&EdgeWeighting::Manual)
    }

    /// Build, rewriting edge weights with `weighting` first.
    pub fn build_weighted(mut self, weighting: &EdgeWeighting) -> GraphResult<InputGraph> {
        let n = self.vertices.len();
        weighting.apply(n, &mut self.edges)?;

        let focus = match self.focus.take() {
            Some(focus) => {
                let mut seen = HashSet::with_capacity(focus.len());
                for &v in &focus {
                    if v as usize >= n {
                        return Err(GraphError::VertexOutOfRange {
                            vertex: v,
                            count: n,
                        });
                    }
                    if !seen.insert(v) {
                        return Err(GraphError::DuplicateFocus { vertex: v });
                    }
                }
                focus
            }
            None => self
                .vertices
                .iter()
                .enumerate()
                .filter(|(_, v)| v.kind == VertexKind::Uri)
                .map(|(i, _)| i as VertexId)
                .collect(),
        };

        let edges = &self.edges;
        let out_records = edges
            .iter()
            .enumerate()
            .map(|(i, e)| (e.source, e.target, i as EdgeId));
        let in_records = edges
            .iter()
            .enumerate()
            .map(|(i, e)| (e.target, e.source, i as EdgeId));
        let outgoing = Adjacency::build(n, out_records.clone());
        let incoming = Adjacency::build(n, in_records.clone());
        let both = Adjacency::build(n, out_records.chain(in_records));

        tracing::debug!(
            vertices = n,
            edges = edges.len(),
            relations = self.relations.len(),
            focus = focus.len(),
            "built input graph"
        );

        Ok(InputGraph {
            vertices: self.vertices,
            relations: self.relations,
            outgoing,
            incoming,
            both,
            edges: self.edges,
            focus,
            label_index: self.label_index,
        })
    }
}
