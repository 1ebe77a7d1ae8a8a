//! Per-job paint state: the bookmark-coloring vector and the wet-paint registry.

use std::collections::VecDeque;

use crate::graph::VertexId;

use super::accumulator::PaintMap;

/// Bookmark-coloring vector: dry paint per context index for one root.
#[derive(Debug, Clone)]
pub struct Bcv {
    root: VertexId,
    paint: PaintMap,
}

impl Bcv {
    pub fn new(root: VertexId) -> Self {
        Self {
            root,
            paint: PaintMap::new(),
        }
    }

    /// Deposit dry paint on a context index.
    pub fn deposit(&mut self, context: u32, amount: f64) {
        self.paint.add(context, amount);
    }

    pub fn get(&self, context: u32) -> Option<f64> {
        self.paint.get(context)
    }

    /// Remove and return the root's own entry.
    pub fn remove_root(&mut self) -> Option<f64> {
        self.paint.remove(self.root)
    }

    /// Drop one context entry.
    pub fn remove(&mut self, context: u32) -> Option<f64> {
        self.paint.remove(context)
    }

    /// Add `scale * other` entry-wise.
    pub fn splice(&mut self, other: &Bcv, scale: f64) {
        for (context, amount) in other.paint.iter() {
            self.paint.add(context, amount * scale);
        }
    }

    pub fn len(&self) -> usize {
        self.paint.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paint.is_empty()
    }

    /// Total dry paint.
    pub fn total(&self) -> f64 {
        self.paint.total()
    }

    /// Entries sorted by context index.
    pub fn to_sorted_vec(&self) -> Vec<(u32, f64)> {
        self.paint.to_sorted_vec()
    }
}

/// Wet paint waiting at frontier vertices, drained in FIFO order.
///
/// A vertex has at most one pending entry: paint arriving at a vertex that is
/// already queued accumulates into that entry instead of re-queueing it.
#[derive(Debug, Default)]
pub struct PaintRegistry {
    pending: PaintMap,
    order: VecDeque<VertexId>,
}

impl PaintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add wet paint to `vertex`, queueing it if it is not already pending.
    pub fn add(&mut self, vertex: VertexId, amount: f64) {
        if self.pending.add(vertex, amount) {
            self.order.push_back(vertex);
        }
    }

    /// Take the oldest pending vertex and all of its wet paint.
    pub fn pop(&mut self) -> Option<(VertexId, f64)> {
        let vertex = self.order.pop_front()?;
        let amount = self.pending.remove(vertex)?;
        Some((vertex, amount))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Wet paint currently in flight.
    pub fn in_flight(&self) -> f64 {
        self.pending.total()
    }
}
