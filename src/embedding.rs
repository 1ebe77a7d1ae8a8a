//! Final entity vectors.

use std::collections::HashMap;

use serde::Serialize;

/// Immutable map from entity key to an L2-normalized vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    dimension: usize,
    keys: Vec<String>,
    vectors: Vec<f32>,
    index: HashMap<String, usize>,
}

/// A ranked neighbor from [`Embedding::most_similar`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Similar {
    pub key: String,
    pub score: f32,
}

/// One serialized entry, borrowed from the embedding.
#[derive(Debug, Serialize)]
pub struct EmbeddingRecord<'a> {
    pub key: &'a str,
    pub vector: &'a [f32],
}

impl Embedding {
    /// `vectors` holds `keys.len()` rows of `dimension` values each, already
    /// normalized. Duplicate keys resolve to their first row.
    pub fn new(dimension: usize, keys: Vec<String>, vectors: Vec<f32>) -> Self {
        debug_assert_eq!(keys.len() * dimension, vectors.len());
        let mut index = HashMap::with_capacity(keys.len());
        for (i, key) in keys.iter().enumerate() {
            index.entry(key.clone()).or_insert(i);
        }
        Self {
            dimension,
            keys,
            vectors,
            index,
        }
    }

    pub fn size(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn key(&self, i: usize) -> &str {
        &self.keys[i]
    }

    pub fn vector(&self, i: usize) -> &[f32] {
        &self.vectors[i * self.dimension..(i + 1) * self.dimension]
    }

    pub fn get(&self, key: &str) -> Option<&[f32]> {
        self.index.get(key).map(|&i| self.vector(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> + '_ {
        (0..self.size()).map(move |i| (self.key(i), self.vector(i)))
    }

    /// Entries in focus order, ready for serialization.
    pub fn records(&self) -> Vec<EmbeddingRecord<'_>> {
        self.iter()
            .map(|(key, vector)| EmbeddingRecord { key, vector })
            .collect()
    }

    /// The `k` entities closest to `key` by cosine similarity, best first.
    /// `None` when `key` is unknown.
    pub fn most_similar(&self, key: &str, k: usize) -> Option<Vec<Similar>> {
        let &anchor = self.index.get(key)?;
        let query = self.vector(anchor);
        let mut scored: Vec<Similar> = (0..self.size())
            .filter(|&i| i != anchor)
            .map(|i| Similar {
                key: self.keys[i].clone(),
                score: dot(query, self.vector(i)),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Some(scored)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Scale `v` to unit length in place; a zero vector stays zero.
pub fn normalize_in_place(v: &mut [f64]) {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in v {
            *x /= norm;
        }
    }
}
