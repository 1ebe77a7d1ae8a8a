//! Dense parameters shared by all optimizer workers.
//!
//! Every coordinate is an `AtomicU64` holding `f64` bits. Workers own disjoint
//! triplet ranges but triplets share rows, so two workers can touch the same
//! coordinate concurrently:
//!
//! - [`Consistency::Hogwild`]: relaxed load, compute, relaxed store. A
//!   concurrent write to the same coordinate can be lost. Memory-safe, racy in
//!   value only.
//! - [`Consistency::Strict`]: compare-and-swap loop, no write is lost.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use rayon::prelude::*;

use crate::config::Consistency;
use crate::rng::{STREAM_INIT, SeedSequence};

/// Rows initialized per derived generator; fixed so layout does not depend on
/// thread count.
const INIT_CHUNK_ROWS: usize = 1024;

/// Flat array of atomically accessed `f64` cells.
#[derive(Debug)]
pub struct SharedArray {
    cells: Vec<AtomicU64>,
}

impl SharedArray {
    pub fn filled(len: usize, value: f64) -> Self {
        let bits = value.to_bits();
        Self {
            cells: (0..len).map(|_| AtomicU64::new(bits)).collect(),
        }
    }

    pub fn from_vec(values: Vec<f64>) -> Self {
        Self {
            cells: values
                .into_iter()
                .map(|v| AtomicU64::new(v.to_bits()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn load(&self, index: usize) -> f64 {
        f64::from_bits(self.cells[index].load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, index: usize, value: f64) {
        self.cells[index].store(value.to_bits(), Ordering::Relaxed);
    }

    /// Replace the cell with `f(old)` and return the new value.
    #[inline]
    pub fn update(&self, index: usize, consistency: Consistency, f: impl Fn(f64) -> f64) -> f64 {
        match consistency {
            Consistency::Hogwild => {
                let new = f(self.load(index));
                self.store(index, new);
                new
            }
            Consistency::Strict => {
                let cell = &self.cells[index];
                let mut current = cell.load(Ordering::Relaxed);
                loop {
                    let new = f(f64::from_bits(current));
                    match cell.compare_exchange_weak(
                        current,
                        new.to_bits(),
                        Ordering::AcqRel,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => return new,
                        Err(actual) => current = actual,
                    }
                }
            }
        }
    }

    /// Add `delta` to the cell and return the new value.
    #[inline]
    pub fn add(&self, index: usize, delta: f64, consistency: Consistency) -> f64 {
        self.update(index, consistency, |v| v + delta)
    }

    pub fn to_vec(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.load(i)).collect()
    }
}

/// Which parameter block a coordinate belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Focus,
    Context,
    FocusBias,
    ContextBias,
}

/// Row counts and dimension shared by parameters and optimizer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamShape {
    pub focus_rows: usize,
    pub context_rows: usize,
    pub dimension: usize,
}

impl ParamShape {
    fn len(&self, side: Side) -> usize {
        match side {
            Side::Focus => self.focus_rows * self.dimension,
            Side::Context => self.context_rows * self.dimension,
            Side::FocusBias => self.focus_rows,
            Side::ContextBias => self.context_rows,
        }
    }
}

/// One [`SharedArray`] per [`Side`].
#[derive(Debug)]
pub struct ParamSet {
    shape: ParamShape,
    focus: SharedArray,
    context: SharedArray,
    focus_bias: SharedArray,
    context_bias: SharedArray,
}

impl ParamSet {
    /// Every cell set to `value`.
    pub fn filled(shape: ParamShape, value: f64) -> Self {
        Self {
            shape,
            focus: SharedArray::filled(shape.len(Side::Focus), value),
            context: SharedArray::filled(shape.len(Side::Context), value),
            focus_bias: SharedArray::filled(shape.len(Side::FocusBias), value),
            context_bias: SharedArray::filled(shape.len(Side::ContextBias), value),
        }
    }

    /// Uniform values in `[-0.5, 0.5) / dimension`, drawn from generators
    /// derived per side and row chunk.
    pub fn random(shape: ParamShape, seeds: &SeedSequence) -> Self {
        let scale = 1.0 / shape.dimension as f64;
        let init = |side: Side, tag: u64, row_width: usize| {
            let mut values = vec![0.0f64; shape.len(side)];
            let chunk = (INIT_CHUNK_ROWS * row_width).max(1);
            values
                .par_chunks_mut(chunk)
                .enumerate()
                .for_each(|(k, cells)| {
                    let mut rng = seeds.generator(STREAM_INIT, (tag << 40) | k as u64);
                    for cell in cells {
                        *cell = (rng.r#gen::<f64>() - 0.5) * scale;
                    }
                });
            SharedArray::from_vec(values)
        };
        Self {
            shape,
            focus: init(Side::Focus, 0, shape.dimension),
            context: init(Side::Context, 1, shape.dimension),
            focus_bias: init(Side::FocusBias, 2, 1),
            context_bias: init(Side::ContextBias, 3, 1),
        }
    }

    pub fn shape(&self) -> ParamShape {
        self.shape
    }

    pub fn dimension(&self) -> usize {
        self.shape.dimension
    }

    #[inline]
    pub fn side(&self, side: Side) -> &SharedArray {
        match side {
            Side::Focus => &self.focus,
            Side::Context => &self.context,
            Side::FocusBias => &self.focus_bias,
            Side::ContextBias => &self.context_bias,
        }
    }

    /// Copy of focus row `row`.
    pub fn focus_row(&self, row: usize) -> Vec<f64> {
        let d = self.shape.dimension;
        (row * d..(row + 1) * d).map(|i| self.focus.load(i)).collect()
    }

    /// Copy of context row `row`.
    pub fn context_row(&self, row: usize) -> Vec<f64> {
        let d = self.shape.dimension;
        (row * d..(row + 1) * d).map(|i| self.context.load(i)).collect()
    }

    /// `dot(focus[i], context[j]) + fbias[i] + cbias[j]`.
    pub fn predict(&self, focus_row: usize, context_row: usize) -> f64 {
        let d = self.shape.dimension;
        let (fi, cj) = (focus_row * d, context_row * d);
        let dot: f64 = (0..d)
            .map(|k| self.focus.load(fi + k) * self.context.load(cj + k))
            .sum();
        dot + self.focus_bias.load(focus_row) + self.context_bias.load(context_row)
    }
}

/// The trainable parameters of an embedding run.
pub type EmbeddingParameters = ParamSet;
