//! Append-only sparse co-occurrence matrix in triplet form.
//!
//! Rows are focus indices, columns are context indices. The bookmark coloring
//! merge thread is the only writer; once coloring finishes the matrix is read
//! by optimizer workers and only permutations are regenerated.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::error::MatrixError;

/// Triplet store with parallel growable arrays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoOccurrenceMatrix {
    focus_count: usize,
    context_count: usize,
    rows: Vec<u32>,
    cols: Vec<u32>,
    values: Vec<f64>,
    max: f64,
}

/// One nonzero entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Triplet {
    pub row: u32,
    pub col: u32,
    pub value: f64,
}

impl CoOccurrenceMatrix {
    /// Empty matrix with the given shape.
    pub fn new(focus_count: usize, context_count: usize) -> Self {
        Self {
            focus_count,
            context_count,
            rows: Vec::new(),
            cols: Vec::new(),
            values: Vec::new(),
            max: 0.0,
        }
    }

    /// Append a triplet. Amortized O(1).
    pub fn append(&mut self, row: u32, col: u32, value: f64) -> Result<(), MatrixError> {
        if row as usize >= self.focus_count || col as usize >= self.context_count {
            return Err(MatrixError::OutOfBounds {
                row,
                col,
                rows: self.focus_count,
                cols: self.context_count,
            });
        }
        if !value.is_finite() {
            return Err(MatrixError::NonFinite { value });
        }
        self.rows.push(row);
        self.cols.push(col);
        self.values.push(value);
        if value > self.max {
            self.max = value;
        }
        Ok(())
    }

    /// Triplet at `ordinal` in insertion order.
    pub fn get(&self, ordinal: usize) -> Triplet {
        Triplet {
            row: self.rows[ordinal],
            col: self.cols[ordinal],
            value: self.values[ordinal],
        }
    }

    pub fn non_zero_count(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Largest value ever appended (0 for an empty matrix).
    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn focus_count(&self) -> usize {
        self.focus_count
    }

    pub fn context_count(&self) -> usize {
        self.context_count
    }

    pub fn iter(&self) -> impl Iterator<Item = Triplet> + '_ {
        (0..self.non_zero_count()).map(|i| self.get(i))
    }

    /// Value at `(row, col)` by linear scan. Intended for tests and inspection.
    pub fn lookup(&self, row: u32, col: u32) -> Option<f64> {
        self.iter()
            .find(|t| t.row == row && t.col == col)
            .map(|t| t.value)
    }

    /// Fresh uniformly shuffled bijection over `[0, non_zero_count)`.
    pub fn new_permutation<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        let mut perm: Vec<usize> = (0..self.non_zero_count()).collect();
        perm.shuffle(rng);
        perm
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn append_tracks_max_and_count() {
        let mut m = CoOccurrenceMatrix::new(2, 3);
        m.append(0, 1, 0.25).unwrap();
        m.append(1, 2, 0.75).unwrap();
        m.append(1, 0, 0.5).unwrap();
        assert_eq!(m.non_zero_count(), 3);
        assert_eq!(m.max(), 0.75);
        assert_eq!(
            m.get(1),
            Triplet {
                row: 1,
                col: 2,
                value: 0.75
            }
        );
        assert_eq!(m.lookup(1, 0), Some(0.5));
        assert_eq!(m.lookup(0, 0), None);
    }

    #[test]
    fn append_rejects_out_of_bounds() {
        let mut m = CoOccurrenceMatrix::new(2, 3);
        assert!(matches!(
            m.append(2, 0, 1.0),
            Err(MatrixError::OutOfBounds { .. })
        ));
        assert!(matches!(
            m.append(0, 3, 1.0),
            Err(MatrixError::OutOfBounds { .. })
        ));
        assert!(matches!(
            m.append(0, 0, f64::NAN),
            Err(MatrixError::NonFinite { .. })
        ));
        assert!(m.is_empty());
    }

    #[test]
    fn permutation_of_empty_matrix_is_empty() {
        let m = CoOccurrenceMatrix::new(1, 1);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(m.new_permutation(&mut rng).is_empty());
    }

    #[test]
    fn permutation_changes_between_calls() {
        let mut m = CoOccurrenceMatrix::new(1, 64);
        for c in 0..64 {
            m.append(0, c, 1.0).unwrap();
        }
        let mut rng = StdRng::seed_from_u64(9);
        let a = m.new_permutation(&mut rng);
        let b = m.new_permutation(&mut rng);
        assert_ne!(a, b);

        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..64).collect::<Vec<_>>());
    }
}
