//! Post-processing of finished bookmark-coloring vectors.

use crate::config::Normalization;

use super::paint::Bcv;

/// Gap kept below 1 by [`Normalization::ToUnity`]; GloVe-family costs need X < 1.
pub const UNITY_MARGIN: f64 = 1e-6;

/// Largest value produced by [`Normalization::ToCounts`].
pub const COUNT_CEILING: f64 = 10_000.0;

/// Drop the root's self entry and rescale the rest. Returns sorted
/// `(context, value)` pairs; empty when nothing but the root was painted.
pub fn normalize(mut bcv: Bcv, policy: Normalization) -> Vec<(u32, f64)> {
    bcv.remove_root();
    let mut entries = bcv.to_sorted_vec();
    entries.retain(|&(_, v)| v > 0.0);
    if entries.is_empty() {
        return entries;
    }

    match policy {
        Normalization::ToUnity => {
            let total: f64 = entries.iter().map(|&(_, v)| v).sum();
            let scale = (1.0 - UNITY_MARGIN) / total;
            for (_, v) in &mut entries {
                *v *= scale;
            }
        }
        Normalization::ToCounts => {
            let max = entries.iter().map(|&(_, v)| v).fold(0.0, f64::max);
            let scale = COUNT_CEILING / max;
            for (_, v) in &mut entries {
                *v = (*v * scale).round().max(1.0);
            }
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Bcv {
        let mut bcv = Bcv::new(0);
        bcv.deposit(0, 0.5);
        bcv.deposit(1, 0.3);
        bcv.deposit(2, 0.1);
        bcv.deposit(3, 0.00001);
        bcv
    }

    #[test]
    fn to_unity_drops_root_and_sums_below_one() {
        let out = normalize(sample(), Normalization::ToUnity);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|&(c, v)| c != 0 && v > 0.0 && v < 1.0));
        let sum: f64 = out.iter().map(|&(_, v)| v).sum();
        assert!(sum < 1.0);
        assert!((sum - (1.0 - UNITY_MARGIN)).abs() < 1e-12);
        // Relative order survives.
        assert!(out[0].1 > out[1].1 && out[1].1 > out[2].1);
    }

    #[test]
    fn to_counts_is_bounded_and_integral() {
        let out = normalize(sample(), Normalization::ToCounts);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], (1, COUNT_CEILING));
        for &(_, v) in &out {
            assert!((1.0..=COUNT_CEILING).contains(&v));
            assert_eq!(v, v.round());
        }
        // 0.1 / 0.3 of the ceiling, rounded.
        assert_eq!(out[1].1, 3333.0);
        // Tiny entries clamp to one count.
        assert_eq!(out[2].1, 1.0);
    }

    #[test]
    fn root_only_vector_normalizes_to_nothing() {
        let mut bcv = Bcv::new(4);
        bcv.deposit(4, 0.15);
        assert!(normalize(bcv.clone(), Normalization::ToUnity).is_empty());
        assert!(normalize(bcv, Normalization::ToCounts).is_empty());
    }
}
