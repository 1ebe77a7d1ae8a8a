//! Property-based tests for bookmark coloring and the co-occurrence matrix.
//!
//! These check invariants that must hold for any graph and parameters:
//! - Paint conservation
//! - Dead-end termination
//! - Permutation bijection
//! - Determinism of the parallel merge
//! - Normalized row bounds

use proptest::prelude::*;

use kglove::bca::{BookmarkColoring, ColoringParams};
use kglove::config::{Direction, Normalization};
use kglove::graph::{GraphBuilder, GraphView, InputGraph, VertexKind};
use kglove::matrix::CoOccurrenceMatrix;

/// A graph with `n` vertices and weighted edges between them.
fn arb_graph() -> impl Strategy<Value = (usize, Vec<(usize, usize, f64)>)> {
    (2usize..15).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec((0..n, 0..n, 0.1f64..5.0), 0..40),
        )
    })
}

fn build((n, edges): &(usize, Vec<(usize, usize, f64)>)) -> InputGraph {
    let mut b = GraphBuilder::new();
    let ids: Vec<u32> = (0..*n)
        .map(|i| b.add_vertex(VertexKind::Uri, format!("v{i}")))
        .collect();
    let r = b.add_relation("r");
    for &(s, t, w) in edges {
        b.add_edge(ids[s], r, ids[t], w).unwrap();
    }
    b.build().unwrap()
}

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Out), Just(Direction::In), Just(Direction::Both)]
}

fn params(alpha: f64, epsilon: f64, direction: Direction) -> ColoringParams {
    ColoringParams {
        alpha,
        epsilon,
        direction,
        ..ColoringParams::default()
    }
}

mod conservation {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn painted_mass_never_exceeds_one(
            graph in arb_graph(),
            alpha in 0.01f64..0.99,
            epsilon in 1e-6f64..0.1,
            direction in arb_direction(),
            relation_contexts in any::<bool>(),
        ) {
            let g = build(&graph);
            let coloring = BookmarkColoring::new(
                &g,
                ColoringParams {
                    relation_contexts,
                    ..params(alpha, epsilon, direction)
                },
            );
            for &root in g.focus_vertices() {
                let (bcv, _) = coloring.color_vertex(root);
                let own = bcv.get(root).unwrap_or(0.0);
                prop_assert!(own >= alpha - 1e-12);
                prop_assert!(bcv.total() - own <= 1.0 + 1e-9);
                prop_assert!(bcv.total() <= 1.0 + 1e-9);
            }
        }

        #[test]
        fn isolated_vertex_keeps_exactly_alpha(
            graph in arb_graph(),
            alpha in 0.01f64..0.99,
            epsilon in 1e-6f64..0.1,
            direction in arb_direction(),
        ) {
            let (n, edges) = &graph;
            let mut b = GraphBuilder::new();
            let ids: Vec<u32> = (0..*n)
                .map(|i| b.add_vertex(VertexKind::Uri, format!("v{i}")))
                .collect();
            let r = b.add_relation("r");
            for &(s, t, w) in edges {
                b.add_edge(ids[s], r, ids[t], w).unwrap();
            }
            let lone = b.add_vertex(VertexKind::Uri, "lone");
            let g = b.build().unwrap();

            let coloring = BookmarkColoring::new(&g, params(alpha, epsilon, direction));
            let (bcv, _) = coloring.color_vertex(lone);
            prop_assert_eq!(bcv.len(), 1);
            prop_assert_eq!(bcv.get(lone), Some(alpha));
        }
    }
}

mod matrix_props {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn permutation_is_a_bijection(n in 0usize..2000, seed in any::<u64>()) {
            let mut m = CoOccurrenceMatrix::new(1, n.max(1));
            for col in 0..n {
                m.append(0, col as u32, 1.0).unwrap();
            }
            let mut rng = StdRng::seed_from_u64(seed);
            let mut perm = m.new_permutation(&mut rng);
            prop_assert_eq!(perm.len(), n);
            perm.sort_unstable();
            prop_assert!(perm.into_iter().eq(0..n));
        }

        #[test]
        fn max_tracks_largest_append(values in prop::collection::vec(0.0f64..100.0, 1..50)) {
            let mut m = CoOccurrenceMatrix::new(1, values.len());
            for (col, &v) in values.iter().enumerate() {
                m.append(0, col as u32, v).unwrap();
            }
            let expected = values.iter().copied().fold(0.0, f64::max);
            prop_assert_eq!(m.max(), expected);
            prop_assert_eq!(m.non_zero_count(), values.len());
        }
    }
}

mod merge_props {
    use super::*;

    fn pool(threads: usize) -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn matrix_does_not_depend_on_thread_count(
            graph in arb_graph(),
            alpha in 0.05f64..0.5,
            direction in arb_direction(),
        ) {
            let g = build(&graph);
            let coloring = BookmarkColoring::new(&g, params(alpha, 1e-4, direction));
            let (m1, r1) = coloring.color_all(&pool(1)).unwrap();
            let (m3, r3) = coloring.color_all(&pool(3)).unwrap();
            prop_assert_eq!(r1.failed_jobs, 0);
            prop_assert_eq!(r3.failed_jobs, 0);
            prop_assert_eq!(m1, m3);
        }

        #[test]
        fn unity_rows_stay_below_one(
            graph in arb_graph(),
            alpha in 0.05f64..0.5,
        ) {
            let g = build(&graph);
            let coloring = BookmarkColoring::new(&g, params(alpha, 1e-4, Direction::Both));
            let (m, _) = coloring.color_all(&pool(2)).unwrap();
            let mut sums = vec![0.0f64; m.focus_count()];
            for t in m.iter() {
                prop_assert!(t.row != t.col);
                prop_assert!(t.value > 0.0 && t.value < 1.0);
                sums[t.row as usize] += t.value;
            }
            for s in sums {
                prop_assert!(s < 1.0);
            }
        }

        #[test]
        fn count_rows_are_bounded_integers(graph in arb_graph()) {
            let g = build(&graph);
            let coloring = BookmarkColoring::new(
                &g,
                ColoringParams {
                    normalization: Normalization::ToCounts,
                    ..params(0.15, 1e-4, Direction::Both)
                },
            );
            let (m, _) = coloring.color_all(&pool(2)).unwrap();
            for t in m.iter() {
                prop_assert!((1.0..=10_000.0).contains(&t.value));
                prop_assert_eq!(t.value, t.value.round());
            }
        }
    }
}
