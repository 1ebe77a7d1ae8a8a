//! Benchmarks for coloring and optimization.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use kglove::bca::{BookmarkColoring, ColoringParams};
use kglove::graph::{GraphBuilder, InputGraph};
use kglove::optimize::{Optimizer, OptimizerSettings};

/// `n` vertices in a ring with chords to the vertex 7 ahead.
fn ring(n: usize) -> InputGraph {
    let mut b = GraphBuilder::new();
    for i in 0..n {
        b.add_triple(&format!("v{i}"), "next", &format!("v{}", (i + 1) % n));
        b.add_triple(&format!("v{i}"), "chord", &format!("v{}", (i + 7) % n));
    }
    b.build().unwrap()
}

fn pool() -> rayon::ThreadPool {
    rayon::ThreadPoolBuilder::new().build().unwrap()
}

fn bench_color_vertex(c: &mut Criterion) {
    let g = ring(1_000);
    let coloring = BookmarkColoring::new(
        &g,
        ColoringParams {
            alpha: 0.15,
            epsilon: 1e-5,
            ..ColoringParams::default()
        },
    );

    c.bench_function("color_vertex_ring_1k", |bench| {
        bench.iter(|| black_box(coloring.color_vertex(black_box(0))))
    });
}

fn bench_color_all(c: &mut Criterion) {
    let g = ring(1_000);
    let pool = pool();
    let coloring = BookmarkColoring::new(&g, ColoringParams::default());

    c.bench_function("color_all_ring_1k", |bench| {
        bench.iter(|| black_box(coloring.color_all(&pool).unwrap()))
    });
}

fn bench_epochs(c: &mut Criterion) {
    let g = ring(500);
    let pool = pool();
    let (matrix, _) = BookmarkColoring::new(&g, ColoringParams::default())
        .color_all(&pool)
        .unwrap();
    let settings = OptimizerSettings {
        dimension: 50,
        threads: pool.current_num_threads(),
        tolerance: 0.0,
        max_iterations: 5,
        ..OptimizerSettings::default()
    };

    c.bench_function("five_epochs_ring_500_d50", |bench| {
        bench.iter(|| {
            let optimizer = Optimizer::new(&g, &matrix, settings, &pool).unwrap();
            black_box(optimizer.run(&pool).unwrap())
        })
    });
}

criterion_group!(benches, bench_color_vertex, bench_color_all, bench_epochs);
criterion_main!(benches);
