//! Path codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use entitree_core::PathCodec;

/// A code `depth` levels deep.
fn code_of_depth(codec: &PathCodec, depth: usize) -> String {
    let mut code = String::new();
    for level in 0..depth {
        code = codec.encode(&code, (level % 9 + 1) as u32).unwrap();
    }
    code
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_encode");
    let codec = PathCodec::new(4).unwrap();

    for depth in [1usize, 8, 32].iter() {
        let parent = code_of_depth(&codec, *depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &parent, |b, parent| {
            b.iter(|| {
                let code = codec.encode(black_box(parent), black_box(42)).unwrap();
                black_box(code);
            });
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_decode");
    let codec = PathCodec::new(4).unwrap();

    for depth in [1usize, 8, 32].iter() {
        let code = code_of_depth(&codec, *depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &code, |b, code| {
            b.iter(|| {
                let decoded = codec.decode(black_box(code)).unwrap();
                black_box(decoded);
            });
        });
    }
    group.finish();
}

fn bench_navigation(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_navigation");
    let codec = PathCodec::new(4).unwrap();
    let code = code_of_depth(&codec, 16);
    let ancestor = codec.parent_of(&code, 8).to_string();

    group.bench_function("ancestors", |b| {
        b.iter(|| black_box(codec.ancestors(black_box(&code))));
    });
    group.bench_function("is_ancestor", |b| {
        b.iter(|| black_box(codec.is_ancestor(black_box(&ancestor), black_box(&code))));
    });
    group.bench_function("rebase", |b| {
        b.iter(|| black_box(codec.rebase(black_box(&code), &ancestor, "00090003")));
    });
    group.bench_function("children_pattern", |b| {
        b.iter(|| black_box(codec.children_pattern(black_box(&code))));
    });
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_navigation);

criterion_main!(benches);
