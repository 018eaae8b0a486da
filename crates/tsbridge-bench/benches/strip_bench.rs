//! Built-in engine throughput.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tsbridge_bench::synthetic_module;
use tsbridge_core::strip::strip_types;

fn bench_strip(c: &mut Criterion) {
    let mut group = c.benchmark_group("strip_types");
    for &lines in &[14usize, 140, 1400] {
        let src = synthetic_module(lines);
        group.throughput(Throughput::Bytes(src.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &src, |b, src| {
            b.iter(|| black_box(strip_types(black_box(src))));
        });
    }
    group.finish();
}

fn bench_rejection(c: &mut Criterion) {
    let deep = format!("x = {}1{};", "(".repeat(500), ")".repeat(500));
    c.bench_function("strip_types/depth_guard", |b| {
        b.iter(|| black_box(strip_types(black_box(&deep))));
    });
}

criterion_group!(benches, bench_strip, bench_rejection);
criterion_main!(benches);
