//! Aggregation performance benchmarks over varying match-group sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use relfeat::aggregation::{self, Aggregation};
use relfeat::value::Num;

fn sample_values(size: usize) -> Vec<Num> {
    (0..size).map(|i| (i % 97) as Num).collect()
}

fn bench_sum(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation_sum");
    for size in [100usize, 10_000, 100_000] {
        let values = sample_values(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &values, |b, values| {
            b.iter(|| aggregation::apply(Aggregation::Sum, values));
        });
    }
    group.finish();
}

fn bench_stddev(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation_stddev");
    for size in [100usize, 10_000, 100_000] {
        let values = sample_values(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &values, |b, values| {
            b.iter(|| aggregation::apply(Aggregation::Stddev, values));
        });
    }
    group.finish();
}

fn bench_median(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation_median");
    for size in [100usize, 10_000] {
        let values = sample_values(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &values, |b, values| {
            b.iter(|| aggregation::apply(Aggregation::Median, values));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sum, bench_stddev, bench_median);
criterion_main!(benches);
