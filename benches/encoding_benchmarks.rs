//! String-to-category encoding throughput, insert path vs. lookup-only path.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use relfeat::encoding::{EncodeMode, Encoding};

fn strings(size: usize) -> Vec<String> {
    (0..size).map(|i| format!("category-{}", i % (size / 4).max(1))).collect()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoding_insert");
    for size in [1_000usize, 50_000] {
        let values = strings(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &values, |b, values| {
            b.iter(|| {
                let enc = Encoding::new();
                for s in values {
                    enc.encode(s, EncodeMode::Insert);
                }
            });
        });
    }
    group.finish();
}

fn bench_lookup_only(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoding_lookup_only");
    for size in [1_000usize, 50_000] {
        let values = strings(size);
        let enc = Encoding::new();
        for s in &values {
            enc.encode(s, EncodeMode::Insert);
        }
        group.bench_with_input(BenchmarkId::from_parameter(size), &values, |b, values| {
            b.iter(|| {
                for s in values {
                    enc.encode(s, EncodeMode::LookupOnly);
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_lookup_only);
criterion_main!(benches);
