//! Matchmaker throughput: population-to-peripheral row matching over
//! varying peripheral table sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use relfeat::column::Column;
use relfeat::index_manager::IndexManager;
use relfeat::matchmaker::Matchmaker;
use relfeat::placeholder::{JoinKeyPair, Placeholder, Relationship, ROOT};
use relfeat::schema::{DataFrame, Role, Schema};

fn population(size: usize) -> DataFrame {
    DataFrame::new(
        "customers",
        vec![Column::from_cats(
            "customer_id",
            "",
            (0..size as i32).collect(),
        )],
        Schema::new().with_role("customer_id", Role::JoinKey),
    )
    .unwrap()
}

fn orders(size: usize, fanout: usize) -> DataFrame {
    let ids: Vec<i32> = (0..size * fanout).map(|i| (i / fanout) as i32).collect();
    DataFrame::new(
        "orders",
        vec![Column::from_cats("customer_id", "", ids)],
        Schema::new().with_role("customer_id", Role::JoinKey),
    )
    .unwrap()
}

fn bench_make_matches(c: &mut Criterion) {
    let mut group = c.benchmark_group("matchmaker_make_matches");
    for size in [100usize, 10_000] {
        let pop = population(size);
        let ord = orders(size, 5);
        let mut ph = Placeholder::new("customers");
        ph.add_peripheral(
            ROOT,
            "orders",
            vec![JoinKeyPair {
                left: "customer_id".into(),
                right: "customer_id".into(),
            }],
            None,
            0.0,
            Relationship::OneToMany,
            false,
        );
        let edge = ph.node(1).clone();
        let manager = IndexManager::new();
        let weights = vec![1.0; size];

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mm = Matchmaker::new(&pop, &ord, &edge, &manager, true);
                mm.make_matches(&weights)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_make_matches);
criterion_main!(benches);
