//! End-to-end boosting throughput: fitting a small ensemble over a
//! single-peripheral join graph at varying population sizes.

use std::collections::HashMap;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use relfeat::column::Column;
use relfeat::config::Hyperparams;
use relfeat::encoding::EncodingTable;
use relfeat::placeholder::{JoinKeyPair, Placeholder, Relationship, ROOT};
use relfeat::schema::{DataFrame, Role, Schema};
use relfeat::{Model, WorkerPool};

fn population(size: usize) -> DataFrame {
    let ids: Vec<i32> = (0..size as i32).collect();
    let target: Vec<f64> = (0..size).map(|i| if i % 2 == 0 { 0.0 } else { 1.0 }).collect();
    DataFrame::new(
        "customers",
        vec![
            Column::from_cats("customer_id", "", ids),
            Column::from_floats("target", "", target),
        ],
        Schema::new()
            .with_role("customer_id", Role::JoinKey)
            .with_role("target", Role::Target),
    )
    .unwrap()
}

fn orders(size: usize) -> DataFrame {
    let ids: Vec<i32> = (0..size as i32).flat_map(|i| [i, i]).collect();
    let amounts: Vec<f64> = (0..size)
        .flat_map(|i| {
            let base = if i % 2 == 0 { 1.0 } else { 500.0 };
            [base, base + 1.0]
        })
        .collect();
    DataFrame::new(
        "orders",
        vec![
            Column::from_cats("customer_id", "", ids),
            Column::from_floats("amount", "usd", amounts),
        ],
        Schema::new()
            .with_role("customer_id", Role::JoinKey)
            .with_role("amount", Role::Numerical),
    )
    .unwrap()
}

fn join_graph() -> Placeholder {
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
    ph
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit_small_ensemble");
    group.sample_size(10);
    for size in [200usize, 2_000] {
        let pop = population(size);
        let mut peripherals = HashMap::new();
        peripherals.insert("orders".to_string(), orders(size));
        let hyperparams = Hyperparams {
            num_subfeatures: 5,
            max_depth: 3,
            min_num_samples: 5,
            ..Default::default()
        };

        let pool = WorkerPool::new(num_cpus::get());
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                Model::fit(
                    &pop,
                    &peripherals,
                    join_graph(),
                    EncodingTable::default(),
                    hyperparams.clone(),
                    &pool,
                )
                .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fit);
criterion_main!(benches);
