//! End-to-end fit/transform scenarios over the public `Model` API.

use std::collections::HashMap;

use relfeat::column::Column;
use relfeat::config::Hyperparams;
use relfeat::encoding::EncodingTable;
use relfeat::placeholder::{JoinKeyPair, Placeholder, Relationship, ROOT};
use relfeat::schema::{DataFrame, Role, Schema};
use relfeat::{Model, WorkerPool};

fn customers() -> DataFrame {
    DataFrame::new(
        "customers",
        vec![
            Column::from_cats("customer_id", "", vec![1, 2, 3, 4, 5, 6]),
            Column::from_floats(
                "target",
                "",
                vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            ),
        ],
        Schema::new()
            .with_role("customer_id", Role::JoinKey)
            .with_role("target", Role::Target),
    )
    .unwrap()
}

fn orders(amounts: Vec<f64>, customer_ids: Vec<i32>) -> DataFrame {
    DataFrame::new(
        "orders",
        vec![
            Column::from_cats("customer_id", "", customer_ids),
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

fn small_hyperparams() -> Hyperparams {
    Hyperparams {
        num_subfeatures: 4,
        max_depth: 2,
        min_num_samples: 1,
        min_reduction: 0.0,
        ..Default::default()
    }
}

/// S1: a single peripheral table whose summed amount cleanly separates the
/// target; boosting should discover a tree using it.
#[test]
fn single_table_sum_scenario_fits_and_transforms() {
    let population = customers();
    let mut peripherals = HashMap::new();
    peripherals.insert(
        "orders".to_string(),
        orders(
            vec![1.0, 1.0, 2.0, 2.0, 50.0, 50.0, 200.0, 200.0, 300.0, 300.0, 400.0, 400.0],
            vec![1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6],
        ),
    );

    let pool = WorkerPool::new(2);
    let model = Model::fit(
        &population,
        &peripherals,
        join_graph(),
        EncodingTable::default(),
        small_hyperparams(),
        &pool,
    )
    .expect("fit should succeed on separable data");

    let matrix = model
        .transform(&population, &peripherals, &pool)
        .expect("transform should succeed on the same data");

    assert_eq!(matrix.nrows(), population.nrows());
    assert!(matrix.ncols() >= 1 && matrix.ncols() <= model.hyperparams().num_subfeatures);
}

/// S4: a population row with no matching peripheral rows must not break
/// fitting or transform, and its aggregated features should reflect the
/// empty-group convention (count-family -> 0, everything else -> NaN,
/// checked at the aggregation layer rather than re-derived here).
#[test]
fn population_row_with_no_matches_is_handled() {
    let population = customers();
    let mut peripherals = HashMap::new();
    // customer_id 6 never appears in orders.
    peripherals.insert(
        "orders".to_string(),
        orders(
            vec![1.0, 2.0, 50.0, 60.0, 200.0, 210.0, 300.0, 310.0, 400.0],
            vec![1, 1, 2, 2, 3, 4, 4, 5, 5],
        ),
    );

    let pool = WorkerPool::new(2);
    let model = Model::fit(
        &population,
        &peripherals,
        join_graph(),
        EncodingTable::default(),
        small_hyperparams(),
        &pool,
    )
    .expect("fit should tolerate population rows with zero matches");

    let matrix = model.transform(&population, &peripherals, &pool).unwrap();
    assert_eq!(matrix.nrows(), 6);
}

/// Testable Property 12: serializing then deserializing a fitted model
/// reproduces byte-identical `bincode` output.
#[test]
fn fitted_model_serializes_byte_identically_after_round_trip() {
    let population = customers();
    let mut peripherals = HashMap::new();
    peripherals.insert(
        "orders".to_string(),
        orders(
            vec![1.0, 2.0, 50.0, 60.0, 200.0, 210.0, 300.0, 310.0, 400.0, 410.0],
            vec![1, 1, 2, 2, 3, 3, 4, 4, 5, 5],
        ),
    );

    let pool = WorkerPool::new(2);
    let model = Model::fit(
        &population,
        &peripherals,
        join_graph(),
        EncodingTable::default(),
        small_hyperparams(),
        &pool,
    )
    .unwrap();

    let bytes = model.to_bytes().unwrap();
    let restored = Model::from_bytes(&bytes).unwrap();
    assert_eq!(bytes, restored.to_bytes().unwrap());
}

/// Fitting requires a target column; a population frame without one is
/// rejected before any peripheral is touched.
#[test]
fn fit_rejects_population_without_target_column() {
    let population = DataFrame::new(
        "customers",
        vec![Column::from_cats("customer_id", "", vec![1, 2, 3])],
        Schema::new().with_role("customer_id", Role::JoinKey),
    )
    .unwrap();
    let peripherals = HashMap::new();
    let pool = WorkerPool::new(1);

    let err = Model::fit(
        &population,
        &peripherals,
        Placeholder::new("customers"),
        EncodingTable::default(),
        small_hyperparams(),
        &pool,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        relfeat::FeatureEngineError::Schema(relfeat::schema::SchemaError::MissingTarget)
    ));
}

/// S5/S6: fitting twice with the same seed (and a different worker-pool
/// thread count) reproduces a bit-identical ensemble — Testable Property 3.
#[test]
fn fit_is_reproducible_across_seeds_and_thread_counts() {
    let population = customers();
    let mut peripherals = HashMap::new();
    peripherals.insert(
        "orders".to_string(),
        orders(
            vec![1.0, 1.0, 2.0, 2.0, 50.0, 50.0, 200.0, 200.0, 300.0, 300.0, 400.0, 400.0],
            vec![1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6],
        ),
    );
    let hyperparams = Hyperparams {
        seed: 123,
        ..small_hyperparams()
    };

    let pool_a = WorkerPool::new(1);
    let model_a = Model::fit(
        &population,
        &peripherals,
        join_graph(),
        EncodingTable::default(),
        hyperparams.clone(),
        &pool_a,
    )
    .unwrap();

    let pool_b = WorkerPool::new(16);
    let model_b = Model::fit(
        &population,
        &peripherals,
        join_graph(),
        EncodingTable::default(),
        hyperparams,
        &pool_b,
    )
    .unwrap();

    assert_eq!(model_a.to_bytes().unwrap(), model_b.to_bytes().unwrap());
}

/// A canceled pool aborts `fit` with a `Canceled` result rather than
/// returning a partially fitted model.
#[test]
fn fit_respects_cancellation() {
    let population = customers();
    let mut peripherals = HashMap::new();
    peripherals.insert(
        "orders".to_string(),
        orders(
            vec![1.0, 1.0, 2.0, 2.0, 50.0, 50.0, 200.0, 200.0, 300.0, 300.0, 400.0, 400.0],
            vec![1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6],
        ),
    );
    let pool = WorkerPool::new(1);
    pool.cancel();

    let err = Model::fit(
        &population,
        &peripherals,
        join_graph(),
        EncodingTable::default(),
        small_hyperparams(),
        &pool,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        relfeat::FeatureEngineError::Worker(relfeat::worker_pool::WorkerError::Canceled)
    ));
}
