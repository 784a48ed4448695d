//! Gradient-boosting driver (C9): fits a sequence of relational decision
//! trees against the residuals of a loss function, one peripheral-joined
//! attribute set at a time.
//!
//! Each round is logged through a `tracing::info_span!`, matching the
//! teacher's habit of wrapping one unit of long-running work per span rather
//! than logging loose lines.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Hyperparams;
use crate::loss::LossFunction;
use crate::tree::{self, Candidate, TreeNode};
use crate::value::Num;
use crate::worker_pool::{WorkerError, WorkerPool};

/// Sampling keeps the sampled population bounded near this many rows times
/// `sampling_factor`, independent of the true population size.
const SAMPLE_TARGET_ROWS: usize = 20_000;

/// One fitted tree plus the shrunk update rate it contributes to the running
/// prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostedTree {
    pub root: TreeNode,
    pub update_rate: f64,
}

/// The output of [`fit`]: a base prediction plus an ordered list of trees.
/// Each tree's evaluation (before multiplying by `update_rate`) is the
/// column exported to downstream predictors (C11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ensemble {
    pub base_weight: f64,
    pub trees: Vec<BoostedTree>,
}

impl Ensemble {
    /// Running prediction for `row` after every fitted tree's shrunk
    /// contribution, using the same `candidates` set every tree was fit
    /// against.
    #[must_use]
    pub fn predict_row(&self, candidates: &[Candidate], row: usize) -> f64 {
        let mut yhat = self.base_weight;
        for tree in &self.trees {
            yhat += tree.update_rate * tree.root.evaluate(candidates, row);
        }
        yhat
    }

    #[must_use]
    pub fn predict(&self, candidates: &[Candidate], nrows: usize) -> Vec<Num> {
        (0..nrows).map(|r| self.predict_row(candidates, r)).collect()
    }
}

/// Draws per-round sample weights. `sampling_factor >= 1.0` disables
/// subsampling (every row gets weight 1); otherwise each row independently
/// survives with probability `rate`, where `rate` is chosen so the expected
/// sampled count is bounded near `SAMPLE_TARGET_ROWS * sampling_factor`.
fn sample_weights(nrows: usize, sampling_factor: f64, rng: &mut impl Rng) -> Vec<Num> {
    if sampling_factor >= 1.0 || nrows == 0 {
        return vec![1.0; nrows];
    }
    let target = (SAMPLE_TARGET_ROWS as f64 * sampling_factor).max(1.0);
    let rate = (target / nrows as f64).min(1.0);
    (0..nrows)
        .map(|_| if rng.gen::<f64>() < rate { 1.0 } else { 0.0 })
        .collect()
}

fn weighted_rows(weights: &[Num]) -> Vec<usize> {
    weights
        .iter()
        .enumerate()
        .filter(|(_, &w)| w != 0.0)
        .map(|(i, _)| i)
        .collect()
}

/// Fits one boosting ensemble over `candidates` (the union of every attached
/// peripheral's extracted attributes, already aligned to population rows) and
/// targets `y`.
///
/// `loss` is resolved by the caller via [`crate::loss::by_name`] from
/// `hyperparams.loss`. `pool` runs each round's split search across its
/// workers and doubles as the cancellation handle: a caller that invokes
/// `pool.cancel()` from another thread causes the next round boundary to
/// return `Err(WorkerError::Canceled)` with the partial ensemble discarded,
/// rather than a partially built one silently returned.
pub fn fit(
    candidates: &[Candidate],
    y: &[Num],
    loss: &dyn LossFunction,
    hyperparams: &Hyperparams,
    pool: &WorkerPool,
    rng: &mut impl Rng,
) -> Result<Ensemble, WorkerError> {
    let nrows = y.len();
    let base_weight = if nrows == 0 {
        0.0
    } else {
        y.iter().sum::<Num>() / nrows as Num
    };
    let mut yhat = vec![base_weight; nrows];
    let mut trees = Vec::with_capacity(hyperparams.num_subfeatures);

    for round in 0..hyperparams.num_subfeatures {
        if pool.is_canceled() {
            return Err(WorkerError::Canceled);
        }

        let span = tracing::info_span!("boosting_round", round);
        let _enter = span.enter();

        let weights = sample_weights(nrows, hyperparams.sampling_factor, rng);
        let rows = weighted_rows(&weights);
        if rows.is_empty() {
            info!("round produced an empty sample, stopping early");
            break;
        }

        let g = loss.gradients(&yhat, y);
        let h = loss.curvatures(&yhat, y);

        let root = tree::fit_node(candidates, &rows, &g, &h, hyperparams, 0, Some(pool), rng);
        let delta: Vec<Num> = (0..nrows).map(|r| root.evaluate(candidates, r)).collect();

        let eta = loss.line_search(&yhat, y, &delta);
        let update_rate = hyperparams.shrinkage * eta;
        for r in 0..nrows {
            yhat[r] += update_rate * delta[r];
        }

        info!(update_rate, "fitted tree for round");
        trees.push(BoostedTree { root, update_rate });
    }

    Ok(Ensemble { base_weight, trees })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::loss::SquareLoss;
    use crate::schema::{DataFrame, Role, Schema};
    use rand::SeedableRng;

    fn orders() -> DataFrame {
        DataFrame::new(
            "orders",
            vec![Column::from_floats(
                "amount",
                "usd",
                vec![1.0, 1.0, 1.0, 100.0, 100.0, 100.0],
            )],
            Schema::new().with_role("amount", Role::Numerical),
        )
        .unwrap()
    }

    #[test]
    fn fit_reduces_training_loss_each_round() {
        let df = orders();
        // One match per population row, one-to-one with orders rows.
        let matches: Vec<Vec<usize>> = (0..6).map(|i| vec![i]).collect();
        let hyperparams_for_candidates = Hyperparams::default();
        let candidates = tree::build_candidates(&df, &matches, &hyperparams_for_candidates, None);
        let y: Vec<Num> = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let loss = SquareLoss;
        let hyperparams = Hyperparams {
            num_subfeatures: 5,
            max_depth: 2,
            min_num_samples: 1,
            min_reduction: 0.0,
            sampling_factor: 1.0,
            ..Default::default()
        };
        let pool = WorkerPool::new(1);
        let mut rng = rand::rngs::StdRng::seed_from_u64(hyperparams.seed);
        let ensemble = fit(&candidates, &y, &loss, &hyperparams, &pool, &mut rng).unwrap();
        assert!(!ensemble.trees.is_empty());

        let initial_loss: f64 = y.iter().map(|t| (ensemble.base_weight - t).powi(2)).sum();
        let final_preds = ensemble.predict(&candidates, y.len());
        let final_loss: f64 = final_preds
            .iter()
            .zip(&y)
            .map(|(p, t)| (p - t).powi(2))
            .sum();
        assert!(final_loss < initial_loss);
    }

    #[test]
    fn sample_weights_disabled_keeps_every_row() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        let w = sample_weights(10, 1.0, &mut rng);
        assert!(w.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn empty_target_yields_zero_base_weight() {
        let loss = SquareLoss;
        let hyperparams = Hyperparams {
            num_subfeatures: 1,
            ..Default::default()
        };
        let pool = WorkerPool::new(1);
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        let ensemble = fit(&[], &[], &loss, &hyperparams, &pool, &mut rng).unwrap();
        assert_eq!(ensemble.base_weight, 0.0);
        assert!(ensemble.trees.is_empty());
    }

    #[test]
    fn fit_twice_with_same_seed_is_bit_identical() {
        let df = orders();
        let matches: Vec<Vec<usize>> = (0..6).map(|i| vec![i]).collect();
        let hyperparams_for_candidates = Hyperparams::default();
        let candidates = tree::build_candidates(&df, &matches, &hyperparams_for_candidates, None);
        let y: Vec<Num> = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let loss = SquareLoss;
        let hyperparams = Hyperparams {
            num_subfeatures: 3,
            max_depth: 2,
            min_num_samples: 1,
            min_reduction: 0.0,
            sampling_factor: 1.0,
            seed: 7,
            ..Default::default()
        };
        let pool_a = WorkerPool::new(1);
        let mut rng_a = rand::rngs::StdRng::seed_from_u64(hyperparams.seed);
        let ensemble_a = fit(&candidates, &y, &loss, &hyperparams, &pool_a, &mut rng_a).unwrap();

        let pool_b = WorkerPool::new(4);
        let mut rng_b = rand::rngs::StdRng::seed_from_u64(hyperparams.seed);
        let ensemble_b = fit(&candidates, &y, &loss, &hyperparams, &pool_b, &mut rng_b).unwrap();

        assert_eq!(
            bincode::serialize(&ensemble_a).unwrap(),
            bincode::serialize(&ensemble_b).unwrap()
        );
    }
}
