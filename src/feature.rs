//! Feature container & transform (C11): turns a fitted [`Ensemble`] into a
//! dense matrix with one column per tree.
//!
//! Per-tree outputs are kept separate rather than summed, since a tree's raw
//! (condition-chain, aggregation) evaluation — not its shrunk contribution to
//! the running prediction — is the feature downstream tabular predictors
//! consume.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ensemble::Ensemble;
use crate::tree::Candidate;
use crate::value::Num;
use crate::worker_pool::WorkerPool;

/// A dense, row-major matrix: one row per population row, one column per
/// fitted tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureMatrix {
    nrows: usize,
    ncols: usize,
    values: Vec<Num>,
}

impl FeatureMatrix {
    #[must_use]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    #[must_use]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Num {
        self.values[row * self.ncols + col]
    }

    #[must_use]
    pub fn row(&self, row: usize) -> &[Num] {
        &self.values[row * self.ncols..(row + 1) * self.ncols]
    }
}

/// Evaluates every tree in `ensemble` over `candidates` (already aligned to
/// population rows), producing [`FeatureMatrix`] with `ensemble.trees.len()`
/// columns.
#[must_use]
pub fn transform(ensemble: &Ensemble, candidates: &[Candidate], nrows: usize) -> FeatureMatrix {
    let ncols = ensemble.trees.len();
    let mut values = vec![0.0; nrows * ncols];
    for (col, tree) in ensemble.trees.iter().enumerate() {
        for row in 0..nrows {
            values[row * ncols + col] = tree.root.evaluate(candidates, row);
        }
    }
    FeatureMatrix { nrows, ncols, values }
}

/// Parallel transform (C10/C11): splits `0..nrows` into `pool.num_threads()`
/// contiguous row ranges, evaluates every tree over each range on its own
/// worker, and stitches the per-worker row slabs back together in order.
/// Produces the exact same matrix as [`transform`] — row ranges don't
/// overlap and every tree's evaluation is a pure function of its row — just
/// computed across workers instead of on the calling thread.
#[must_use]
pub fn transform_parallel(
    pool: &WorkerPool,
    ensemble: &Ensemble,
    candidates: &[Candidate],
    nrows: usize,
) -> FeatureMatrix {
    let ncols = ensemble.trees.len();
    if nrows == 0 || ncols == 0 {
        return FeatureMatrix { nrows, ncols, values: Vec::new() };
    }

    let ensemble = Arc::new(ensemble.clone());
    let candidates = Arc::new(candidates.to_vec());
    let num_threads = pool.num_threads();
    let chunk = nrows.div_ceil(num_threads).max(1);

    let slabs = pool.map(move |worker, _comm| {
        let start = (worker * chunk).min(nrows);
        let end = ((worker + 1) * chunk).min(nrows);
        let mut slab = vec![0.0; (end - start) * ncols];
        for (col, tree) in ensemble.trees.iter().enumerate() {
            for row in start..end {
                slab[(row - start) * ncols + col] = tree.root.evaluate(&candidates, row);
            }
        }
        (start, slab)
    });

    let mut values = vec![0.0; nrows * ncols];
    for (start, slab) in slabs {
        values[start * ncols..start * ncols + slab.len()].copy_from_slice(&slab);
    }
    FeatureMatrix { nrows, ncols, values }
}
