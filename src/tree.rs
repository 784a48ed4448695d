//! Relational decision tree (C8): a node carries a condition over one
//! peripheral attribute (after an aggregation reduces a row's matches to one
//! scalar) and recurses into two children on the matching population rows.
//!
//! Candidate extraction happens once per node via [`build_candidates`]: every
//! numerical/discrete column gets a handful of aggregations (sum, avg, count,
//! min, max, stddev), every categorical column gets its per-row majority
//! category, and every text column gets the union of words its matches
//! carry. The resulting per-row scalars (or, for text, per-row word sets) are
//! what the binners in [`crate::binning`] actually search over — the tree
//! itself never touches a raw `Match` buffer directly.

use std::borrow::Cow;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::aggregation::{self, Aggregation};
use crate::binning::{self, categorical, discrete, numerical, word, CandidateSplit, SplitPredicate};
use crate::column::Column;
use crate::schema::{DataFrame, Role};
use crate::value::{Cat, Num, Word};
use crate::worker_pool::WorkerPool;

/// The value domain a candidate's per-row scalars live in, determining which
/// binner evaluates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Numerical,
    Discrete,
    Categorical,
    Text,
}

#[derive(Debug, Clone)]
enum CandidateValues {
    Num(Vec<Num>),
    Cat(Vec<Cat>),
    Text(Vec<Vec<Word>>),
}

/// One (peripheral attribute, aggregation) pair, pre-extracted to one scalar
/// (or word set) per population row.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The underlying peripheral column, e.g. `"orders.amount"`.
    pub attribute: String,
    pub aggregation: Option<Aggregation>,
    pub kind: CandidateKind,
    values: CandidateValues,
}

impl Candidate {
    /// A unique key combining attribute and aggregation, since one column
    /// contributes several candidates under different aggregations.
    #[must_use]
    pub fn id(&self) -> String {
        match self.aggregation {
            Some(agg) => format!("{}::{agg:?}", self.attribute),
            None => self.attribute.clone(),
        }
    }
}

fn aggregation_rank(aggregation: Option<Aggregation>) -> usize {
    match aggregation {
        None => usize::MAX,
        Some(a) => Aggregation::ALL.iter().position(|x| *x == a).unwrap_or(usize::MAX),
    }
}

/// Builds every candidate for one peripheral table, given each population
/// row's matched peripheral row indices. `aggregations` is the allow-list
/// (`hyperparams.aggregations`) tried against numerical/discrete columns;
/// the per-row match count and the categorical/text structural candidates
/// below are always produced regardless of it. `timestamps`, when present,
/// is the peripheral table's edge time-stamp column (`TimeStampWindow::
/// right_ts`) — aggregations that need timestamp order
/// ([`Aggregation::needs_timestamp_order`]) are skipped entirely for a
/// column with no resolvable timestamp, rather than computed against an
/// arbitrary row order.
#[must_use]
pub fn build_candidates(
    peripheral: &DataFrame,
    matches_per_row: &[Vec<usize>],
    hyperparams: &crate::config::Hyperparams,
    timestamps: Option<&Column>,
) -> Vec<Candidate> {
    let nrows = matches_per_row.len();
    let mut candidates = Vec::new();

    let mut total_count = vec![0.0; nrows];
    for (row, matches) in matches_per_row.iter().enumerate() {
        total_count[row] = matches.len() as Num;
    }
    candidates.push(Candidate {
        attribute: format!("{}.__match_count", peripheral.name()),
        aggregation: Some(Aggregation::Count),
        kind: CandidateKind::Numerical,
        values: CandidateValues::Num(total_count),
    });

    for role in [Role::Numerical, Role::Discrete] {
        for column in peripheral.columns_with_role(role) {
            for &agg in &hyperparams.aggregations {
                let needs_ts = agg.needs_timestamp_order();
                if needs_ts && timestamps.is_none() {
                    continue;
                }
                let values: Vec<Num> = matches_per_row
                    .iter()
                    .map(|matches| {
                        if let (true, Some(ts_col)) = (needs_ts, timestamps) {
                            let mut paired: Vec<(Num, Num)> = matches
                                .iter()
                                .map(|&r| (ts_col.get_num(r), column.get_num(r)))
                                .collect();
                            paired.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
                            let ts: Vec<Num> = paired.iter().map(|p| p.0).collect();
                            let raw: Vec<Num> = paired.iter().map(|p| p.1).collect();
                            aggregation::apply_timed(agg, &raw, &ts)
                        } else {
                            let raw: Vec<Num> = matches.iter().map(|&r| column.get_num(r)).collect();
                            aggregation::apply(agg, &raw)
                        }
                    })
                    .collect();
                candidates.push(Candidate {
                    attribute: format!("{}.{}", peripheral.name(), column.name()),
                    aggregation: Some(agg),
                    kind: if role == Role::Discrete {
                        CandidateKind::Discrete
                    } else {
                        CandidateKind::Numerical
                    },
                    values: CandidateValues::Num(values),
                });
            }
        }
    }

    for column in peripheral.columns_with_role(Role::Categorical) {
        let values: Vec<Cat> = matches_per_row
            .iter()
            .map(|matches| majority_category(matches.iter().map(|&r| column.get_cat(r))))
            .collect();
        candidates.push(Candidate {
            attribute: format!("{}.{}", peripheral.name(), column.name()),
            aggregation: Some(Aggregation::Mode),
            kind: CandidateKind::Categorical,
            values: CandidateValues::Cat(values),
        });
    }

    for column in peripheral.columns_with_role(Role::Text) {
        let values: Vec<Vec<Word>> = matches_per_row
            .iter()
            .map(|matches| {
                let mut words: Vec<Word> = matches
                    .iter()
                    .flat_map(|&r| column.get_words(r).to_vec())
                    .collect();
                words.sort_unstable();
                words.dedup();
                words
            })
            .collect();
        candidates.push(Candidate {
            attribute: format!("{}.{}", peripheral.name(), column.name()),
            aggregation: None,
            kind: CandidateKind::Text,
            values: CandidateValues::Text(values),
        });
    }

    candidates
}

fn majority_category(cats: impl Iterator<Item = Cat>) -> Cat {
    let mut counts: std::collections::HashMap<Cat, usize> = std::collections::HashMap::new();
    for c in cats {
        if c >= 0 {
            *counts.entry(c).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(c, _)| c)
        .unwrap_or(-1)
}

/// A fitted split plus which candidate produced it, used to build
/// [`TreeNode::Split`].
struct BestSplit {
    id: String,
    attribute: String,
    aggregation: Option<Aggregation>,
    split: CandidateSplit,
}

/// `true` if `candidate` (fit to `split`) should replace `current` — higher
/// reduction wins, ties broken by `id` then aggregation rank so the search
/// is deterministic regardless of candidate iteration order (worker-chunked
/// or not).
fn better(split: &CandidateSplit, id: &str, aggregation: Option<Aggregation>, current: &BestSplit) -> bool {
    (split.reduction, id, aggregation_rank(aggregation))
        > (
            current.split.reduction,
            current.id.as_str(),
            aggregation_rank(current.aggregation),
        )
}

fn find_best_candidate(candidates: &[Candidate], rows: &[usize], g: &[f64], h: &[f64], hyperparams: &crate::config::Hyperparams) -> Option<BestSplit> {
    let mut best: Option<BestSplit> = None;
    for candidate in candidates {
        let split = evaluate_candidate(candidate, rows, g, h, hyperparams);
        let Some(split) = split else { continue };
        let id = candidate.id();
        let is_better = match &best {
            None => true,
            Some(current) => better(&split, &id, candidate.aggregation, current),
        };
        if is_better {
            best = Some(BestSplit {
                id,
                attribute: candidate.attribute.clone(),
                aggregation: candidate.aggregation,
                split,
            });
        }
    }
    best
}

/// Parallel split search (C8/C10): partitions `candidates` into
/// `pool.num_threads()` contiguous chunks, evaluates each chunk on its own
/// worker via [`WorkerPool::map`], and merges the per-worker winners with
/// [`better`] — the same deterministic tie-break [`find_best_candidate`]
/// uses, so thread count never changes which candidate wins.
fn find_best_candidate_parallel(
    pool: &WorkerPool,
    candidates: &[Candidate],
    rows: &[usize],
    g: &[f64],
    h: &[f64],
    hyperparams: &crate::config::Hyperparams,
) -> Option<BestSplit> {
    let candidates = Arc::new(candidates.to_vec());
    let rows = Arc::new(rows.to_vec());
    let g = Arc::new(g.to_vec());
    let h = Arc::new(h.to_vec());
    let hyperparams = Arc::new(hyperparams.clone());
    let num_threads = pool.num_threads();
    let chunk = candidates.len().div_ceil(num_threads).max(1);

    let partials = pool.map(move |worker, _comm| {
        let start = (worker * chunk).min(candidates.len());
        let end = ((worker + 1) * chunk).min(candidates.len());
        find_best_candidate(&candidates[start..end], &rows, &g, &h, &hyperparams)
    });

    let mut best: Option<BestSplit> = None;
    for candidate in partials.into_iter().flatten() {
        let is_better = match &best {
            None => true,
            Some(current) => better(&candidate.split, &candidate.id, candidate.aggregation, current),
        };
        if is_better {
            best = Some(candidate);
        }
    }
    best
}

fn evaluate_candidate(
    candidate: &Candidate,
    rows: &[usize],
    g: &[f64],
    h: &[f64],
    hyperparams: &crate::config::Hyperparams,
) -> Option<CandidateSplit> {
    let lambda = hyperparams.lambda;
    let min_samples = hyperparams.min_num_samples;
    match (&candidate.values, candidate.kind) {
        (CandidateValues::Num(values), CandidateKind::Numerical) => {
            let samples: Vec<binning::WeightedSample<Num>> = rows
                .iter()
                .map(|&r| binning::WeightedSample { value: values[r], g: g[r], h: h[r] })
                .collect();
            numerical::find_best_split(&samples, hyperparams.num_bins, lambda, min_samples)
        }
        (CandidateValues::Num(values), CandidateKind::Discrete) => {
            let samples: Vec<binning::WeightedSample<Num>> = rows
                .iter()
                .map(|&r| binning::WeightedSample { value: values[r], g: g[r], h: h[r] })
                .collect();
            discrete::find_best_split(&samples, lambda, min_samples)
        }
        (CandidateValues::Cat(values), CandidateKind::Categorical) => {
            let samples: Vec<binning::WeightedSample<Cat>> = rows
                .iter()
                .map(|&r| binning::WeightedSample { value: values[r], g: g[r], h: h[r] })
                .collect();
            categorical::find_best_split(&samples, lambda, min_samples)
        }
        (CandidateValues::Text(values), CandidateKind::Text) => {
            let samples: Vec<word::WordSample<'_>> = rows
                .iter()
                .map(|&r| word::WordSample { words: &values[r], g: g[r], h: h[r] })
                .collect();
            word::find_best_split(&samples, lambda, min_samples)
        }
        _ => None,
    }
}

fn candidate_value_num(candidate: &Candidate, row: usize) -> Option<Num> {
    match &candidate.values {
        CandidateValues::Num(v) => Some(v[row]),
        _ => None,
    }
}

fn candidate_value_cat(candidate: &Candidate, row: usize) -> Option<Cat> {
    match &candidate.values {
        CandidateValues::Cat(v) => Some(v[row]),
        _ => None,
    }
}

fn goes_left(candidate: &Candidate, predicate: &SplitPredicate, row: usize) -> bool {
    match predicate {
        SplitPredicate::Threshold(t) => candidate_value_num(candidate, row).is_some_and(|v| v <= *t),
        SplitPredicate::CategorySet(set) => {
            candidate_value_cat(candidate, row).is_some_and(|v| set.contains(&v))
        }
        SplitPredicate::ContainsWord(w) => match &candidate.values {
            CandidateValues::Text(values) => values[row].contains(w),
            _ => false,
        },
    }
}

/// One node of a fitted relational decision tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf { weight: f64 },
    Split {
        /// Unique `(attribute, aggregation)` key identifying which candidate
        /// this split was fit against (see [`Candidate::id`]).
        id: String,
        attribute: String,
        aggregation: Option<Aggregation>,
        predicate: SplitPredicate,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        default_weight: f64,
    },
}

impl TreeNode {
    /// Evaluates this node's output for one population row given the same
    /// candidate set used to fit it.
    #[must_use]
    pub fn evaluate(&self, candidates: &[Candidate], row: usize) -> f64 {
        match self {
            TreeNode::Leaf { weight } => *weight,
            TreeNode::Split {
                id,
                predicate,
                left,
                right,
                default_weight,
                ..
            } => {
                let Some(candidate) = candidates.iter().find(|c| &c.id() == id) else {
                    return *default_weight;
                };
                if goes_left(candidate, predicate, row) {
                    left.evaluate(candidates, row)
                } else {
                    right.evaluate(candidates, row)
                }
            }
        }
    }
}

/// Bounds the candidate set searched at one node to
/// `hyperparams.num_features_per_node`, sampling with `rng` when the full
/// set exceeds it. Returns the full set unmodified (no clone) when it
/// already fits.
fn select_search_set<'a, R: Rng>(
    candidates: &'a [Candidate],
    hyperparams: &crate::config::Hyperparams,
    rng: &mut R,
) -> Cow<'a, [Candidate]> {
    let cap = hyperparams.num_features_per_node;
    if cap == 0 || candidates.len() <= cap {
        return Cow::Borrowed(candidates);
    }
    let chosen = rand::seq::index::sample(rng, candidates.len(), cap);
    Cow::Owned(chosen.iter().map(|i| candidates[i].clone()).collect())
}

/// Fits one relational decision tree node (and, recursively, its subtree)
/// over `rows` using `candidates`, the boosting gradients `g`/curvatures `h`,
/// and `hyperparams`. `pool`, when given, runs the split search for this
/// node across its workers (C8/C10); `rng` bounds the searched candidate set
/// to `hyperparams.num_features_per_node`, the same way on every call so
/// fitting twice with the same seed reproduces the same tree.
pub fn fit_node<R: Rng>(
    candidates: &[Candidate],
    rows: &[usize],
    g: &[f64],
    h: &[f64],
    hyperparams: &crate::config::Hyperparams,
    depth: usize,
    pool: Option<&WorkerPool>,
    rng: &mut R,
) -> TreeNode {
    let sum_g: f64 = rows.iter().map(|&r| g[r]).sum();
    let sum_h: f64 = rows.iter().map(|&r| h[r]).sum();
    let leaf_weight = binning::optimal_weight(sum_g, sum_h, hyperparams.lambda);

    if depth >= hyperparams.max_depth || rows.len() < 2 * hyperparams.min_num_samples {
        return TreeNode::Leaf { weight: leaf_weight };
    }

    let search_set = select_search_set(candidates, hyperparams, rng);
    let best = match pool {
        Some(pool) => find_best_candidate_parallel(pool, &search_set, rows, g, h, hyperparams),
        None => find_best_candidate(&search_set, rows, g, h, hyperparams),
    };
    let Some(best) = best else {
        return TreeNode::Leaf { weight: leaf_weight };
    };
    if best.split.reduction < hyperparams.min_reduction {
        return TreeNode::Leaf { weight: leaf_weight };
    }

    let candidate = candidates.iter().find(|c| c.id() == best.id).unwrap();
    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
        .iter()
        .partition(|&&r| goes_left(candidate, &best.split.predicate, r));

    if left_rows.len() < hyperparams.min_num_samples || right_rows.len() < hyperparams.min_num_samples {
        return TreeNode::Leaf { weight: leaf_weight };
    }

    let left = fit_node(candidates, &left_rows, g, h, hyperparams, depth + 1, pool, rng);
    let right = fit_node(candidates, &right_rows, g, h, hyperparams, depth + 1, pool, rng);

    TreeNode::Split {
        id: best.id,
        attribute: best.attribute,
        aggregation: best.aggregation,
        predicate: best.split.predicate,
        left: Box::new(left),
        right: Box::new(right),
        default_weight: best.split.default_weight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::schema::Schema;
    use rand::SeedableRng;

    fn orders() -> DataFrame {
        DataFrame::new(
            "orders",
            vec![Column::from_floats("amount", "usd", vec![10.0, 20.0, 5.0, 500.0, 600.0])],
            Schema::new().with_role("amount", Role::Numerical),
        )
        .unwrap()
    }

    #[test]
    fn build_candidates_includes_match_count_and_numeric_aggs() {
        let df = orders();
        let matches = vec![vec![0, 1], vec![2], vec![3, 4]];
        let hyperparams = crate::config::Hyperparams::default();
        let candidates = build_candidates(&df, &matches, &hyperparams, None);
        assert!(candidates.iter().any(|c| c.attribute.ends_with("__match_count")));
        assert!(candidates.iter().any(|c| c.attribute == "orders.amount" && c.aggregation == Some(Aggregation::Sum)));
    }

    #[test]
    fn build_candidates_skips_timestamp_aggregations_without_a_timestamp_column() {
        let df = orders();
        let matches = vec![vec![0, 1], vec![2], vec![3, 4]];
        let hyperparams = crate::config::Hyperparams {
            aggregations: vec![Aggregation::Sum, Aggregation::Ewma1h],
            ..Default::default()
        };
        let candidates = build_candidates(&df, &matches, &hyperparams, None);
        assert!(candidates.iter().any(|c| c.aggregation == Some(Aggregation::Sum)));
        assert!(!candidates.iter().any(|c| c.aggregation == Some(Aggregation::Ewma1h)));
    }

    #[test]
    fn fit_node_splits_on_separable_gradients() {
        let df = orders();
        // rows 0,1 have small amounts and negative gradient; rows 2 has large
        // amount and positive gradient.
        let matches = vec![vec![0], vec![1], vec![3]];
        let hyperparams_for_candidates = crate::config::Hyperparams::default();
        let candidates = build_candidates(&df, &matches, &hyperparams_for_candidates, None);
        let g = vec![-1.0, -1.0, 1.0];
        let h = vec![1.0, 1.0, 1.0];
        let hyperparams = crate::config::Hyperparams {
            max_depth: 2,
            min_num_samples: 1,
            min_reduction: 0.0,
            ..Default::default()
        };
        let rows = vec![0, 1, 2];
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        let node = fit_node(&candidates, &rows, &g, &h, &hyperparams, 0, None, &mut rng);
        assert!(matches!(node, TreeNode::Split { .. }));
    }

    #[test]
    fn fit_node_returns_leaf_when_too_few_rows() {
        let df = orders();
        let matches = vec![vec![0]];
        let hyperparams_for_candidates = crate::config::Hyperparams::default();
        let candidates = build_candidates(&df, &matches, &hyperparams_for_candidates, None);
        let hyperparams = crate::config::Hyperparams {
            min_num_samples: 5,
            ..Default::default()
        };
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        let node = fit_node(&candidates, &[0], &[1.0], &[1.0], &hyperparams, 0, None, &mut rng);
        assert!(matches!(node, TreeNode::Leaf { .. }));
    }

    #[test]
    fn fit_node_is_deterministic_given_the_same_seed() {
        let df = orders();
        let matches = vec![vec![0], vec![1], vec![3]];
        let hyperparams_for_candidates = crate::config::Hyperparams::default();
        let candidates = build_candidates(&df, &matches, &hyperparams_for_candidates, None);
        let g = vec![-1.0, -1.0, 1.0];
        let h = vec![1.0, 1.0, 1.0];
        let hyperparams = crate::config::Hyperparams {
            max_depth: 2,
            min_num_samples: 1,
            min_reduction: 0.0,
            num_features_per_node: 1,
            ..Default::default()
        };
        let rows = vec![0, 1, 2];
        let mut rng_a = rand::rngs::StdRng::seed_from_u64(42);
        let node_a = fit_node(&candidates, &rows, &g, &h, &hyperparams, 0, None, &mut rng_a);
        let mut rng_b = rand::rngs::StdRng::seed_from_u64(42);
        let node_b = fit_node(&candidates, &rows, &g, &h, &hyperparams, 0, None, &mut rng_b);
        assert_eq!(format!("{node_a:?}"), format!("{node_b:?}"));
    }
}
