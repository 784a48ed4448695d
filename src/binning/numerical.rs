//! Numerical binner: quantile-bucketed threshold search over a real-valued
//! attribute.

use crate::binning::{split_gain, CandidateSplit, MinMaxFinder, SplitPredicate, WeightedSample};
use crate::value::Num;

/// Default bucket count for sorted-sample quantile binning.
pub const DEFAULT_NUM_BINS: usize = 256;

/// Finds the best `value <= threshold` split over `samples`.
///
/// Bins by value into up to `num_bins` equal-count buckets (quantile
/// binning), then scans bin boundaries left to right accumulating
/// `(Σg, Σh)` to evaluate the split-gain formula at each boundary. Returns
/// `None` if fewer than `min_num_samples` non-null samples are present.
#[must_use]
pub fn find_best_split(
    samples: &[WeightedSample<Num>],
    num_bins: usize,
    lambda: f64,
    min_num_samples: usize,
) -> Option<CandidateSplit> {
    let mut non_null: Vec<&WeightedSample<Num>> =
        samples.iter().filter(|s| !s.value.is_nan()).collect();
    if non_null.len() < min_num_samples {
        return None;
    }
    let mmf = MinMaxFinder::scan(non_null.iter().map(|s| s.value));
    if mmf.count_non_null < min_num_samples || mmf.min == mmf.max {
        return None;
    }
    non_null.sort_by(|a, b| a.value.partial_cmp(&b.value).unwrap());

    let total_g: f64 = non_null.iter().map(|s| s.g).sum();
    let total_h: f64 = non_null.iter().map(|s| s.h).sum();

    let bin_size = non_null.len().div_ceil(num_bins.max(1)).max(1);
    let mut sum_g_left = 0.0;
    let mut sum_h_left = 0.0;
    let mut best: Option<(f64, Num)> = None;

    let mut i = 0;
    while i + bin_size < non_null.len() {
        let end = (i + bin_size).min(non_null.len());
        for s in &non_null[i..end] {
            sum_g_left += s.g;
            sum_h_left += s.h;
        }
        let threshold = non_null[end - 1].value;
        let sum_g_right = total_g - sum_g_left;
        let sum_h_right = total_h - sum_h_left;
        let reduction = split_gain(
            sum_g_left,
            sum_h_left,
            sum_g_right,
            sum_h_right,
            total_g,
            total_h,
            lambda,
        );
        match &best {
            Some((best_reduction, best_threshold))
                if *best_reduction > reduction
                    || (*best_reduction == reduction && *best_threshold <= threshold) => {}
            _ => best = Some((reduction, threshold)),
        }
        i = end;
    }

    let (reduction, threshold) = best?;
    let left: Vec<_> = non_null.iter().filter(|s| s.value <= threshold).collect();
    let right: Vec<_> = non_null.iter().filter(|s| s.value > threshold).collect();
    let left_g: f64 = left.iter().map(|s| s.g).sum();
    let left_h: f64 = left.iter().map(|s| s.h).sum();
    let right_g: f64 = right.iter().map(|s| s.g).sum();
    let right_h: f64 = right.iter().map(|s| s.h).sum();

    Some(CandidateSplit {
        predicate: SplitPredicate::Threshold(threshold),
        reduction,
        left_weight: crate::binning::optimal_weight(left_g, left_h, lambda),
        right_weight: crate::binning::optimal_weight(right_g, right_h, lambda),
        default_weight: crate::binning::optimal_weight(total_g, total_h, lambda),
    })
}
