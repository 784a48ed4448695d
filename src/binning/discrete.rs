//! Discrete binner: like [`crate::binning::categorical`] but the split is a
//! consecutive range over the attribute's natural order, not an arbitrary
//! subset.

use std::collections::BTreeMap;

use crate::binning::{split_gain, CandidateSplit, SplitPredicate, WeightedSample};
use crate::value::Num;

/// Finds the best `value <= threshold` split, where `threshold` is always one
/// of the distinct values present (respecting ordering, unlike the
/// categorical binner's arbitrary-prefix search).
#[must_use]
pub fn find_best_split(
    samples: &[WeightedSample<Num>],
    lambda: f64,
    min_num_samples: usize,
) -> Option<CandidateSplit> {
    let non_null: Vec<_> = samples.iter().filter(|s| !s.value.is_nan()).collect();
    if non_null.len() < min_num_samples {
        return None;
    }

    let mut by_value: BTreeMap<u64, (Num, f64, f64)> = BTreeMap::new();
    for s in &non_null {
        let key = s.value.to_bits();
        let entry = by_value.entry(key).or_insert((s.value, 0.0, 0.0));
        entry.1 += s.g;
        entry.2 += s.h;
    }
    if by_value.len() < 2 {
        return None;
    }

    let ordered: Vec<(Num, f64, f64)> = by_value.into_values().collect();
    let total_g: f64 = ordered.iter().map(|(_, g, _)| g).sum();
    let total_h: f64 = ordered.iter().map(|(_, _, h)| h).sum();

    let mut sum_g_left = 0.0;
    let mut sum_h_left = 0.0;
    let mut best: Option<(f64, Num)> = None;

    for (i, (value, g, h)) in ordered.iter().enumerate() {
        sum_g_left += g;
        sum_h_left += h;
        if i + 1 == ordered.len() {
            break;
        }
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
        match best {
            Some((best_reduction, _)) if best_reduction >= reduction => {}
            _ => best = Some((reduction, *value)),
        }
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
