//! Categorical binner: best "category ∈ left-set" split over an encoded
//! attribute, found by sorting categories by their gradient ratio and trying
//! every prefix.

use std::collections::HashMap;

use crate::binning::{split_gain, CandidateSplit, SplitPredicate, WeightedSample};
use crate::value::Cat;

/// Finds the best left/right category partition.
///
/// Enumerates distinct categories present in `samples`, accumulates
/// per-category `(Σg, Σh)`, sorts by `Σg/(Σh+λ)` ascending (most-negative
/// gradient first), and evaluates every prefix of that ordering as the
/// "left" set. Returns `None` if fewer than `min_num_samples` non-null
/// samples are present.
#[must_use]
pub fn find_best_split(
    samples: &[WeightedSample<Cat>],
    lambda: f64,
    min_num_samples: usize,
) -> Option<CandidateSplit> {
    let non_null: Vec<_> = samples.iter().filter(|s| s.value >= 0).collect();
    if non_null.len() < min_num_samples {
        return None;
    }

    let mut by_category: HashMap<Cat, (f64, f64)> = HashMap::new();
    for s in &non_null {
        let entry = by_category.entry(s.value).or_insert((0.0, 0.0));
        entry.0 += s.g;
        entry.1 += s.h;
    }
    if by_category.len() < 2 {
        return None;
    }

    let mut ordered: Vec<(Cat, f64, f64)> = by_category
        .into_iter()
        .map(|(cat, (g, h))| (cat, g, h))
        .collect();
    ordered.sort_by(|a, b| {
        let ratio_a = a.1 / (a.2 + lambda).max(1e-12);
        let ratio_b = b.1 / (b.2 + lambda).max(1e-12);
        ratio_a
            .partial_cmp(&ratio_b)
            .unwrap()
            .then_with(|| a.0.cmp(&b.0))
    });

    let total_g: f64 = ordered.iter().map(|(_, g, _)| g).sum();
    let total_h: f64 = ordered.iter().map(|(_, _, h)| h).sum();

    let mut sum_g_left = 0.0;
    let mut sum_h_left = 0.0;
    let mut best: Option<(f64, usize)> = None; // (reduction, prefix_len)

    for (i, (_, g, h)) in ordered.iter().enumerate() {
        sum_g_left += g;
        sum_h_left += h;
        if i + 1 == ordered.len() {
            break; // full set as "left" is not a split
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
            _ => best = Some((reduction, i + 1)),
        }
    }

    let (reduction, prefix_len) = best?;
    let left_set: Vec<Cat> = ordered[..prefix_len].iter().map(|(c, _, _)| *c).collect();
    let left_g: f64 = ordered[..prefix_len].iter().map(|(_, g, _)| g).sum();
    let left_h: f64 = ordered[..prefix_len].iter().map(|(_, _, h)| h).sum();
    let right_g = total_g - left_g;
    let right_h = total_h - left_h;

    Some(CandidateSplit {
        predicate: SplitPredicate::CategorySet(left_set),
        reduction,
        left_weight: crate::binning::optimal_weight(left_g, left_h, lambda),
        right_weight: crate::binning::optimal_weight(right_g, right_h, lambda),
        default_weight: crate::binning::optimal_weight(total_g, total_h, lambda),
    })
}
