//! Aggregation family (C6): pure functions mapping a group of matched rows to
//! one scalar.
//!
//! Every variant declares its required value type and whether it needs the
//! group sorted by timestamp before it can be computed (quantiles, EWMA,
//! trend, time-since-*). [`RevertMode`] is carried purely as a cache-
//! invalidation hint for the categorical/discrete binners' incremental
//! accumulation — never a semantic input to the aggregation itself; the naive
//! recompute-from-scratch path in this module is the reference the
//! incremental path must agree with bit-for-bit.

use serde::{Deserialize, Serialize};

use crate::value::Num;

/// The recognized aggregation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum Aggregation {
    Avg,
    AvgTimeBetween,
    Count,
    CountAboveMean,
    CountBelowMean,
    CountDistinct,
    CountDistinctOverCount,
    CountMinusCountDistinct,
    Ewma1s,
    Ewma1m,
    Ewma1h,
    Ewma1d,
    Ewma7d,
    Ewma30d,
    Ewma90d,
    Ewma365d,
    EwmaTrend1s,
    EwmaTrend1m,
    EwmaTrend1h,
    EwmaTrend1d,
    EwmaTrend7d,
    EwmaTrend30d,
    EwmaTrend90d,
    EwmaTrend365d,
    First,
    Last,
    Kurtosis,
    Max,
    Median,
    Min,
    Mode,
    NumMax,
    NumMin,
    Q1,
    Q5,
    Q10,
    Q25,
    Q75,
    Q90,
    Q95,
    Q99,
    Skew,
    Stddev,
    Sum,
    TimeSinceFirstMaximum,
    TimeSinceFirstMinimum,
    TimeSinceLastMaximum,
    TimeSinceLastMinimum,
    Trend,
    Var,
    VariationCoefficient,
}

impl Aggregation {
    /// All recognized aggregation kinds, for allow-list validation and
    /// hyperparameter parsing.
    pub const ALL: &'static [Aggregation] = &[
        Aggregation::Avg,
        Aggregation::AvgTimeBetween,
        Aggregation::Count,
        Aggregation::CountAboveMean,
        Aggregation::CountBelowMean,
        Aggregation::CountDistinct,
        Aggregation::CountDistinctOverCount,
        Aggregation::CountMinusCountDistinct,
        Aggregation::Ewma1s,
        Aggregation::Ewma1m,
        Aggregation::Ewma1h,
        Aggregation::Ewma1d,
        Aggregation::Ewma7d,
        Aggregation::Ewma30d,
        Aggregation::Ewma90d,
        Aggregation::Ewma365d,
        Aggregation::EwmaTrend1s,
        Aggregation::EwmaTrend1m,
        Aggregation::EwmaTrend1h,
        Aggregation::EwmaTrend1d,
        Aggregation::EwmaTrend7d,
        Aggregation::EwmaTrend30d,
        Aggregation::EwmaTrend90d,
        Aggregation::EwmaTrend365d,
        Aggregation::First,
        Aggregation::Last,
        Aggregation::Kurtosis,
        Aggregation::Max,
        Aggregation::Median,
        Aggregation::Min,
        Aggregation::Mode,
        Aggregation::NumMax,
        Aggregation::NumMin,
        Aggregation::Q1,
        Aggregation::Q5,
        Aggregation::Q10,
        Aggregation::Q25,
        Aggregation::Q75,
        Aggregation::Q90,
        Aggregation::Q95,
        Aggregation::Q99,
        Aggregation::Skew,
        Aggregation::Stddev,
        Aggregation::Sum,
        Aggregation::TimeSinceFirstMaximum,
        Aggregation::TimeSinceFirstMinimum,
        Aggregation::TimeSinceLastMaximum,
        Aggregation::TimeSinceLastMinimum,
        Aggregation::Trend,
        Aggregation::Var,
        Aggregation::VariationCoefficient,
    ];

    /// `true` for aggregations whose result only depends on the count of
    /// matches, so the configured empty-group default is `0.0` rather than
    /// `NaN`.
    #[must_use]
    pub fn is_count_family(self) -> bool {
        matches!(
            self,
            Aggregation::Count
                | Aggregation::CountAboveMean
                | Aggregation::CountBelowMean
                | Aggregation::CountDistinct
                | Aggregation::CountDistinctOverCount
                | Aggregation::CountMinusCountDistinct
        )
    }

    /// `true` if computing this aggregation requires the group pre-sorted by
    /// timestamp (quantiles, EWMA, trend, time-since-*).
    #[must_use]
    pub fn needs_timestamp_order(self) -> bool {
        matches!(
            self,
            Aggregation::AvgTimeBetween
                | Aggregation::Ewma1s
                | Aggregation::Ewma1m
                | Aggregation::Ewma1h
                | Aggregation::Ewma1d
                | Aggregation::Ewma7d
                | Aggregation::Ewma30d
                | Aggregation::Ewma90d
                | Aggregation::Ewma365d
                | Aggregation::EwmaTrend1s
                | Aggregation::EwmaTrend1m
                | Aggregation::EwmaTrend1h
                | Aggregation::EwmaTrend1d
                | Aggregation::EwmaTrend7d
                | Aggregation::EwmaTrend30d
                | Aggregation::EwmaTrend90d
                | Aggregation::EwmaTrend365d
                | Aggregation::First
                | Aggregation::Last
                | Aggregation::Q1
                | Aggregation::Q5
                | Aggregation::Q10
                | Aggregation::Q25
                | Aggregation::Q75
                | Aggregation::Q90
                | Aggregation::Q95
                | Aggregation::Q99
                | Aggregation::TimeSinceFirstMaximum
                | Aggregation::TimeSinceFirstMinimum
                | Aggregation::TimeSinceLastMaximum
                | Aggregation::TimeSinceLastMinimum
                | Aggregation::Trend
        )
    }

    /// The scalar returned for a population row with no matches.
    #[must_use]
    pub fn empty_value(self) -> Num {
        if self.is_count_family() {
            0.0
        } else {
            f64::NAN
        }
    }
}

/// Incremental-update cache-invalidation hint for the categorical/discrete
/// binners. Purely an optimization: the naive `not_at_all` recompute path
/// and the incremental paths must agree bit-for-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RevertMode {
    #[default]
    NotAtAll,
    AfterEachCategory,
    AfterAllCategories,
}

/// Computes `aggregation` over `values` (already extracted and, if the
/// aggregation needs it, pre-sorted by timestamp by the caller). This is the
/// naive, always-correct reference path (§8, "revert-mode equivalence").
#[must_use]
pub fn apply(aggregation: Aggregation, values: &[Num]) -> Num {
    let non_null: Vec<Num> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if non_null.is_empty() {
        return aggregation.empty_value();
    }
    match aggregation {
        Aggregation::Count => values.len() as Num,
        Aggregation::Sum => non_null.iter().sum(),
        Aggregation::Avg => non_null.iter().sum::<Num>() / non_null.len() as Num,
        Aggregation::Min | Aggregation::NumMin => {
            non_null.iter().cloned().fold(f64::INFINITY, f64::min)
        }
        Aggregation::Max | Aggregation::NumMax => {
            non_null.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
        }
        Aggregation::First => non_null[0],
        Aggregation::Last => *non_null.last().unwrap(),
        Aggregation::Median => quantile(&non_null, 0.5),
        Aggregation::Q1 => quantile(&non_null, 0.01),
        Aggregation::Q5 => quantile(&non_null, 0.05),
        Aggregation::Q10 => quantile(&non_null, 0.10),
        Aggregation::Q25 => quantile(&non_null, 0.25),
        Aggregation::Q75 => quantile(&non_null, 0.75),
        Aggregation::Q90 => quantile(&non_null, 0.90),
        Aggregation::Q95 => quantile(&non_null, 0.95),
        Aggregation::Q99 => quantile(&non_null, 0.99),
        Aggregation::Stddev => variance(&non_null).sqrt(),
        Aggregation::Var => variance(&non_null),
        Aggregation::VariationCoefficient => {
            let mean = non_null.iter().sum::<Num>() / non_null.len() as Num;
            if mean == 0.0 {
                f64::NAN
            } else {
                variance(&non_null).sqrt() / mean
            }
        }
        Aggregation::CountAboveMean => {
            let mean = non_null.iter().sum::<Num>() / non_null.len() as Num;
            non_null.iter().filter(|&&v| v > mean).count() as Num
        }
        Aggregation::CountBelowMean => {
            let mean = non_null.iter().sum::<Num>() / non_null.len() as Num;
            non_null.iter().filter(|&&v| v < mean).count() as Num
        }
        Aggregation::CountDistinct => count_distinct(&non_null),
        Aggregation::CountDistinctOverCount => count_distinct(&non_null) / non_null.len() as Num,
        Aggregation::CountMinusCountDistinct => non_null.len() as Num - count_distinct(&non_null),
        Aggregation::Mode => mode(&non_null),
        Aggregation::Trend => trend(&non_null),
        Aggregation::Skew => skew(&non_null),
        Aggregation::Kurtosis => kurtosis(&non_null),
        // EWMA/trend-variants and timestamp-relative aggregations need both
        // the value series and a paired timestamp series; this module's
        // single-slice `apply` handles every variant that is a pure function
        // of the value series alone. Paired-series variants are computed by
        // the tree/feature layer, which holds the timestamp column.
        _ => f64::NAN,
    }
}

/// The half-life, in seconds, of each named EWMA/EWMA-trend window.
fn ewma_half_life_secs(aggregation: Aggregation) -> Option<f64> {
    const MINUTE: f64 = 60.0;
    const HOUR: f64 = 3_600.0;
    const DAY: f64 = 86_400.0;
    match aggregation {
        Aggregation::Ewma1s | Aggregation::EwmaTrend1s => Some(1.0),
        Aggregation::Ewma1m | Aggregation::EwmaTrend1m => Some(MINUTE),
        Aggregation::Ewma1h | Aggregation::EwmaTrend1h => Some(HOUR),
        Aggregation::Ewma1d | Aggregation::EwmaTrend1d => Some(DAY),
        Aggregation::Ewma7d | Aggregation::EwmaTrend7d => Some(7.0 * DAY),
        Aggregation::Ewma30d | Aggregation::EwmaTrend30d => Some(30.0 * DAY),
        Aggregation::Ewma90d | Aggregation::EwmaTrend90d => Some(90.0 * DAY),
        Aggregation::Ewma365d | Aggregation::EwmaTrend365d => Some(365.0 * DAY),
        _ => None,
    }
}

fn is_ewma_trend_variant(aggregation: Aggregation) -> bool {
    matches!(
        aggregation,
        Aggregation::EwmaTrend1s
            | Aggregation::EwmaTrend1m
            | Aggregation::EwmaTrend1h
            | Aggregation::EwmaTrend1d
            | Aggregation::EwmaTrend7d
            | Aggregation::EwmaTrend30d
            | Aggregation::EwmaTrend90d
            | Aggregation::EwmaTrend365d
    )
}

/// Exponentially weighted average of `values`, decayed relative to the most
/// recent timestamp so a gap of one `half_life` halves a row's weight.
fn ewma(values: &[Num], timestamps: &[Num], half_life: f64) -> Num {
    let last = *timestamps.last().unwrap();
    let weighted: Vec<(Num, Num)> = values
        .iter()
        .zip(timestamps)
        .map(|(&v, &t)| (v, (-(last - t) * std::f64::consts::LN_2 / half_life).exp()))
        .collect();
    let weight_sum: Num = weighted.iter().map(|(_, w)| w).sum();
    if weight_sum == 0.0 {
        return f64::NAN;
    }
    weighted.iter().map(|(v, w)| v * w).sum::<Num>() / weight_sum
}

/// Decayed average of the series' instantaneous rate of change
/// (`dvalue/dtime` between consecutive observations), giving a smoothed
/// trend rather than a single slope over the whole window.
fn ewma_trend(values: &[Num], timestamps: &[Num], half_life: f64) -> Num {
    if values.len() < 2 {
        return f64::NAN;
    }
    let mut rates = Vec::with_capacity(values.len() - 1);
    let mut rate_ts = Vec::with_capacity(values.len() - 1);
    for i in 1..values.len() {
        let dt = timestamps[i] - timestamps[i - 1];
        if dt <= 0.0 {
            continue;
        }
        rates.push((values[i] - values[i - 1]) / dt);
        rate_ts.push(timestamps[i]);
    }
    if rates.is_empty() {
        return f64::NAN;
    }
    ewma(&rates, &rate_ts, half_life)
}

fn avg_time_between(timestamps: &[Num]) -> Num {
    if timestamps.len() < 2 {
        return f64::NAN;
    }
    let gaps: Vec<Num> = timestamps.windows(2).map(|w| w[1] - w[0]).collect();
    gaps.iter().sum::<Num>() / gaps.len() as Num
}

/// Seconds since the first (earliest) occurrence of the group's extreme
/// value; `want_max` selects maximum vs. minimum.
fn time_since_first_extreme(values: &[Num], timestamps: &[Num], want_max: bool) -> Num {
    let mut best = 0;
    for i in 1..values.len() {
        let better = if want_max { values[i] > values[best] } else { values[i] < values[best] };
        if better {
            best = i;
        }
    }
    timestamps.last().copied().unwrap_or(f64::NAN) - timestamps[best]
}

/// Seconds since the last (most recent) occurrence of the group's extreme
/// value, breaking ties toward the later observation.
fn time_since_last_extreme(values: &[Num], timestamps: &[Num], want_max: bool) -> Num {
    let mut best = 0;
    for i in 1..values.len() {
        let better = if want_max { values[i] >= values[best] } else { values[i] <= values[best] };
        if better {
            best = i;
        }
    }
    timestamps.last().copied().unwrap_or(f64::NAN) - timestamps[best]
}

/// Computes a timestamp-paired aggregation — EWMA, EWMA-trend,
/// `avg_time_between`, and the `time_since_*` variants — over a group whose
/// `values`/`timestamps` are the same length and already sorted ascending by
/// `timestamps`. The tree layer owns this ordering since it holds both the
/// aggregated column and the edge's timestamp column; every other
/// aggregation kind is a pure function of `values` alone and is delegated to
/// [`apply`].
#[must_use]
pub fn apply_timed(aggregation: Aggregation, values: &[Num], timestamps: &[Num]) -> Num {
    if values.is_empty() {
        return aggregation.empty_value();
    }
    if let Some(half_life) = ewma_half_life_secs(aggregation) {
        return if is_ewma_trend_variant(aggregation) {
            ewma_trend(values, timestamps, half_life)
        } else {
            ewma(values, timestamps, half_life)
        };
    }
    match aggregation {
        Aggregation::AvgTimeBetween => avg_time_between(timestamps),
        Aggregation::TimeSinceFirstMaximum => time_since_first_extreme(values, timestamps, true),
        Aggregation::TimeSinceFirstMinimum => time_since_first_extreme(values, timestamps, false),
        Aggregation::TimeSinceLastMaximum => time_since_last_extreme(values, timestamps, true),
        Aggregation::TimeSinceLastMinimum => time_since_last_extreme(values, timestamps, false),
        other => apply(other, values),
    }
}

fn quantile(sorted_input: &[Num], q: f64) -> Num {
    let mut v = sorted_input.to_vec();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let idx = ((v.len() - 1) as f64 * q).round() as usize;
    v[idx]
}

fn variance(values: &[Num]) -> Num {
    let mean = values.iter().sum::<Num>() / values.len() as Num;
    values.iter().map(|v| (v - mean).powi(2)).sum::<Num>() / values.len() as Num
}

fn count_distinct(values: &[Num]) -> Num {
    let mut bits: Vec<u64> = values.iter().map(|v| v.to_bits()).collect();
    bits.sort_unstable();
    bits.dedup();
    bits.len() as Num
}

fn mode(values: &[Num]) -> Num {
    let mut counts: std::collections::HashMap<u64, usize> = std::collections::HashMap::new();
    for v in values {
        *counts.entry(v.to_bits()).or_insert(0) += 1;
    }
    let best_bits = *counts.iter().max_by_key(|(_, c)| **c).unwrap().0;
    f64::from_bits(best_bits)
}

fn trend(values: &[Num]) -> Num {
    // Linear regression slope of value against its 0-based position.
    let n = values.len() as Num;
    if n < 2.0 {
        return f64::NAN;
    }
    let xs: Vec<Num> = (0..values.len()).map(|i| i as Num).collect();
    let x_mean = xs.iter().sum::<Num>() / n;
    let y_mean = values.iter().sum::<Num>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for (x, y) in xs.iter().zip(values) {
        num += (x - x_mean) * (y - y_mean);
        den += (x - x_mean).powi(2);
    }
    if den == 0.0 {
        f64::NAN
    } else {
        num / den
    }
}

fn skew(values: &[Num]) -> Num {
    let n = values.len() as Num;
    let mean = values.iter().sum::<Num>() / n;
    let m2 = values.iter().map(|v| (v - mean).powi(2)).sum::<Num>() / n;
    let m3 = values.iter().map(|v| (v - mean).powi(3)).sum::<Num>() / n;
    if m2 == 0.0 {
        f64::NAN
    } else {
        m3 / m2.powf(1.5)
    }
}

fn kurtosis(values: &[Num]) -> Num {
    let n = values.len() as Num;
    let mean = values.iter().sum::<Num>() / n;
    let m2 = values.iter().map(|v| (v - mean).powi(2)).sum::<Num>() / n;
    let m4 = values.iter().map(|v| (v - mean).powi(4)).sum::<Num>() / n;
    if m2 == 0.0 {
        f64::NAN
    } else {
        m4 / m2.powi(2) - 3.0
    }
}
