//! Produces, for each population row, the set of peripheral rows whose join
//! key and time-stamp window qualify them as a match (C4).
//!
//! Ordering is load-bearing: matches are grouped by population row in
//! ascending order and, within a group, by peripheral row in ascending
//! order, so that [Testable Property 3](crate) (matchmaker determinism) holds
//! regardless of thread count.

use crate::index_manager::IndexManager;
use crate::placeholder::{PlaceholderNode, TimeStampWindow};
use crate::schema::DataFrame;
use crate::value::{Cat, Num};

/// One (population-row, peripheral-row) pair that passed the join-key and
/// time-stamp filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub population_row: usize,
    pub peripheral_row: usize,
}

/// Builds [`Match`] lists for one population/peripheral table pair described
/// by a [`PlaceholderNode`] edge.
pub struct Matchmaker<'a> {
    population: &'a DataFrame,
    peripheral: &'a DataFrame,
    edge: &'a PlaceholderNode,
    index_manager: &'a IndexManager,
    use_timestamps: bool,
}

impl<'a> Matchmaker<'a> {
    /// `use_timestamps` is the matchmaker-level kill switch for time-stamp
    /// windowing (the Fit API's `use_timestamps` hyperparameter): even an
    /// edge configured with a [`TimeStampWindow`] matches unconditionally
    /// when it is `false`.
    #[must_use]
    pub fn new(
        population: &'a DataFrame,
        peripheral: &'a DataFrame,
        edge: &'a PlaceholderNode,
        index_manager: &'a IndexManager,
        use_timestamps: bool,
    ) -> Self {
        Matchmaker {
            population,
            peripheral,
            edge,
            index_manager,
            use_timestamps,
        }
    }

    /// Produces matches for every population row with nonzero weight,
    /// grouped by population row then by peripheral row, both ascending.
    #[must_use]
    pub fn make_matches(&self, weights: &[Num]) -> Vec<Match> {
        let right_keys: Vec<String> = self.edge.join_keys.iter().map(|k| k.right.clone()).collect();
        let index = self.index_manager.index_for(self.peripheral, &right_keys);
        let mut out = Vec::new();
        for p in 0..self.population.nrows() {
            if weights.get(p).copied().unwrap_or(1.0) == 0.0 {
                continue;
            }
            self.matches_for_row(p, &index, &mut out);
        }
        out
    }

    /// Overwrites `out` with the current matches of `row` only, without
    /// touching any other population row's matches. Used during split search
    /// when only one row's candidacy needs re-evaluating.
    pub fn refresh(&self, row: usize, out: &mut Vec<Match>) {
        out.clear();
        let right_keys: Vec<String> = self.edge.join_keys.iter().map(|k| k.right.clone()).collect();
        let index = self.index_manager.index_for(self.peripheral, &right_keys);
        self.matches_for_row(row, &index, out);
    }

    fn matches_for_row(&self, p: usize, index: &crate::join_index::JoinKeyIndex, out: &mut Vec<Match>) {
        let key = self.population_key(p);
        if key.iter().any(|&v| v < 0) {
            return;
        }
        let candidates = index.lookup(&key);
        for &r in candidates {
            if self.passes_timestamp_window(p, r) {
                out.push(Match {
                    population_row: p,
                    peripheral_row: r,
                });
            }
        }
    }

    fn population_key(&self, p: usize) -> Vec<Cat> {
        self.edge
            .join_keys
            .iter()
            .filter_map(|k| self.population.column(&k.left))
            .map(|c| c.get_cat(p))
            .collect()
    }

    fn passes_timestamp_window(&self, p: usize, r: usize) -> bool {
        if !self.use_timestamps {
            return true;
        }
        let Some(ts) = &self.edge.time_stamp else {
            return true;
        };
        self.passes_window(ts, p, r)
    }

    fn passes_window(&self, ts: &TimeStampWindow, p: usize, r: usize) -> bool {
        let Some(left_col) = self.population.column(&ts.left_ts) else {
            return true;
        };
        let Some(right_col) = self.peripheral.column(&ts.right_ts) else {
            return true;
        };
        let left_ts = left_col.get_num(p);
        let right_ts = right_col.get_num(r);
        if left_ts.is_nan() || right_ts.is_nan() {
            return false; // null timestamp never matches
        }
        let effective = left_ts - self.edge.horizon;
        if right_ts > effective {
            return false;
        }
        if right_ts + ts.memory < effective {
            return false;
        }
        if let Some(upper_name) = &ts.upper_ts {
            if let Some(upper_col) = self.population.column(upper_name) {
                let upper = upper_col.get_num(p);
                if !upper.is_nan() && right_ts >= upper {
                    return false;
                }
            }
        }
        true
    }
}
