//! Hash index from join-key id to the sorted row numbers carrying it in one
//! peripheral [`DataFrame`](crate::schema::DataFrame) (C3).
//!
//! # Architecture
//!
//! ```text
//! JoinKeyIndex
//!   |-- BloomFilter               (fast-negative prefilter)
//!   |-- HashMap<Key, Vec<usize>>  (key -> sorted row numbers)
//!   `-- begin_: usize             (rows [0, begin_) already indexed)
//! ```
//!
//! The index is built lazily and incrementally: [`JoinKeyIndex::rebuild_if_needed`]
//! appends entries for any row appended to the table since the last rebuild.
//! If the table has *shrunk* below `begin_`, the previous contents can no
//! longer be trusted (row numbers may have been reused) and the index is
//! cleared and rebuilt from row 0.

use std::collections::HashMap;

use crate::bloom_filter::BloomFilter;
use crate::schema::DataFrame;
use crate::value::Cat;

/// A single join key, possibly composite (multiple columns hashed as one
/// tuple key).
pub type CompositeKey = Vec<Cat>;

/// Hash index over one peripheral table's join-key column(s).
#[derive(Debug, Clone)]
pub struct JoinKeyIndex {
    key_columns: Vec<String>,
    rows_by_key: HashMap<CompositeKey, Vec<usize>>,
    filter: BloomFilter,
    begin: usize,
}

impl JoinKeyIndex {
    /// Builds an empty index over `key_columns`. Call [`rebuild_if_needed`]
    /// before the first lookup.
    ///
    /// [`rebuild_if_needed`]: JoinKeyIndex::rebuild_if_needed
    #[must_use]
    pub fn new(key_columns: Vec<String>) -> Self {
        JoinKeyIndex {
            key_columns,
            rows_by_key: HashMap::new(),
            filter: BloomFilter::new(1024, 0.01),
            begin: 0,
        }
    }

    /// Appends entries for rows `[begin_, table.nrows())`, or clears and
    /// rebuilds from scratch if the table has shrunk below `begin_`.
    pub fn rebuild_if_needed(&mut self, table: &DataFrame) {
        let nrows = table.nrows();
        if nrows < self.begin {
            self.rows_by_key.clear();
            self.filter = BloomFilter::new(nrows.max(1024), 0.01);
            self.begin = 0;
        }
        if nrows == self.begin {
            return;
        }
        let columns: Vec<_> = self
            .key_columns
            .iter()
            .filter_map(|name| table.column(name))
            .collect();
        if columns.len() != self.key_columns.len() {
            // One or more key columns missing from this table; nothing
            // indexable, but still mark the range as processed.
            self.begin = nrows;
            return;
        }
        for row in self.begin..nrows {
            let key: CompositeKey = columns.iter().map(|c| c.get_cat(row)).collect();
            if key.iter().any(|&v| v < 0) {
                continue; // null join key, never matches
            }
            self.index_key(&key);
            self.rows_by_key.entry(key).or_default().push(row);
        }
        self.begin = nrows;
    }

    fn index_key(&mut self, key: &CompositeKey) {
        // Bloom filter only over the single-column case cheaply; composite
        // keys hash the whole tuple via the first element's bit pattern
        // folded with the rest, which is sufficient for a fast-negative
        // prefilter (false positives only cost an extra HashMap probe).
        let folded = key.iter().fold(0i32, |acc, &v| acc ^ v.wrapping_mul(0x9E3779B1_u32 as i32));
        self.filter.insert(folded);
    }

    /// Row numbers carrying `key`, in ascending order, or `&[]` if absent.
    #[must_use]
    pub fn lookup(&self, key: &[Cat]) -> &[usize] {
        if key.iter().any(|&v| v < 0) {
            return &[];
        }
        let folded = key.iter().fold(0i32, |acc, &v| acc ^ v.wrapping_mul(0x9E3779B1_u32 as i32));
        if !self.filter.might_contain(folded) {
            return &[];
        }
        self.rows_by_key.get(key).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    #[must_use]
    pub fn rows_indexed(&self) -> usize {
        self.begin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::schema::{Role, Schema};

    fn table(ids: Vec<Cat>) -> DataFrame {
        DataFrame::new(
            "orders",
            vec![Column::from_cats("customer_id", "", ids)],
            Schema::new().with_role("customer_id", Role::JoinKey),
        )
        .unwrap()
    }

    #[test]
    fn lookup_finds_matching_rows() {
        let df = table(vec![1, 2, 1, -1, 2]);
        let mut idx = JoinKeyIndex::new(vec!["customer_id".into()]);
        idx.rebuild_if_needed(&df);
        assert_eq!(idx.lookup(&[1]), &[0, 2]);
        assert_eq!(idx.lookup(&[2]), &[1, 4]);
        assert_eq!(idx.lookup(&[3]), &[] as &[usize]);
    }

    #[test]
    fn null_keys_excluded() {
        let df = table(vec![-1, -1]);
        let mut idx = JoinKeyIndex::new(vec!["customer_id".into()]);
        idx.rebuild_if_needed(&df);
        assert_eq!(idx.rows_indexed(), 2);
        assert!(idx.lookup(&[-1]).is_empty());
    }

    #[test]
    fn incremental_rebuild_appends_only_new_rows() {
        let mut idx = JoinKeyIndex::new(vec!["customer_id".into()]);
        idx.rebuild_if_needed(&table(vec![1, 2]));
        assert_eq!(idx.rows_indexed(), 2);
        idx.rebuild_if_needed(&table(vec![1, 2, 1]));
        assert_eq!(idx.rows_indexed(), 3);
        assert_eq!(idx.lookup(&[1]), &[0, 2]);
    }

    #[test]
    fn shrink_triggers_full_rebuild() {
        let mut idx = JoinKeyIndex::new(vec!["customer_id".into()]);
        idx.rebuild_if_needed(&table(vec![1, 2, 1]));
        idx.rebuild_if_needed(&table(vec![2]));
        assert_eq!(idx.rows_indexed(), 1);
        assert!(idx.lookup(&[1]).is_empty());
        assert_eq!(idx.lookup(&[2]), &[0]);
    }
}
