//! Caches one [`JoinKeyIndex`] per (peripheral table, key-column-set) pair.
//!
//! ## Architecture
//!
//! ```text
//! IndexManager
//!   `-- HashMap<(table_name, key_columns), JoinKeyIndex>
//! ```
//!
//! A multi-key join is built once per distinct key-column-set and reused
//! across every population row and every tree node that joins against the
//! same peripheral table on the same keys, rather than rebuilt per node.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::join_index::JoinKeyIndex;
use crate::schema::DataFrame;

type CacheKey = (String, Vec<String>);

/// Owns every [`JoinKeyIndex`] needed for one fit or transform call.
#[derive(Default)]
pub struct IndexManager {
    indexes: RwLock<HashMap<CacheKey, JoinKeyIndex>>,
}

impl IndexManager {
    #[must_use]
    pub fn new() -> Self {
        IndexManager::default()
    }

    /// Returns the up-to-date index for `table` over `key_columns`, building
    /// or incrementally refreshing it as needed.
    pub fn index_for(&self, table: &DataFrame, key_columns: &[String]) -> JoinKeyIndex {
        let cache_key = (table.name().to_string(), key_columns.to_vec());
        {
            let indexes = self.indexes.read();
            if let Some(existing) = indexes.get(&cache_key) {
                if existing.rows_indexed() == table.nrows() {
                    return existing.clone();
                }
            }
        }
        let mut indexes = self.indexes.write();
        let entry = indexes
            .entry(cache_key)
            .or_insert_with(|| JoinKeyIndex::new(key_columns.to_vec()));
        entry.rebuild_if_needed(table);
        entry.clone()
    }

    #[must_use]
    pub fn cached_pairs(&self) -> usize {
        self.indexes.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::schema::{Role, Schema};

    fn table(ids: Vec<i32>) -> DataFrame {
        DataFrame::new(
            "orders",
            vec![Column::from_cats("customer_id", "", ids)],
            Schema::new().with_role("customer_id", Role::JoinKey),
        )
        .unwrap()
    }

    #[test]
    fn builds_and_caches_one_index_per_key_set() {
        let manager = IndexManager::new();
        let df = table(vec![1, 2, 1]);
        let idx = manager.index_for(&df, &["customer_id".to_string()]);
        assert_eq!(idx.lookup(&[1]), &[0, 2]);
        assert_eq!(manager.cached_pairs(), 1);
        let idx_again = manager.index_for(&df, &["customer_id".to_string()]);
        assert_eq!(idx_again.rows_indexed(), 3);
        assert_eq!(manager.cached_pairs(), 1);
    }
}
