//! Model-scoped string ↔ categorical-id encoding (C1).
//!
//! # Architecture
//!
//! ```text
//! Encoding
//!   |-- insert path:  parking_lot::Mutex<EncodingTable>  (monotonic id assignment)
//!   `-- lookup path:  arc_swap::ArcSwap<EncodingTable>    (lock-free read)
//! ```
//!
//! The source engine keeps this mapping process-wide; here it is owned by one
//! model and threaded explicitly through ingest and transform (see
//! `SPEC_FULL.md` §9, "Global state"). Ordering of inserted ids is
//! deterministic in insertion order, which the split-gain tie-break (C5) and
//! the round-trip property (Testable Property 2) both depend on.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::value::{Cat, NULL_CAT};

/// The append-only `string -> id` table, published atomically on every
/// insert so lookups never block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncodingTable {
    string_to_id: HashMap<String, Cat>,
    id_to_string: Vec<String>,
}

impl EncodingTable {
    fn lookup(&self, s: &str) -> Option<Cat> {
        self.string_to_id.get(s).copied()
    }

    #[must_use]
    pub fn decode(&self, id: Cat) -> Option<&str> {
        if id < 0 {
            return None;
        }
        self.id_to_string.get(id as usize).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.id_to_string.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_to_string.is_empty()
    }
}

/// Mode under which [`Encoding::encode`] operates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeMode {
    /// Assigns a new id to unseen strings (fit/ingest path).
    Insert,
    /// Returns [`crate::value::NULL_CAT`] for unseen strings, never mutates
    /// the table (transform/predict path).
    LookupOnly,
}

/// A model-scoped `string -> cat` encoder. Cheap to clone: the table is
/// shared via `Arc`/`ArcSwap`.
#[derive(Debug, Clone)]
pub struct Encoding {
    published: Arc<ArcSwap<EncodingTable>>,
    insert_lock: Arc<Mutex<()>>,
}

impl Default for Encoding {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoding {
    #[must_use]
    pub fn new() -> Self {
        Encoding {
            published: Arc::new(ArcSwap::from_pointee(EncodingTable::default())),
            insert_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Restores an encoding from a previously persisted table (used when
    /// loading a model artifact).
    #[must_use]
    pub fn from_table(table: EncodingTable) -> Self {
        Encoding {
            published: Arc::new(ArcSwap::from_pointee(table)),
            insert_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Encodes a string under the given mode.
    ///
    /// `Insert` mode appends a new id (in insertion order) for a string never
    /// seen before; `LookupOnly` mode returns [`NULL_CAT`] instead and leaves
    /// the table unmodified.
    pub fn encode(&self, s: &str, mode: EncodeMode) -> Cat {
        if let Some(id) = self.published.load().lookup(s) {
            return id;
        }
        match mode {
            EncodeMode::LookupOnly => NULL_CAT,
            EncodeMode::Insert => {
                let _guard = self.insert_lock.lock();
                // Re-check under the lock: another inserter may have raced us.
                let current = self.published.load();
                if let Some(id) = current.lookup(s) {
                    return id;
                }
                let mut next: EncodingTable = (**current).clone();
                let id = next.id_to_string.len() as Cat;
                next.id_to_string.push(s.to_string());
                next.string_to_id.insert(s.to_string(), id);
                self.published.store(Arc::new(next));
                id
            }
        }
    }

    #[must_use]
    pub fn decode(&self, id: Cat) -> Option<String> {
        self.published.load().decode(id).map(str::to_string)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.published.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.published.load().is_empty()
    }

    /// A point-in-time snapshot of the table, suitable for persistence.
    #[must_use]
    pub fn snapshot(&self) -> EncodingTable {
        (**self.published.load()).clone()
    }
}
