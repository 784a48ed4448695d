//! Resolves the table *names* stored in a [`crate::placeholder::Placeholder`]
//! to actual [`DataFrame`]s supplied by the fit/transform caller.
//!
//! The Placeholder never holds a reference to a `DataFrame` directly (spec.md
//! §3, "Ownership": "No back-references; the Placeholder stores table *names*
//! that are resolved by external lookup"); a `TableRegistry` is that external
//! lookup.

use std::collections::HashMap;

use crate::schema::validator::{SchemaError, SchemaResult};
use crate::schema::DataFrame;

/// A name → `DataFrame` lookup table built fresh for one fit or transform
/// call from the population frame and the peripheral frames the caller
/// passed in.
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: HashMap<String, DataFrame>,
}

impl TableRegistry {
    #[must_use]
    pub fn new() -> Self {
        TableRegistry::default()
    }

    pub fn register(&mut self, frame: DataFrame) -> &mut Self {
        self.tables.insert(frame.name().to_string(), frame);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DataFrame> {
        self.tables.get(name)
    }

    pub fn require(&self, name: &str) -> SchemaResult<&DataFrame> {
        self.get(name)
            .ok_or_else(|| SchemaError::UnknownPeripheral(name.to_string()))
    }

    #[must_use]
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }
}
