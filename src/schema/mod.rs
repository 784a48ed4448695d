//! # DataFrame & Schema
//!
//! A [`DataFrame`] is a named bundle of [`Column`](crate::column::Column)s
//! plus a [`Schema`] that classifies each column into exactly one [`Role`].
//! A [`DataFrameView`] adds a row-index projection so the Matchmaker (C4) and
//! tree fitting (C8) can operate on a subsample without copying columns.
//!
//! `DataFrame::new` enforces two structural invariants before a frame can
//! exist at all: every column has identical length, and every column name
//! carries exactly one role. A third invariant — join-key columns are
//! `cat`-typed, encoded with the model's shared [`crate::encoding::Encoding`]
//! — is checked separately by [`validator::validate_join_keys_encoded`],
//! since it only matters once a frame is about to be joined.

pub mod registry;
pub mod validator;

pub use registry::TableRegistry;
pub use validator::{SchemaError, SchemaResult};

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::column::{Column, ColumnView};

/// The role a column plays within a `DataFrame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Join-key column (`cat`-typed); nulls never match.
    JoinKey,
    /// Timestamp column (`num`-typed, ordered); nulls never match.
    TimeStamp,
    /// Regression/classification target; population-only.
    Target,
    /// Generic numerical attribute.
    Numerical,
    /// Categorical attribute.
    Categorical,
    /// Integer-valued numerical attribute (ordered prefixes for binning).
    Discrete,
    /// Tokenized text attribute.
    Text,
    /// Present in the DataFrame but excluded from feature search.
    Unused,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::JoinKey => "join_key",
            Role::TimeStamp => "time_stamp",
            Role::Target => "target",
            Role::Numerical => "numerical",
            Role::Categorical => "categorical",
            Role::Discrete => "discrete",
            Role::Text => "text",
            Role::Unused => "unused",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Maps every column name in a `DataFrame` to its [`Role`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    roles: HashMap<String, Role>,
}

impl Schema {
    #[must_use]
    pub fn new() -> Self {
        Schema::default()
    }

    pub fn with_role(mut self, column: impl Into<String>, role: Role) -> Self {
        self.roles.insert(column.into(), role);
        self
    }

    #[must_use]
    pub fn role_of(&self, column: &str) -> Option<Role> {
        self.roles.get(column).copied()
    }

    #[must_use]
    pub fn columns_with_role(&self, role: Role) -> Vec<&str> {
        self.roles
            .iter()
            .filter(|(_, r)| **r == role)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    #[must_use]
    pub fn join_keys(&self) -> Vec<&str> {
        self.columns_with_role(Role::JoinKey)
    }
}

/// A named bundle of columns plus the [`Schema`] classifying their roles.
#[derive(Debug, Clone)]
pub struct DataFrame {
    name: Arc<str>,
    columns: HashMap<String, Column>,
    schema: Schema,
    nrows: usize,
}

impl DataFrame {
    /// Builds a `DataFrame`, validating invariants I-1/I-2 against `schema`.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<Column>,
        schema: Schema,
    ) -> SchemaResult<Self> {
        let nrows = columns.first().map(Column::len).unwrap_or(0);
        for c in &columns {
            if c.len() != nrows {
                return Err(SchemaError::ColumnLengthMismatch {
                    column: c.name().to_string(),
                    expected: nrows,
                    actual: c.len(),
                });
            }
        }
        let mut by_name = HashMap::with_capacity(columns.len());
        for c in columns {
            let name = c.name().to_string();
            if by_name.insert(name.clone(), c).is_some() {
                return Err(SchemaError::DuplicateColumn(name));
            }
        }
        for name in by_name.keys() {
            if schema.role_of(name).is_none() {
                return Err(SchemaError::MissingRole(name.clone()));
            }
        }
        Ok(DataFrame {
            name: Arc::from(name.into()),
            columns: by_name,
            schema,
            nrows,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    #[must_use]
    pub fn columns_with_role(&self, role: Role) -> Vec<&Column> {
        self.schema
            .columns_with_role(role)
            .into_iter()
            .filter_map(|name| self.columns.get(name))
            .collect()
    }

    /// An identity view over every row of this frame.
    #[must_use]
    pub fn view(&self) -> DataFrameView {
        let idx: Arc<[usize]> = (0..self.nrows).collect::<Vec<_>>().into();
        DataFrameView {
            frame: self.clone(),
            idx,
        }
    }
}

/// A row-index projection over a [`DataFrame`]. Used to hand the fit driver a
/// subsample (boosting §4.8) without copying any column storage.
#[derive(Debug, Clone)]
pub struct DataFrameView {
    frame: DataFrame,
    idx: Arc<[usize]>,
}

impl DataFrameView {
    #[must_use]
    pub fn new(frame: DataFrame, idx: Arc<[usize]>) -> Self {
        DataFrameView { frame, idx }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.idx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.idx.is_empty()
    }

    #[must_use]
    pub fn underlying_row(&self, logical_row: usize) -> usize {
        self.idx[logical_row]
    }

    #[must_use]
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    #[must_use]
    pub fn column_view(&self, name: &str) -> Option<ColumnView> {
        self.frame
            .column(name)
            .map(|c| ColumnView::new(c.clone(), self.idx.clone()))
    }
}
