//! Schema and pre-fit validation errors.
//!
//! [`DataFrame::new`](super::DataFrame::new) already enforces equal column
//! length and one role per column at construction time; this module adds the
//! join-keys-are-encoded check plus the higher-level checks the Fit API runs
//! before any tree is touched: unknown peripheral name in the placeholder, a
//! missing target, and an unrecognized aggregation/loss-function name in the
//! hyperparameter bag.

use thiserror::Error;

use crate::column::ColumnShape;
use crate::schema::{DataFrame, Role};

/// Errors surfaced by schema and pre-fit validation. Per spec.md §7 these are
/// raised immediately, with no retry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("column '{column}' has length {actual}, expected {expected}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("column '{0}' appears more than once in the same DataFrame")]
    DuplicateColumn(String),

    #[error("column '{0}' has no role assigned in the schema")]
    MissingRole(String),

    #[error("join-key column '{0}' must be categorical-encoded")]
    JoinKeyNotEncoded(String),

    #[error("peripheral table '{0}' referenced by the placeholder was not supplied")]
    UnknownPeripheral(String),

    #[error("population DataFrame has no column with role 'target'")]
    MissingTarget,

    #[error("unknown aggregation kind '{0}' in hyperparameters allow-list")]
    UnknownAggregation(String),

    #[error("unknown loss function '{0}'")]
    UnknownLossFunction(String),
}

/// Result alias for schema/validation operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Checks I-3: every `join_key`-role column in `frame` is `cat`-shaped
/// (`DenseInt`), since join-key equality is defined over encoded categories.
pub fn validate_join_keys_encoded(frame: &DataFrame) -> SchemaResult<()> {
    for name in frame.schema().join_keys() {
        let Some(column) = frame.column(name) else {
            continue;
        };
        if !matches!(column.shape(), ColumnShape::Int(_)) {
            return Err(SchemaError::JoinKeyNotEncoded(name.to_string()));
        }
    }
    Ok(())
}

/// Checks that the population frame carries at least one `target` column.
pub fn validate_has_target(frame: &DataFrame) -> SchemaResult<()> {
    if frame.schema().columns_with_role(Role::Target).is_empty() {
        return Err(SchemaError::MissingTarget);
    }
    Ok(())
}
