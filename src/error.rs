//! Top-level error taxonomy (ambient): unifies every subsystem's error enum
//! at the `fit`/`transform` API boundary.

use thiserror::Error;

use crate::loss::LossError;
use crate::schema::SchemaError;
use crate::worker_pool::WorkerError;

/// Errors raised directly by the model state machine, not owned by any one
/// subsystem.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("transform called on a model that has not finished fitting")]
    NotFitted,

    #[error("fit called on a model that is already fitting or fitted")]
    AlreadyFitting,

    #[error("timed out waiting for a DataFrame read/write lock")]
    LockTimeout,

    #[error("match buffer exceeded its capacity during transform")]
    MatchBufferExhausted,

    #[error("model artifact failed its checksum on load")]
    ChecksumMismatch,

    #[error("model artifact could not be (de)serialized: {0}")]
    Codec(String),
}

/// The error type returned by every public `fit`/`transform` entry point.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FeatureEngineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Loss(#[from] LossError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Result alias for the public fit/transform API.
pub type FeatureEngineResult<T> = Result<T, FeatureEngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_converts_via_from() {
        let err: FeatureEngineError = SchemaError::MissingTarget.into();
        assert!(matches!(err, FeatureEngineError::Schema(_)));
    }

    #[test]
    fn model_error_converts_via_from() {
        let err: FeatureEngineError = ModelError::NotFitted.into();
        assert!(matches!(err, FeatureEngineError::Model(_)));
    }
}
