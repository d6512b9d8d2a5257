use std::time::Duration;
use thiserror::Error;

/// Failures of the schema upgrade ladder
#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error("Database version {found} is not supported (supported: {oldest}..={current})")]
    UnsupportedVersion { found: i64, oldest: i64, current: i64 },

    #[error("Database has tables but no schema version")]
    Unversioned,

    #[error("Upgrade step v{from} -> v{to} failed: {message}")]
    Step { from: i64, to: i64, message: String },

    #[error("Upgrade did not report completion within {0:?}")]
    Timeout(Duration),

    #[error("Upgrade worker exited without reporting a result")]
    WorkerLost,

    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A single check of the verification pass that did not hold
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("{collection}[{index}].{field}: expected {expected:?}, found {actual:?}")]
    FieldMismatch {
        collection: String,
        index: usize,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("{collection}: expected {expected} rows, found {actual}")]
    CountMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    #[error("schema version: expected {expected}, found {actual}")]
    VersionMismatch { expected: i64, actual: i64 },

    #[error("receipts of trip {trip}: custom order id {current} at index {index} does not increase past {previous}")]
    OrderingViolation {
        trip: String,
        index: usize,
        previous: i64,
        current: i64,
    },

    #[error("uuid {uuid} is shared by {first} and {second}")]
    DuplicateUuid {
        uuid: String,
        first: String,
        second: String,
    },

    #[error("could not read {what}: {message}")]
    Read { what: String, message: String },
}

pub type VerificationResult<T> = std::result::Result<T, VerificationError>;
