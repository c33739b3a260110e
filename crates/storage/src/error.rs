//! Store error types.

use hyrule_primitives::Fingerprint;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The object is larger than the whole budget.
    #[error("object {fingerprint} weighs {weight}, budget is {limit}")]
    CapacityExceeded {
        fingerprint: Fingerprint,
        weight: u64,
        limit: u64,
    },

    /// The object does not fit in the free space and eviction was not allowed.
    #[error("object {fingerprint} weighs {weight}, only {free} free")]
    InsufficientSpace {
        fingerprint: Fingerprint,
        weight: u64,
        free: u64,
    },

    /// The object's fingerprint does not match its content.
    #[error("object {0} failed fingerprint check")]
    InvalidObject(Fingerprint),

    /// The backend failed to read or write.
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// A stored record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<redb::DatabaseError> for StoreError {
    fn from(err: redb::DatabaseError) -> Self {
        StoreError::StorageFailure(err.to_string())
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(err: redb::TransactionError) -> Self {
        StoreError::StorageFailure(err.to_string())
    }
}

impl From<redb::TableError> for StoreError {
    fn from(err: redb::TableError) -> Self {
        StoreError::StorageFailure(err.to_string())
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(err: redb::StorageError) -> Self {
        StoreError::StorageFailure(err.to_string())
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(err: redb::CommitError) -> Self {
        StoreError::StorageFailure(err.to_string())
    }
}

impl From<postcard::Error> for StoreError {
    fn from(err: postcard::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
