//! ============================================================================
//! Errors - Typed failures for the client library
//! ============================================================================
//! Transport-level failures are separated from application-level denial:
//! a denial is a successful `AccessDecision`, never an `AccessError`.
//! ============================================================================

use thiserror::Error;

/// Failures talking to the access endpoints
#[derive(Debug, Error)]
pub enum AccessError {
    /// Network, DNS, TLS or timeout failure
    #[error("transport error calling {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Body was not a well-formed response
    #[error("failed to decode response from {endpoint}: {detail}")]
    Decode { endpoint: String, detail: String },

    #[error("controller already started")]
    AlreadyStarted,

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl AccessError {
    /// Whether this failure should be treated as "offline": logged and
    /// skipped until the next scheduled check.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AccessError::Transport { .. } | AccessError::Status { .. } | AccessError::Decode { .. }
        )
    }
}

/// Failures of the local key-value and cache storage
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cannot determine home directory")]
    NoHomeDir,

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(String),

    #[error("failed to (de)serialize stored value: {0}")]
    Serialization(String),
}

impl From<redb::DatabaseError> for StorageError {
    fn from(e: redb::DatabaseError) -> Self {
        StorageError::Database(e.to_string())
    }
}

impl From<redb::TransactionError> for StorageError {
    fn from(e: redb::TransactionError) -> Self {
        StorageError::Database(e.to_string())
    }
}

impl From<redb::TableError> for StorageError {
    fn from(e: redb::TableError) -> Self {
        StorageError::Database(e.to_string())
    }
}

impl From<redb::StorageError> for StorageError {
    fn from(e: redb::StorageError) -> Self {
        StorageError::Database(e.to_string())
    }
}

impl From<redb::CommitError> for StorageError {
    fn from(e: redb::CommitError) -> Self {
        StorageError::Database(e.to_string())
    }
}
