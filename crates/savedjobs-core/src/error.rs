//! Error types for Saved Jobs
//!
//! Only local failures are errors. Remote failures are classified into
//! [`RemoteOutcome`](crate::remote::RemoteOutcome) values and never surface here.

use thiserror::Error;

/// Main error type for Saved Jobs operations
#[derive(Error, Debug)]
pub enum BookmarkError {
    /// Error during local storage operations
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database creation/opening error
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Table error
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    /// Storage operation error
    #[error("Storage operation error: {0}")]
    StorageOp(#[from] redb::StorageError),

    /// Commit error
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// Error during serialization/deserialization of a stored collection
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote client or service configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The sync this call was waiting on failed or was cancelled
    #[error("Sync aborted: {0}")]
    SyncAborted(String),
}

/// Result type alias using BookmarkError
pub type BookmarkResult<T> = Result<T, BookmarkError>;
