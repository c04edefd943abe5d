//! Storage traits and error types
//!
//! This module defines the trait interface for visit ledger backends and
//! associated error types.

use crate::state::VisitLedger;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage lock poisoned")]
    Lock,

    #[error("Write rejected: {0}")]
    Rejected(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for visit ledger backends
///
/// The gate loads the ledger once when it is built and then rewrites it in
/// full after every change, so `save` must leave the complete ledger durable
/// before it returns.
pub trait VisitStore: Send {
    /// Loads the ledger, or an empty one if nothing has been stored yet
    fn load(&self) -> StorageResult<VisitLedger>;

    /// Replaces the stored ledger
    fn save(&mut self, ledger: &VisitLedger) -> StorageResult<()>;
}
