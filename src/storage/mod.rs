//! Storage module for persisting the visit ledger
//!
//! This module handles writing the gate's durable state and reading it back at
//! startup:
//! - JSON file storage (the default)
//! - SQLite database storage
//! - In-memory storage for tests and embedders that need no persistence

mod json;
mod memory;
mod schema;
mod sqlite;
mod traits;

pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{StorageError, StorageResult, VisitStore};

use crate::config::{GateConfig, StoreBackend};
use std::path::Path;

/// Opens the visit store described by the gate configuration
///
/// # Arguments
///
/// * `config` - The gate configuration naming the backend and path
///
/// # Returns
///
/// * `Ok(Box<dyn VisitStore>)` - The opened store
/// * `Err(StorageError)` - Failed to open the store
pub fn open_store(config: &GateConfig) -> StorageResult<Box<dyn VisitStore>> {
    let path = Path::new(&config.state_path);
    match config.backend {
        StoreBackend::Json => Ok(Box::new(JsonFileStore::new(path))),
        StoreBackend::Sqlite => Ok(Box::new(SqliteStore::new(path)?)),
    }
}
