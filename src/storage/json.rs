//! JSON file storage implementation
//!
//! The ledger is kept as a single JSON document:
//!
//! ```json
//! {
//!   "hosts": { "https://example.com": { "lastVisitEpochSeconds": 1700000000, "waitSeconds": 15 } },
//!   "unreachable": ["https://down.example"]
//! }
//! ```

use crate::state::VisitLedger;
use crate::storage::traits::{StorageError, StorageResult, VisitStore};
use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

/// JSON file backed visit store
///
/// Writes are atomic (write to a `.tmp` sibling, then rename) so an
/// interrupted write never leaves a truncated ledger behind.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

impl VisitStore for JsonFileStore {
    /// Loads the ledger
    ///
    /// A missing file yields an empty ledger. So does a file that is not a
    /// well-formed ledger (bad JSON, or `hosts`/`unreachable` missing); it is
    /// overwritten by the next save. Any other read failure is an error.
    fn load(&self) -> StorageResult<VisitLedger> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No visit ledger at {}, starting empty", self.path.display());
                return Ok(VisitLedger::new());
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<VisitLedger>(&bytes) {
            Ok(ledger) => {
                tracing::info!(
                    "Loaded visit ledger from {}: {} hosts, {} unreachable",
                    self.path.display(),
                    ledger.hosts.len(),
                    ledger.unreachable.len()
                );
                Ok(ledger)
            }
            Err(e) => {
                tracing::warn!(
                    "Ignoring malformed visit ledger at {}: {}",
                    self.path.display(),
                    e
                );
                Ok(VisitLedger::new())
            }
        }
    }

    fn save(&mut self, ledger: &VisitLedger) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(ledger)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        // The ledger must be on disk before the rename makes it visible
        let tmp_path = self.tmp_path();
        let mut file = File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);
        std::fs::rename(&tmp_path, &self.path)?;

        tracing::trace!("Persisted visit ledger to {}", self.path.display());
        Ok(())
    }
}
