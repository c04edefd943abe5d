//! In-memory storage implementation
//!
//! Nothing survives the process. Clones share the same ledger, so a test can
//! keep a handle on what the gate has written.

use crate::state::VisitLedger;
use crate::storage::traits::{StorageError, StorageResult, VisitStore};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Shared in-memory visit store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    ledger: Arc<Mutex<VisitLedger>>,
    saves: Arc<AtomicUsize>,
    reject_saves: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds a ledger, as if left by a previous run
    pub fn with_ledger(ledger: VisitLedger) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
            ..Self::default()
        }
    }

    /// The ledger as last saved
    pub fn snapshot(&self) -> VisitLedger {
        self.ledger
            .lock()
            .map(|ledger| ledger.clone())
            .unwrap_or_default()
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Makes every following save fail, simulating a full or read-only disk
    pub fn reject_saves(&self, reject: bool) {
        self.reject_saves.store(reject, Ordering::SeqCst);
    }
}

impl VisitStore for MemoryStore {
    fn load(&self) -> StorageResult<VisitLedger> {
        let ledger = self.ledger.lock().map_err(|_| StorageError::Lock)?;
        Ok(ledger.clone())
    }

    fn save(&mut self, ledger: &VisitLedger) -> StorageResult<()> {
        if self.reject_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Rejected("memory store is read-only".to_string()));
        }

        let mut stored = self.ledger.lock().map_err(|_| StorageError::Lock)?;
        *stored = ledger.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
