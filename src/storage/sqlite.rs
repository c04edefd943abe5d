//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the VisitStore trait.

use crate::state::{HostRecord, VisitLedger};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{StorageResult, VisitStore};
use rusqlite::{params, Connection};
use std::path::Path;

/// SQLite visit store
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates a SQLite visit store
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Every save must be on disk before the gate answers
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl VisitStore for SqliteStore {
    fn load(&self) -> StorageResult<VisitLedger> {
        let mut ledger = VisitLedger::new();

        let mut stmt = self
            .conn
            .prepare("SELECT host, last_visit, wait_seconds FROM hosts")?;
        let rows = stmt.query_map([], |row| {
            let host: String = row.get(0)?;
            let last_visit: i64 = row.get(1)?;
            let wait_seconds: i64 = row.get(2)?;
            Ok((
                host,
                HostRecord {
                    last_visit,
                    wait_seconds: u64::try_from(wait_seconds).unwrap_or(0),
                },
            ))
        })?;
        for row in rows {
            let (host, record) = row?;
            ledger.hosts.insert(host, record);
        }

        let mut stmt = self.conn.prepare("SELECT host FROM unreachable")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        for row in rows {
            ledger.unreachable.insert(row?);
        }

        tracing::info!(
            "Loaded visit ledger from SQLite: {} hosts, {} unreachable",
            ledger.hosts.len(),
            ledger.unreachable.len()
        );

        Ok(ledger)
    }

    fn save(&mut self, ledger: &VisitLedger) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        // Full rewrite: clear both tables, then insert the current ledger
        tx.execute("DELETE FROM hosts", [])?;
        tx.execute("DELETE FROM unreachable", [])?;

        {
            let mut insert_host = tx.prepare(
                "INSERT INTO hosts (host, last_visit, wait_seconds) VALUES (?1, ?2, ?3)",
            )?;
            for (host, record) in &ledger.hosts {
                let wait_seconds = i64::try_from(record.wait_seconds).unwrap_or(i64::MAX);
                insert_host.execute(params![host, record.last_visit, wait_seconds])?;
            }

            let mut insert_unreachable =
                tx.prepare("INSERT INTO unreachable (host) VALUES (?1)")?;
            for host in &ledger.unreachable {
                insert_unreachable.execute(params![host])?;
            }
        }

        tx.commit()?;
        tracing::trace!("Persisted visit ledger to SQLite");
        Ok(())
    }
}
