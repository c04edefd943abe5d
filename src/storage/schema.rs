//! Database schema definitions
//!
//! This module contains the SQL schema for the SQLite visit ledger.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Timing records for reachable hosts
CREATE TABLE IF NOT EXISTS hosts (
    host TEXT PRIMARY KEY,
    last_visit INTEGER NOT NULL,
    wait_seconds INTEGER NOT NULL
);

-- Hosts whose robots.txt could not be obtained
CREATE TABLE IF NOT EXISTS unreachable (
    host TEXT PRIMARY KEY
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
