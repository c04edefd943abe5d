//! Polite-Gate: a robots.txt politeness gate for crawlers
//!
//! This crate decides whether a crawler may fetch a URL under the target host's
//! robots.txt, enforcing a minimum delay between requests to the same host and
//! remembering per-host timing across process restarts.

pub mod clock;
pub mod config;
pub mod gate;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Polite-Gate operations
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Missing host in URL: {0}")]
    MissingDomain(String),
}

/// Result type alias for Polite-Gate operations
pub type Result<T> = std::result::Result<T, GateError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use gate::PolitenessGate;
pub use robots::{FetchedPolicy, HttpPolicyFetcher, ParsedRobots, PolicyFetcher};
pub use state::{Cooldown, HostEntry, HostRecord, HostStatus, VisitLedger};
pub use storage::{JsonFileStore, MemoryStore, SqliteStore, VisitStore};
pub use url::{host_key, is_local};
