//! Configuration module for Polite-Gate
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use polite_gate::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("polite-gate.toml")).unwrap();
//! println!("Gate will wait at most {}s per host", config.gate.max_wait_seconds);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, FetcherConfig, GateConfig, StoreBackend, UserAgentConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};
