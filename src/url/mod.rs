//! URL handling module for Polite-Gate
//!
//! This module resolves the host key a URL is tracked under and recognizes
//! local URLs that bypass the gate entirely.

mod host;
mod local;

// Re-export main functions
pub use host::host_key;
pub use local::is_local;
