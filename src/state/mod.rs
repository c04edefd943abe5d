//! State module for per-host politeness tracking
//!
//! This module provides the records the gate keeps for every host it has seen.
//!
//! # Components
//!
//! - `HostRecord`: Durable timing for a host (last visit, required wait)
//! - `HostEntry`: A host record plus the parsed robots.txt, when one is loaded
//! - `HostStatus`: Which of the gate's lifecycle states a host is in
//! - `Cooldown`: What to do about the time still owed to a host
//! - `VisitLedger`: The durable snapshot of all host records and unreachable hosts

mod host_state;
mod ledger;

// Re-export main types
pub use host_state::{Cooldown, HostEntry, HostRecord, HostStatus};
pub use ledger::VisitLedger;
