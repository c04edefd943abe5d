use crate::state::HostRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Durable snapshot of everything the gate has learned
///
/// Serialized as `{ "hosts": { host: record }, "unreachable": [host, ...] }`.
/// Both fields are required; a document missing either one is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitLedger {
    /// Timing records for reachable hosts
    pub hosts: BTreeMap<String, HostRecord>,

    /// Hosts whose robots.txt could not be obtained
    pub unreachable: BTreeSet<String>,
}

impl VisitLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty() && self.unreachable.is_empty()
    }

    /// Removes timing records for hosts that are also marked unreachable
    ///
    /// A host is never both reachable and unreachable; unreachable wins.
    /// Returns how many records were dropped.
    pub fn reconcile(&mut self) -> usize {
        let before = self.hosts.len();
        let unreachable = &self.unreachable;
        self.hosts.retain(|host, _| !unreachable.contains(host));
        before - self.hosts.len()
    }
}
