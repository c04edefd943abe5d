use crate::robots::ParsedRobots;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Durable timing record for one host
///
/// Both fields survive restarts. `last_visit` is stamped one second into the
/// future whenever the host is fetched from or checked, so a check made in
/// the same second still counts the full wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRecord {
    /// Time of the last permitted or attempted fetch (epoch seconds)
    #[serde(rename = "lastVisitEpochSeconds")]
    pub last_visit: i64,

    /// Minimum delay before the host may be checked again
    pub wait_seconds: u64,
}

impl HostRecord {
    /// Creates a record for a host visited at `now`
    pub fn visited(now: i64, wait_seconds: u64) -> Self {
        Self {
            last_visit: now + 1,
            wait_seconds,
        }
    }

    /// Seconds still owed to the host before the next check
    ///
    /// Negative values mean the wait has already elapsed.
    pub fn remaining(&self, now: i64) -> i64 {
        let elapsed = (now - 1).saturating_sub(self.last_visit);
        i64::try_from(self.wait_seconds)
            .unwrap_or(i64::MAX)
            .saturating_sub(elapsed)
    }

    /// Records a visit at `now`
    ///
    /// The timestamp never moves backwards, even if the clock does.
    pub fn touch(&mut self, now: i64) {
        self.last_visit = self.last_visit.max(now + 1);
    }
}

/// Everything the gate knows about a host it can reach
///
/// The timing record is the single source of truth for both the durable
/// ledger and the in-memory cache; the parsed robots.txt rides along only
/// while the process is alive.
#[derive(Debug, Clone)]
pub struct HostEntry {
    pub record: HostRecord,
    pub policy: Option<ParsedRobots>,
}

impl HostEntry {
    /// An entry restored from the durable ledger, with no policy loaded yet
    pub fn from_record(record: HostRecord) -> Self {
        Self {
            record,
            policy: None,
        }
    }

    /// An entry for a freshly fetched policy
    pub fn fetched(now: i64, wait_seconds: u64, policy: ParsedRobots) -> Self {
        Self {
            record: HostRecord::visited(now, wait_seconds),
            policy: Some(policy),
        }
    }

    pub fn status(&self) -> HostStatus {
        if self.policy.is_some() {
            HostStatus::PolicyCached
        } else {
            HostStatus::VisitRecorded
        }
    }
}

/// Lifecycle state of a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostStatus {
    /// Never seen by this gate or any previous run
    NoInfo,
    /// Timing is known from a previous run, but no robots.txt is loaded
    VisitRecorded,
    /// A parsed robots.txt is loaded in memory
    PolicyCached,
    /// robots.txt could not be obtained; always denied
    Unreachable,
}

impl HostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoInfo => "no-info",
            Self::VisitRecorded => "visit-recorded",
            Self::PolicyCached => "policy-cached",
            Self::Unreachable => "unreachable",
        }
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision about the time still owed to a host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cooldown {
    /// Nothing owed; proceed immediately
    Ready,
    /// Wait this long, then proceed
    Wait(Duration),
    /// The host wants more than the patience threshold; give up
    TooLong(i64),
}

impl Cooldown {
    /// Decides how to treat `remaining` seconds under a patience threshold
    ///
    /// | remaining                  | decision      |
    /// |----------------------------|---------------|
    /// | `<= 0`                     | `Ready`       |
    /// | `1 ..  max_wait_seconds`   | `Wait`        |
    /// | `>= max_wait_seconds`      | `TooLong`     |
    pub fn decide(remaining: i64, max_wait_seconds: u64) -> Self {
        let max_wait = i64::try_from(max_wait_seconds).unwrap_or(i64::MAX);

        if remaining >= max_wait {
            Self::TooLong(remaining)
        } else if remaining <= 0 {
            Self::Ready
        } else {
            Self::Wait(Duration::from_secs(remaining as u64))
        }
    }
}
