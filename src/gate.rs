//! The politeness gate
//!
//! `PolitenessGate` answers one question per call: may this user agent fetch
//! this URL right now? Along the way it keeps every host on a cooldown derived
//! from the host's robots.txt crawl delay, gives up on hosts that cannot serve
//! a robots.txt or that want longer waits than the gate will tolerate, and
//! writes what it learned to its visit store before answering.
//!
//! # Host lifecycle
//!
//! ```text
//!              fetch ok                      (restart)
//!   NoInfo ─────────────▶ PolicyCached ─────────────────▶ VisitRecorded
//!      │                     ▲    │                           │
//!      │ fetch failed        │    └── too long (if demoting)  │ fetch ok
//!      ▼                     └────────────────────────────────┘
//!   Unreachable ◀──────────────── fetch failed / too long ────┘
//! ```

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::robots::{HttpPolicyFetcher, PolicyFetcher};
use crate::state::{Cooldown, HostEntry, HostRecord, HostStatus, VisitLedger};
use crate::storage::{open_store, VisitStore};
use crate::url::{host_key, is_local};
use crate::Result;
use std::collections::{BTreeSet, HashMap};

/// Default patience threshold in seconds
pub const DEFAULT_MAX_WAIT_SECONDS: u64 = 60;

/// Per-host robots.txt gate with cooldowns and durable state
///
/// One gate serves one caller at a time: `is_allowed` takes `&mut self`, so
/// sharing a gate between tasks requires the caller to wrap it in a mutex.
/// Independent gates (one per crawl job, one per test) do not interact unless
/// they share a store.
pub struct PolitenessGate<F, C = SystemClock> {
    fetcher: F,
    clock: C,
    store: Box<dyn VisitStore>,
    hosts: HashMap<String, HostEntry>,
    unreachable: BTreeSet<String>,
    max_wait_seconds: u64,
    demote_cached_hosts: bool,
}

impl PolitenessGate<HttpPolicyFetcher, SystemClock> {
    /// Builds a gate with an HTTP fetcher and the configured store
    ///
    /// # Arguments
    ///
    /// * `config` - The application configuration
    ///
    /// # Returns
    ///
    /// * `Ok(PolitenessGate)` - Gate with the stored ledger loaded
    /// * `Err(GateError)` - Failed to build the HTTP client or open the store
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = HttpPolicyFetcher::from_config(config)?;
        let store = open_store(&config.gate)?;

        Ok(Self::new(fetcher, store, SystemClock)?
            .with_max_wait_seconds(config.gate.max_wait_seconds)
            .with_demote_cached_hosts(config.gate.demote_cached_hosts))
    }
}

impl<F: PolicyFetcher, C: Clock> PolitenessGate<F, C> {
    /// Creates a gate and loads whatever the store holds
    ///
    /// Hosts recorded by a previous run start out as `VisitRecorded`: their
    /// cooldowns still apply, but their robots.txt is fetched again on first
    /// use.
    pub fn new(fetcher: F, store: Box<dyn VisitStore>, clock: C) -> Result<Self> {
        let mut ledger = store.load()?;

        let dropped = ledger.reconcile();
        if dropped > 0 {
            tracing::warn!(
                "Dropped {} host records that were also marked unreachable",
                dropped
            );
        }

        let hosts = ledger
            .hosts
            .into_iter()
            .map(|(host, record)| (host, HostEntry::from_record(record)))
            .collect();

        Ok(Self {
            fetcher,
            clock,
            store,
            hosts,
            unreachable: ledger.unreachable,
            max_wait_seconds: DEFAULT_MAX_WAIT_SECONDS,
            demote_cached_hosts: false,
        })
    }

    /// Sets the longest cooldown the gate will wait out
    pub fn with_max_wait_seconds(mut self, max_wait_seconds: u64) -> Self {
        self.max_wait_seconds = max_wait_seconds;
        self
    }

    /// Sets whether cached hosts demanding too long a wait become unreachable
    pub fn with_demote_cached_hosts(mut self, demote: bool) -> Self {
        self.demote_cached_hosts = demote;
        self
    }

    /// Decides whether `user_agent` may fetch `url`
    ///
    /// Local URLs are always allowed and leave no trace. For everything else
    /// the host's cooldown is honored first (waiting up to the patience
    /// threshold), robots.txt is fetched when none is loaded, and the host's
    /// visit time is advanced before the answer is returned.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The fetch is permitted
    /// * `Ok(false)` - robots.txt forbids it, the host is unreachable, or the
    ///   host's cooldown is longer than the gate will wait
    /// * `Err(GateError)` - The URL has no host, or the ledger could not be saved
    pub async fn is_allowed(&mut self, url: &str, user_agent: &str) -> Result<bool> {
        if is_local(url) {
            tracing::debug!("Allowing local URL {}", url);
            return Ok(true);
        }

        let host = host_key(url)?;

        if self.unreachable.contains(&host) {
            tracing::info!("Denied {}: {} is unreachable", url, host);
            return Ok(false);
        }

        let known = self
            .hosts
            .get(&host)
            .map(|entry| (entry.record, entry.policy.is_some()));

        match known {
            None => {
                tracing::debug!("No record for {}, fetching robots.txt", host);
            }
            Some((_, true)) => return self.check_cached(&host, url, user_agent).await,
            Some((record, false)) => {
                let remaining = record.remaining(self.clock.now());
                match Cooldown::decide(remaining, self.max_wait_seconds) {
                    Cooldown::Ready => {}
                    Cooldown::Wait(duration) => {
                        tracing::info!(
                            "Waiting {}s to reload robots.txt for {}",
                            duration.as_secs(),
                            host
                        );
                        self.clock.sleep(duration).await;
                    }
                    Cooldown::TooLong(remaining) => {
                        tracing::info!(
                            "Not waiting {}s to reload robots.txt for {}, giving up on host",
                            remaining,
                            host
                        );
                        self.mark_unreachable(&host)?;
                        return Ok(false);
                    }
                }
            }
        }

        if !self.refresh_policy(&host, user_agent).await? {
            return Ok(false);
        }

        self.check_cached(&host, url, user_agent).await
    }

    /// Lifecycle state of the host `url` belongs to
    pub fn status(&self, url: &str) -> Result<HostStatus> {
        Ok(self.host_status(&host_key(url)?))
    }

    /// Lifecycle state of a host key such as `https://example.com`
    pub fn host_status(&self, host: &str) -> HostStatus {
        if self.unreachable.contains(host) {
            HostStatus::Unreachable
        } else {
            self.hosts
                .get(host)
                .map_or(HostStatus::NoInfo, HostEntry::status)
        }
    }

    /// Timing record for a host key, if the host is reachable and known
    pub fn record(&self, host: &str) -> Option<HostRecord> {
        self.hosts.get(host).map(|entry| entry.record)
    }

    /// Snapshot of the durable state
    pub fn ledger(&self) -> VisitLedger {
        VisitLedger {
            hosts: self
                .hosts
                .iter()
                .map(|(host, entry)| (host.clone(), entry.record))
                .collect(),
            unreachable: self.unreachable.clone(),
        }
    }

    /// Clears the unreachable set so those hosts are tried again
    ///
    /// Returns how many hosts were forgiven.
    pub fn forget_unreachable(&mut self) -> Result<usize> {
        let count = self.unreachable.len();
        if count > 0 {
            self.unreachable.clear();
            self.persist()?;
            tracing::info!("Cleared {} unreachable hosts", count);
        }
        Ok(count)
    }

    /// Fetches robots.txt for a host and caches it
    ///
    /// Returns `false` (after marking the host unreachable) if the fetch failed.
    async fn refresh_policy(&mut self, host: &str, user_agent: &str) -> Result<bool> {
        let fetched = match self.fetcher.fetch_policy(host, user_agent).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::info!("Cannot get robots.txt for {}: {}", host, e);
                self.mark_unreachable(host)?;
                return Ok(false);
            }
        };

        tracing::info!(
            "Got robots.txt for {} (wait {}s)",
            host,
            fetched.wait_seconds
        );

        let previous_visit = self.hosts.get(host).map(|entry| entry.record.last_visit);
        let mut entry = HostEntry::fetched(self.clock.now(), fetched.wait_seconds, fetched.robots);
        if let Some(previous_visit) = previous_visit {
            entry.record.last_visit = entry.record.last_visit.max(previous_visit);
        }

        self.hosts.insert(host.to_string(), entry);
        self.persist()?;
        Ok(true)
    }

    /// Checks a URL against the cached robots.txt once the host's cooldown allows
    async fn check_cached(&mut self, host: &str, url: &str, user_agent: &str) -> Result<bool> {
        let Some(record) = self.record(host) else {
            return Ok(false);
        };

        match Cooldown::decide(record.remaining(self.clock.now()), self.max_wait_seconds) {
            Cooldown::Ready => {}
            Cooldown::Wait(duration) => {
                tracing::info!(
                    "Waiting {}s to check permission for {}",
                    duration.as_secs(),
                    url
                );
                self.clock.sleep(duration).await;
            }
            Cooldown::TooLong(remaining) => {
                tracing::info!("Not waiting {}s for {}", remaining, url);
                if self.demote_cached_hosts {
                    self.mark_unreachable(host)?;
                } else {
                    // A denial counts as a visit
                    let now = self.clock.now();
                    if let Some(entry) = self.hosts.get_mut(host) {
                        entry.record.touch(now);
                    }
                    self.persist()?;
                }
                return Ok(false);
            }
        }

        let now = self.clock.now();
        let Some(entry) = self.hosts.get_mut(host) else {
            return Ok(false);
        };

        let allowed = entry
            .policy
            .as_ref()
            .is_some_and(|robots| robots.is_allowed(url, user_agent));
        entry.record.touch(now);

        self.persist()?;

        tracing::debug!(
            "{} {} for {}",
            if allowed { "Allowed" } else { "Disallowed" },
            url,
            user_agent
        );
        Ok(allowed)
    }

    fn mark_unreachable(&mut self, host: &str) -> Result<()> {
        self.hosts.remove(host);
        self.unreachable.insert(host.to_string());
        self.persist()
    }

    fn persist(&mut self) -> Result<()> {
        let ledger = self.ledger();
        self.store.save(&ledger)?;
        Ok(())
    }
}
