//! Integration tests for the politeness gate
//!
//! These tests drive the gate with a virtual clock and a scripted robots.txt
//! source, so every cooldown resolves instantly and every fetch is counted.

use polite_gate::robots::{
    policy_wait_seconds, robots_url, FetchedPolicy, ParsedRobots, PolicyFetcher, RobotsError,
};
use polite_gate::state::{HostRecord, HostStatus, VisitLedger};
use polite_gate::storage::{JsonFileStore, MemoryStore, SqliteStore};
use polite_gate::{Clock, GateError, ManualClock, PolitenessGate};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const NOW: i64 = 1_700_000_000;
const BUFFER: u64 = 10;
const AGENT: &str = "TestBot";

/// Serves canned robots.txt documents; hosts without one fail to fetch
#[derive(Clone, Default)]
struct ScriptedFetcher {
    documents: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedFetcher {
    fn new() -> Self {
        Self::default()
    }

    fn serve(self, host: &str, robots_txt: &str) -> Self {
        self.documents
            .lock()
            .unwrap()
            .insert(host.to_string(), robots_txt.to_string());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PolicyFetcher for ScriptedFetcher {
    async fn fetch_policy(
        &self,
        host: &str,
        user_agent: &str,
    ) -> Result<FetchedPolicy, RobotsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let document = self.documents.lock().unwrap().get(host).cloned();
        match document {
            Some(content) => {
                let robots = ParsedRobots::from_content(&content);
                let wait_seconds = policy_wait_seconds(robots.crawl_delay(user_agent), BUFFER);
                Ok(FetchedPolicy {
                    robots,
                    wait_seconds,
                })
            }
            None => Err(RobotsError::Unavailable {
                url: robots_url(host),
                reason: "connection refused".to_string(),
            }),
        }
    }
}

struct Harness {
    gate: PolitenessGate<ScriptedFetcher, ManualClock>,
    fetcher: ScriptedFetcher,
    clock: ManualClock,
    store: MemoryStore,
}

fn harness(fetcher: ScriptedFetcher, store: MemoryStore) -> Harness {
    let clock = ManualClock::new(NOW);
    let gate = PolitenessGate::new(fetcher.clone(), Box::new(store.clone()), clock.clone())
        .expect("Failed to create gate");
    Harness {
        gate,
        fetcher,
        clock,
        store,
    }
}

fn ledger_with_record(host: &str, last_visit: i64, wait_seconds: u64) -> VisitLedger {
    let mut ledger = VisitLedger::new();
    ledger.hosts.insert(
        host.to_string(),
        HostRecord {
            last_visit,
            wait_seconds,
        },
    );
    ledger
}

fn secs(values: &[u64]) -> Vec<Duration> {
    values.iter().map(|s| Duration::from_secs(*s)).collect()
}

// ===== Local URLs =====

#[tokio::test]
async fn test_local_urls_are_allowed_without_side_effects() {
    let mut h = harness(ScriptedFetcher::new(), MemoryStore::new());

    for url in [
        "http://localhost:8080/admin",
        "http://127.0.0.1/anything",
        "http://[::1]:3000/",
        "file:///home/user/page.html",
        "localhost/page",
    ] {
        assert!(h.gate.is_allowed(url, AGENT).await.unwrap(), "{}", url);
    }

    assert_eq!(h.fetcher.calls(), 0);
    assert_eq!(h.store.save_count(), 0);
    assert!(h.gate.ledger().is_empty());
    assert!(h.clock.sleeps().is_empty());
}

// ===== Unreachable hosts =====

#[tokio::test]
async fn test_unreachable_host_is_denied_without_fetching() {
    let mut ledger = VisitLedger::new();
    ledger.unreachable.insert("https://down.example".to_string());

    let fetcher = ScriptedFetcher::new().serve("https://down.example", "User-agent: *\nAllow: /");
    let mut h = harness(fetcher, MemoryStore::with_ledger(ledger));

    assert!(!h
        .gate
        .is_allowed("https://down.example/page", AGENT)
        .await
        .unwrap());
    assert!(!h
        .gate
        .is_allowed("https://down.example/other", "OtherBot")
        .await
        .unwrap());

    assert_eq!(h.fetcher.calls(), 0);
    assert_eq!(h.store.save_count(), 0);
}

#[tokio::test]
async fn test_failed_fetch_marks_host_unreachable_for_good() {
    let mut h = harness(ScriptedFetcher::new(), MemoryStore::new());

    assert!(!h
        .gate
        .is_allowed("https://nothing.example/", AGENT)
        .await
        .unwrap());
    assert_eq!(
        h.gate.host_status("https://nothing.example"),
        HostStatus::Unreachable
    );

    // Even once a robots.txt appears, the host stays unreachable this session
    h.fetcher
        .documents
        .lock()
        .unwrap()
        .insert("https://nothing.example".to_string(), String::new());
    h.clock.advance(3600);
    assert!(!h
        .gate
        .is_allowed("https://nothing.example/", AGENT)
        .await
        .unwrap());

    assert_eq!(h.fetcher.calls(), 1);
    let saved = h.store.snapshot();
    assert!(saved.unreachable.contains("https://nothing.example"));
    assert!(!saved.hosts.contains_key("https://nothing.example"));
}

// ===== New hosts =====

#[tokio::test]
async fn test_new_host_without_crawl_delay_waits_buffer() {
    let fetcher =
        ScriptedFetcher::new().serve("https://example.com", "User-agent: *\nDisallow: /private");
    let mut h = harness(fetcher, MemoryStore::new());

    assert!(h
        .gate
        .is_allowed("https://example.com/page", AGENT)
        .await
        .unwrap());

    let record = h.gate.record("https://example.com").unwrap();
    assert_eq!(record.wait_seconds, BUFFER);
    assert_eq!(h.fetcher.calls(), 1);
    assert_eq!(
        h.gate.host_status("https://example.com"),
        HostStatus::PolicyCached
    );

    // Fetched at NOW (stamped NOW + 1), so the check owes 10 - (NOW - 1 - (NOW + 1)) = 12s
    assert_eq!(h.clock.sleeps(), secs(&[12]));
    assert_eq!(record.last_visit, NOW + 12 + 1);
}

#[tokio::test]
async fn test_new_host_with_crawl_delay_adds_buffer() {
    let fetcher = ScriptedFetcher::new().serve(
        "https://example.com",
        "User-agent: *\nCrawl-delay: 5\nDisallow: /private",
    );
    let mut h = harness(fetcher, MemoryStore::new());

    assert!(!h
        .gate
        .is_allowed("https://example.com/private/data", AGENT)
        .await
        .unwrap());

    assert_eq!(h.gate.record("https://example.com").unwrap().wait_seconds, 15);
    assert_eq!(h.clock.sleeps(), secs(&[17]));
}

#[tokio::test]
async fn test_every_mutation_is_persisted() {
    let fetcher = ScriptedFetcher::new().serve("https://example.com", "User-agent: *\nAllow: /");
    let mut h = harness(fetcher, MemoryStore::new());

    h.gate
        .is_allowed("https://example.com/", AGENT)
        .await
        .unwrap();

    // Once after the fetch, once after the permission check
    assert_eq!(h.store.save_count(), 2);
    assert_eq!(h.store.snapshot(), h.gate.ledger());
}

// ===== Cached policies =====

#[tokio::test]
async fn test_second_call_waits_out_cooldown_without_refetching() {
    let fetcher = ScriptedFetcher::new().serve(
        "https://example.com",
        "User-agent: *\nCrawl-delay: 5\nDisallow: /private",
    );
    let mut h = harness(fetcher, MemoryStore::new());

    assert!(h
        .gate
        .is_allowed("https://example.com/a", AGENT)
        .await
        .unwrap());
    assert!(!h
        .gate
        .is_allowed("https://example.com/private/b", AGENT)
        .await
        .unwrap());

    assert_eq!(h.fetcher.calls(), 1);
    // The second check waits the full 15s wait plus the 2s stamp margin again
    assert_eq!(h.clock.sleeps(), secs(&[17, 17]));
}

#[tokio::test]
async fn test_elapsed_cooldown_checks_immediately() {
    let fetcher = ScriptedFetcher::new().serve("https://example.com", "User-agent: *\nAllow: /");
    let mut h = harness(fetcher, MemoryStore::new());

    h.gate
        .is_allowed("https://example.com/a", AGENT)
        .await
        .unwrap();
    h.clock.advance(600);

    assert!(h
        .gate
        .is_allowed("https://example.com/b", AGENT)
        .await
        .unwrap());
    assert_eq!(h.clock.sleeps().len(), 1);
    assert_eq!(h.fetcher.calls(), 1);
}

#[tokio::test]
async fn test_zero_remaining_does_not_sleep() {
    let fetcher = ScriptedFetcher::new().serve("https://example.com", "User-agent: *\nAllow: /");
    let mut h = harness(fetcher, MemoryStore::new());

    h.gate
        .is_allowed("https://example.com/a", AGENT)
        .await
        .unwrap();
    let record = h.gate.record("https://example.com").unwrap();

    // remaining = wait - (now - 1 - last_visit) = 0
    h.clock.set(record.last_visit + 1 + record.wait_seconds as i64);
    assert!(h
        .gate
        .is_allowed("https://example.com/b", AGENT)
        .await
        .unwrap());

    assert_eq!(h.clock.sleeps().len(), 1);
    assert_eq!(h.fetcher.calls(), 1);
}

#[tokio::test]
async fn test_cached_host_rules_apply_per_agent() {
    let fetcher = ScriptedFetcher::new().serve(
        "https://example.com",
        "User-agent: BadBot\nDisallow: /\n\nUser-agent: *\nAllow: /",
    );
    let mut h = harness(fetcher, MemoryStore::new());

    assert!(!h
        .gate
        .is_allowed("https://example.com/page", "BadBot/1.0")
        .await
        .unwrap());
    assert!(h
        .gate
        .is_allowed("https://example.com/page", "GoodBot/1.0")
        .await
        .unwrap());
    assert_eq!(h.fetcher.calls(), 1);
}

#[tokio::test]
async fn test_last_visit_never_decreases() {
    let fetcher = ScriptedFetcher::new().serve("https://example.com", "User-agent: *\nAllow: /");
    let mut h = harness(fetcher, MemoryStore::new());

    let mut previous = i64::MIN;
    for step in 0..5 {
        h.gate
            .is_allowed(&format!("https://example.com/{}", step), AGENT)
            .await
            .unwrap();
        let last_visit = h.gate.record("https://example.com").unwrap().last_visit;
        assert!(last_visit >= previous);
        previous = last_visit;
    }

    // A clock that jumps backwards does not drag the record with it
    h.clock.set(NOW - 10_000);
    h.gate
        .is_allowed("https://example.com/late", AGENT)
        .await
        .unwrap();
    assert!(h.gate.record("https://example.com").unwrap().last_visit >= previous);
}

#[tokio::test]
async fn test_cached_host_with_long_wait_is_denied_but_kept() {
    // 55s crawl delay + 10s buffer = 65s, past the 60s patience threshold
    let fetcher = ScriptedFetcher::new().serve(
        "https://slow.example",
        "User-agent: *\nCrawl-delay: 55\nAllow: /",
    );
    let mut h = harness(fetcher, MemoryStore::new());

    assert!(!h
        .gate
        .is_allowed("https://slow.example/a", AGENT)
        .await
        .unwrap());

    // remaining = 65 - (NOW + 4 - (NOW + 1)) = 62
    h.clock.advance(5);
    assert!(!h
        .gate
        .is_allowed("https://slow.example/b", AGENT)
        .await
        .unwrap());

    assert_eq!(
        h.gate.host_status("https://slow.example"),
        HostStatus::PolicyCached
    );
    assert_eq!(h.fetcher.calls(), 1);
    assert!(h.clock.sleeps().is_empty());
    // The denial is stamped as a visit and persisted
    assert_eq!(
        h.gate.record("https://slow.example").unwrap().last_visit,
        NOW + 6
    );
    assert_eq!(
        h.store.snapshot().hosts["https://slow.example"].last_visit,
        NOW + 6
    );

    // Once the cooldown has passed, the cached policy answers
    h.clock.advance(70);
    assert!(h
        .gate
        .is_allowed("https://slow.example/c", AGENT)
        .await
        .unwrap());
    assert_eq!(h.fetcher.calls(), 1);
}

#[tokio::test]
async fn test_cached_host_polled_inside_window_stays_denied() {
    let fetcher = ScriptedFetcher::new().serve(
        "https://slow.example",
        "User-agent: *\nCrawl-delay: 55\nAllow: /",
    );
    let mut h = harness(fetcher, MemoryStore::new());

    // Every call 5s after the last one finds 65 - (5 - 2) = 62s remaining
    for step in 0..10 {
        assert!(
            !h.gate
                .is_allowed(&format!("https://slow.example/{}", step), AGENT)
                .await
                .unwrap(),
            "call {} was allowed",
            step
        );
        h.clock.advance(5);
    }

    assert!(h.clock.sleeps().is_empty());
    assert_eq!(h.fetcher.calls(), 1);
    assert_eq!(
        h.gate.record("https://slow.example").unwrap().last_visit,
        NOW + 45 + 1
    );
}

#[tokio::test]
async fn test_cached_host_with_long_wait_is_demoted_when_configured() {
    let fetcher = ScriptedFetcher::new().serve(
        "https://slow.example",
        "User-agent: *\nCrawl-delay: 55\nAllow: /",
    );
    let store = MemoryStore::new();
    let clock = ManualClock::new(NOW);
    let mut gate = PolitenessGate::new(fetcher.clone(), Box::new(store.clone()), clock.clone())
        .unwrap()
        .with_demote_cached_hosts(true);

    assert!(!gate
        .is_allowed("https://slow.example/a", AGENT)
        .await
        .unwrap());
    assert_eq!(
        gate.host_status("https://slow.example"),
        HostStatus::Unreachable
    );

    clock.advance(600);
    assert!(!gate
        .is_allowed("https://slow.example/b", AGENT)
        .await
        .unwrap());
    assert_eq!(fetcher.calls(), 1);
    assert!(store.snapshot().unreachable.contains("https://slow.example"));
}

#[tokio::test]
async fn test_custom_patience_threshold() {
    let fetcher = ScriptedFetcher::new().serve("https://example.com", "User-agent: *\nAllow: /");
    let clock = ManualClock::new(NOW);
    let mut gate = PolitenessGate::new(fetcher, Box::new(MemoryStore::new()), clock.clone())
        .unwrap()
        .with_max_wait_seconds(5);

    // The 12s post-fetch cooldown already exceeds a 5s threshold
    assert!(!gate
        .is_allowed("https://example.com/", AGENT)
        .await
        .unwrap());
    assert!(clock.sleeps().is_empty());
}

// ===== Hosts recorded by a previous run =====

#[tokio::test]
async fn test_recorded_host_waits_then_refetches() {
    // remaining = 10 - (NOW - 1 - (NOW - 5)) = 6
    let ledger = ledger_with_record("https://example.com", NOW - 5, 10);
    let fetcher = ScriptedFetcher::new().serve("https://example.com", "User-agent: *\nAllow: /");
    let mut h = harness(fetcher, MemoryStore::with_ledger(ledger));

    assert_eq!(
        h.gate.host_status("https://example.com"),
        HostStatus::VisitRecorded
    );
    assert!(h
        .gate
        .is_allowed("https://example.com/page", AGENT)
        .await
        .unwrap());

    assert_eq!(h.fetcher.calls(), 1);
    assert_eq!(h.clock.sleeps(), secs(&[6, 12]));
    assert_eq!(
        h.gate.host_status("https://example.com"),
        HostStatus::PolicyCached
    );
}

#[tokio::test]
async fn test_recorded_host_past_cooldown_refetches_immediately() {
    let ledger = ledger_with_record("https://example.com", NOW - 500, 10);
    let fetcher = ScriptedFetcher::new().serve(
        "https://example.com",
        "User-agent: *\nCrawl-delay: 3\nAllow: /",
    );
    let mut h = harness(fetcher, MemoryStore::with_ledger(ledger));

    assert!(h
        .gate
        .is_allowed("https://example.com/page", AGENT)
        .await
        .unwrap());

    // Only the post-fetch cooldown; the refetched wait replaces the stored one
    assert_eq!(h.clock.sleeps(), secs(&[15]));
    assert_eq!(h.gate.record("https://example.com").unwrap().wait_seconds, 13);
}

#[tokio::test]
async fn test_recorded_host_with_excessive_wait_is_abandoned() {
    // remaining = 118 - (NOW - 1 - (NOW + 1)) = 120, past the 60s threshold
    let ledger = ledger_with_record("https://slow.example", NOW + 1, 118);
    let fetcher = ScriptedFetcher::new().serve("https://slow.example", "User-agent: *\nAllow: /");
    let mut h = harness(fetcher, MemoryStore::with_ledger(ledger));

    assert!(!h
        .gate
        .is_allowed("https://slow.example/a", AGENT)
        .await
        .unwrap());
    assert_eq!(
        h.gate.host_status("https://slow.example"),
        HostStatus::Unreachable
    );

    let saved = h.store.snapshot();
    assert!(saved.unreachable.contains("https://slow.example"));
    assert!(!saved.hosts.contains_key("https://slow.example"));

    // A later call is denied without any fetch
    assert!(!h
        .gate
        .is_allowed("https://slow.example/b", AGENT)
        .await
        .unwrap());
    assert_eq!(h.fetcher.calls(), 0);
    assert!(h.clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_recorded_host_failing_refetch_becomes_unreachable() {
    let ledger = ledger_with_record("https://gone.example", NOW - 500, 10);
    let mut h = harness(ScriptedFetcher::new(), MemoryStore::with_ledger(ledger));

    assert!(!h
        .gate
        .is_allowed("https://gone.example/", AGENT)
        .await
        .unwrap());
    assert_eq!(
        h.gate.host_status("https://gone.example"),
        HostStatus::Unreachable
    );
    assert!(h.gate.record("https://gone.example").is_none());
}

// ===== Persistence =====

#[tokio::test]
async fn test_json_ledger_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("visits.json");
    let fetcher = ScriptedFetcher::new().serve(
        "https://example.com",
        "User-agent: *\nCrawl-delay: 2\nAllow: /",
    );

    let before = {
        let mut gate = PolitenessGate::new(
            fetcher.clone(),
            Box::new(JsonFileStore::new(&path)),
            ManualClock::new(NOW),
        )
        .unwrap();
        gate.is_allowed("https://example.com/", AGENT)
            .await
            .unwrap();
        gate.is_allowed("https://down.example/", AGENT)
            .await
            .unwrap();
        gate.ledger()
    };

    let gate = PolitenessGate::new(
        fetcher,
        Box::new(JsonFileStore::new(&path)),
        ManualClock::new(NOW),
    )
    .unwrap();

    assert_eq!(gate.ledger(), before);
    assert_eq!(
        gate.host_status("https://example.com"),
        HostStatus::VisitRecorded
    );
    assert_eq!(
        gate.host_status("https://down.example"),
        HostStatus::Unreachable
    );
}

#[tokio::test]
async fn test_sqlite_ledger_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("visits.db");
    let fetcher = ScriptedFetcher::new().serve("https://example.com", "User-agent: *\nAllow: /");

    let before = {
        let mut gate = PolitenessGate::new(
            fetcher.clone(),
            Box::new(SqliteStore::new(&path).unwrap()),
            ManualClock::new(NOW),
        )
        .unwrap();
        gate.is_allowed("https://example.com/", AGENT)
            .await
            .unwrap();
        gate.is_allowed("https://down.example/", AGENT)
            .await
            .unwrap();
        gate.ledger()
    };

    let gate = PolitenessGate::new(
        fetcher,
        Box::new(SqliteStore::new(&path).unwrap()),
        ManualClock::new(NOW),
    )
    .unwrap();

    assert_eq!(gate.ledger(), before);
}

#[tokio::test]
async fn test_restart_keeps_cooldown() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("visits.json");
    let fetcher = ScriptedFetcher::new().serve("https://example.com", "User-agent: *\nAllow: /");

    let clock = ManualClock::new(NOW);
    {
        let mut gate = PolitenessGate::new(
            fetcher.clone(),
            Box::new(JsonFileStore::new(&path)),
            clock.clone(),
        )
        .unwrap();
        gate.is_allowed("https://example.com/", AGENT)
            .await
            .unwrap();
    }

    // New process a moment later: the robots.txt is refetched only after the
    // remaining cooldown, and the check then waits the fresh cooldown
    let restarted = ManualClock::new(clock.now());
    let mut gate = PolitenessGate::new(
        fetcher.clone(),
        Box::new(JsonFileStore::new(&path)),
        restarted.clone(),
    )
    .unwrap();
    assert!(gate
        .is_allowed("https://example.com/again", AGENT)
        .await
        .unwrap());

    assert_eq!(restarted.sleeps(), secs(&[12, 12]));
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_persistence_failure_is_reported() {
    let fetcher = ScriptedFetcher::new().serve("https://example.com", "User-agent: *\nAllow: /");
    let h = harness(fetcher, MemoryStore::new());
    let mut gate = h.gate;
    h.store.reject_saves(true);

    let result = gate.is_allowed("https://example.com/", AGENT).await;
    assert!(matches!(result, Err(GateError::Storage(_))));
}

#[tokio::test]
async fn test_invalid_url_is_an_error() {
    let mut h = harness(ScriptedFetcher::new(), MemoryStore::new());

    assert!(matches!(
        h.gate.is_allowed("definitely not a url", AGENT).await,
        Err(GateError::Url(_))
    ));
    assert_eq!(h.fetcher.calls(), 0);
    assert_eq!(h.store.save_count(), 0);
}

#[tokio::test]
async fn test_gates_are_independent() {
    let fetcher = ScriptedFetcher::new().serve("https://example.com", "User-agent: *\nAllow: /");
    let mut first = harness(fetcher.clone(), MemoryStore::new());
    let second = harness(fetcher, MemoryStore::new());

    first
        .gate
        .is_allowed("https://example.com/", AGENT)
        .await
        .unwrap();

    assert_eq!(
        first.gate.host_status("https://example.com"),
        HostStatus::PolicyCached
    );
    assert_eq!(
        second.gate.host_status("https://example.com"),
        HostStatus::NoInfo
    );
    assert_eq!(second.store.save_count(), 0);
}

#[tokio::test]
async fn test_forgotten_hosts_are_tried_again() {
    let mut ledger = VisitLedger::new();
    ledger.unreachable.insert("https://example.com".to_string());
    let fetcher = ScriptedFetcher::new().serve("https://example.com", "User-agent: *\nAllow: /");
    let mut h = harness(fetcher, MemoryStore::with_ledger(ledger));

    assert!(!h
        .gate
        .is_allowed("https://example.com/", AGENT)
        .await
        .unwrap());
    assert_eq!(h.gate.forget_unreachable().unwrap(), 1);
    assert!(h
        .gate
        .is_allowed("https://example.com/", AGENT)
        .await
        .unwrap());
    assert_eq!(h.fetcher.calls(), 1);
}
