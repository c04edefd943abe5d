//! Time source for the gate
//!
//! The gate reads wall-clock time in whole epoch seconds and waits out host
//! cooldowns through a [`Clock`]. Production code uses [`SystemClock`]; tests
//! drive a [`ManualClock`] so cooldowns resolve instantly and deterministically.

use chrono::Utc;
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Source of the current time and of cooldown waits
pub trait Clock {
    /// Current time in whole seconds since the Unix epoch
    fn now(&self) -> i64;

    /// Suspends the caller for the given duration
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Wall-clock time with tokio timers
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// Virtual clock whose time only moves when told to
///
/// `sleep` returns immediately after advancing the virtual time by the
/// requested duration and recording it. Clones share the same time and sleep
/// log, so a test can keep a handle while the gate owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl ManualClock {
    /// Creates a clock frozen at the given epoch second
    pub fn new(now: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(now)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Moves the clock forward without recording a sleep
    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }

    /// Sets the clock to an absolute epoch second
    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .map(|sleeps| sleeps.clone())
            .unwrap_or_default()
    }

    /// Total time spent sleeping
    pub fn total_slept(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
        self.advance(duration.as_secs() as i64);
        std::future::ready(())
    }
}
