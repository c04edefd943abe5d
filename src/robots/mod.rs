//! Robots.txt handling module
//!
//! This module provides functionality for fetching and parsing robots.txt files,
//! and for turning a published crawl delay into the wait the gate enforces.

mod fetcher;
mod parser;

pub use fetcher::{build_http_client, HttpPolicyFetcher};
pub use parser::ParsedRobots;

use std::future::Future;
use thiserror::Error;

/// Extra seconds added to every host's crawl delay
pub const DEFAULT_BUFFER_SECONDS: u64 = 10;

/// Errors that prevent a robots.txt from being obtained
///
/// The gate does not distinguish between these: any of them marks the host
/// unreachable for the session.
#[derive(Debug, Error)]
pub enum RobotsError {
    #[error("Failed to fetch {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("Failed to read body of {url}: {source}")]
    Body { url: String, source: reqwest::Error },

    #[error("robots.txt unavailable at {url}: {reason}")]
    Unavailable { url: String, reason: String },
}

/// A freshly fetched robots.txt and the wait it implies
#[derive(Debug, Clone)]
pub struct FetchedPolicy {
    /// The parsed robots.txt
    pub robots: ParsedRobots,

    /// Crawl delay for the requesting agent plus the buffer
    pub wait_seconds: u64,
}

/// Source of robots.txt documents
///
/// Implementations fetch `host + "/robots.txt"`, parse it, and report the wait
/// the host asks of `user_agent` (see [`policy_wait_seconds`]).
pub trait PolicyFetcher {
    /// Fetches and parses the robots.txt for a host key such as `https://example.com`
    fn fetch_policy(
        &self,
        host: &str,
        user_agent: &str,
    ) -> impl Future<Output = Result<FetchedPolicy, RobotsError>> + Send;
}

/// Builds the robots.txt URL for a host key
///
/// # Examples
///
/// ```
/// use polite_gate::robots::robots_url;
///
/// assert_eq!(robots_url("https://example.com"), "https://example.com/robots.txt");
/// ```
pub fn robots_url(host: &str) -> String {
    format!("{}/robots.txt", host.trim_end_matches('/'))
}

/// Computes the wait a host asks for
///
/// A published crawl delay is truncated to whole seconds and increased by
/// `buffer_seconds`; without one, the buffer alone applies. Negative or
/// non-numeric delays count as none.
///
/// # Examples
///
/// ```
/// use polite_gate::robots::policy_wait_seconds;
///
/// assert_eq!(policy_wait_seconds(None, 10), 10);
/// assert_eq!(policy_wait_seconds(Some(5.0), 10), 15);
/// assert_eq!(policy_wait_seconds(Some(2.5), 10), 12);
/// ```
pub fn policy_wait_seconds(crawl_delay: Option<f64>, buffer_seconds: u64) -> u64 {
    match crawl_delay {
        Some(delay) if delay.is_finite() && delay > 0.0 => {
            (delay.trunc() as u64).saturating_add(buffer_seconds)
        }
        _ => buffer_seconds,
    }
}
