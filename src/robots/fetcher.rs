//! HTTP robots.txt fetcher
//!
//! This module retrieves robots.txt documents over HTTP and maps response
//! codes onto policies:
//!
//! | Response                     | Policy                  |
//! |------------------------------|-------------------------|
//! | 2xx                          | Parse the body          |
//! | 401, 403                     | Disallow everything     |
//! | Other 4xx                    | Allow everything        |
//! | 5xx                          | Disallow everything     |
//! | Connect error, timeout, etc. | `RobotsError` (unreachable) |

use crate::config::{FetcherConfig, UserAgentConfig};
use crate::robots::{
    policy_wait_seconds, robots_url, FetchedPolicy, ParsedRobots, PolicyFetcher, RobotsError,
};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Builds an HTTP client for robots.txt requests
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `fetcher` - Timeouts for robots.txt requests
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use polite_gate::config::{FetcherConfig, UserAgentConfig};
/// use polite_gate::robots::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "PoliteBot".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&user_agent, &FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    fetcher: &FetcherConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(fetcher.timeout_seconds))
        .connect_timeout(Duration::from_secs(fetcher.connect_timeout_seconds))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches robots.txt over HTTP
#[derive(Debug, Clone)]
pub struct HttpPolicyFetcher {
    client: Client,
    buffer_seconds: u64,
}

impl HttpPolicyFetcher {
    /// Creates a fetcher around an existing client
    ///
    /// `buffer_seconds` is added to every crawl delay the fetcher reports.
    pub fn new(client: Client, buffer_seconds: u64) -> Self {
        Self {
            client,
            buffer_seconds,
        }
    }

    /// Creates a fetcher from the application configuration
    pub fn from_config(config: &crate::config::Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.user_agent, &config.fetcher)?;
        Ok(Self::new(client, config.gate.buffer_seconds))
    }
}

impl PolicyFetcher for HttpPolicyFetcher {
    async fn fetch_policy(
        &self,
        host: &str,
        user_agent: &str,
    ) -> Result<FetchedPolicy, RobotsError> {
        let url = robots_url(host);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| RobotsError::Network {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let robots = if status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|source| RobotsError::Body {
                    url: url.clone(),
                    source,
                })?;
            ParsedRobots::from_content(&body)
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::debug!("{} answered {}, disallowing everything", url, status);
            ParsedRobots::disallow_all()
        } else if status.is_client_error() {
            tracing::debug!("{} answered {}, allowing everything", url, status);
            ParsedRobots::allow_all()
        } else {
            tracing::debug!("{} answered {}, disallowing everything", url, status);
            ParsedRobots::disallow_all()
        };

        let wait_seconds = policy_wait_seconds(robots.crawl_delay(user_agent), self.buffer_seconds);

        Ok(FetchedPolicy {
            robots,
            wait_seconds,
        })
    }
}
