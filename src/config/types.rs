use serde::Deserialize;

/// Main configuration structure for Polite-Gate
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub gate: GateConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
}

/// Gate behavior and persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    /// Path to the visit ledger file
    #[serde(rename = "state-path")]
    pub state_path: String,

    /// Storage format of the visit ledger
    #[serde(default)]
    pub backend: StoreBackend,

    /// Seconds added to every published crawl delay
    #[serde(rename = "buffer-seconds", default = "default_buffer_seconds")]
    pub buffer_seconds: u64,

    /// Longest cooldown the gate will wait out before giving up on a host
    #[serde(rename = "max-wait-seconds", default = "default_max_wait_seconds")]
    pub max_wait_seconds: u64,

    /// Whether a host with a cached robots.txt that demands too long a wait
    /// is also marked unreachable, rather than only denied
    #[serde(rename = "demote-cached-hosts", default)]
    pub demote_cached_hosts: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            state_path: "./visits.json".to_string(),
            backend: StoreBackend::default(),
            buffer_seconds: default_buffer_seconds(),
            max_wait_seconds: default_max_wait_seconds(),
            demote_cached_hosts: false,
        }
    }
}

/// Visit ledger storage format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Json,
    Sqlite,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler; also the token matched against robots.txt groups
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// The User-Agent header sent with robots.txt requests
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// robots.txt request configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Overall timeout for one robots.txt request
    #[serde(rename = "timeout-seconds", default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Timeout for establishing the connection
    #[serde(
        rename = "connect-timeout-seconds",
        default = "default_connect_timeout_seconds"
    )]
    pub connect_timeout_seconds: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
        }
    }
}

fn default_buffer_seconds() -> u64 {
    crate::robots::DEFAULT_BUFFER_SECONDS
}

fn default_max_wait_seconds() -> u64 {
    60
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_connect_timeout_seconds() -> u64 {
    10
}
