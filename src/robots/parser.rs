//! robots.txt policy documents
//!
//! Allow/disallow matching is delegated to the `robotstxt` crate. Crawl delays
//! are read by the group-aware scanner in [`ParsedRobots::crawl_delay`].

use robotstxt::DefaultMatcher;

/// What a robots.txt says, or what the gate assumes in its absence
#[derive(Debug, Clone, PartialEq, Eq)]
enum Rules {
    /// No restrictions (e.g. robots.txt answered 404)
    AllowAll,
    /// Everything forbidden (e.g. robots.txt answered 401, 403 or 5xx)
    DisallowAll,
    /// A real robots.txt document
    Document(String),
}

/// A host's robots.txt policy
///
/// Either a real document or one of the blanket policies the fetcher
/// substitutes when the server answers with an error status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRobots {
    rules: Rules,
}

impl ParsedRobots {
    /// Wraps a robots.txt document
    ///
    /// Any text is accepted; lines the matcher does not understand are
    /// ignored, so garbage behaves like an empty file and allows everything.
    pub fn from_content(content: &str) -> Self {
        Self {
            rules: Rules::Document(content.to_string()),
        }
    }

    /// A policy that allows every URL
    pub fn allow_all() -> Self {
        Self {
            rules: Rules::AllowAll,
        }
    }

    /// A policy that forbids every URL
    pub fn disallow_all() -> Self {
        Self {
            rules: Rules::DisallowAll,
        }
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - The URL, or URL path, to check (e.g., "https://example.com/page.html" or "/page.html")
    /// * `user_agent` - The user agent string; only its product token is matched
    ///
    /// # Returns
    ///
    /// * `true` - If the URL is allowed
    /// * `false` - If the URL is disallowed
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        let content = match &self.rules {
            Rules::AllowAll => return true,
            Rules::DisallowAll => return false,
            Rules::Document(content) => content,
        };

        if content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(content, product_token(user_agent), url)
    }

    /// Gets the crawl delay for a specific user agent
    ///
    /// A group naming the agent wins over the `*` group; within each kind the
    /// first matching group wins.
    ///
    /// # Returns
    ///
    /// * `Some(f64)` - The crawl delay in seconds
    /// * `None` - If no crawl delay is specified
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        let Rules::Document(content) = &self.rules else {
            return None;
        };

        let token = product_token(user_agent).to_lowercase();

        let mut group: Vec<String> = Vec::new();
        let mut reading_agents = false;
        let mut delay_for_agent: Option<f64> = None;
        let mut delay_for_wildcard: Option<f64> = None;

        for line in content.lines() {
            // Strip trailing comments
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            if key == "user-agent" {
                // Consecutive User-agent lines share one group
                if !reading_agents {
                    group.clear();
                }
                group.push(value.to_lowercase());
                reading_agents = true;
                continue;
            }
            reading_agents = false;

            if key != "crawl-delay" {
                continue;
            }
            let Ok(delay) = value.parse::<f64>() else {
                continue;
            };

            let names_agent = group
                .iter()
                .any(|ua| !ua.is_empty() && ua != "*" && token.contains(ua.as_str()));
            if names_agent {
                delay_for_agent.get_or_insert(delay);
            } else if group.iter().any(|ua| ua == "*") {
                delay_for_wildcard.get_or_insert(delay);
            }
        }

        delay_for_agent.or(delay_for_wildcard)
    }
}

/// Extracts the product token of a user agent, e.g. `PoliteBot` from `PoliteBot/1.0 (+https://...)`
fn product_token(user_agent: &str) -> &str {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .find(|part| !part.is_empty())
        .unwrap_or("")
}
