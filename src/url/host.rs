use crate::{UrlError, UrlResult};
use url::Url;

/// Resolves the host key a URL is tracked under
///
/// The key is the URL's scheme and lowercase hostname joined by `://`.
/// Ports, paths, queries and fragments are dropped, so every URL on the same
/// host shares one politeness record.
///
/// # Arguments
///
/// * `raw` - The URL to resolve
///
/// # Returns
///
/// * `Ok(String)` - The host key, e.g. `https://example.com`
/// * `Err(UrlError)` - The URL could not be parsed or has no host
///
/// # Examples
///
/// ```
/// use polite_gate::url::host_key;
///
/// assert_eq!(host_key("https://Example.COM/path?q=1").unwrap(), "https://example.com");
/// assert_eq!(host_key("http://example.com:8080/").unwrap(), "http://example.com");
/// ```
pub fn host_key(raw: &str) -> UrlResult<String> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| UrlError::MissingDomain(raw.to_string()))?;

    Ok(format!("{}://{}", url.scheme(), host.to_lowercase()))
}
