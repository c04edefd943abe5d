use url::{Host, Url};

/// Checks whether a URL points at the local machine
///
/// Local URLs are never subject to robots.txt, so the gate lets them through
/// without touching any state. A URL is local when it:
///
/// - uses the `file:` scheme,
/// - has `localhost` or a loopback address (`127.0.0.0/8`, `::1`) as its host, or
/// - is a bare, scheme-less reference starting with `localhost` or `127.0.0.1`.
///
/// # Examples
///
/// ```
/// use polite_gate::url::is_local;
///
/// assert!(is_local("http://localhost:8080/page"));
/// assert!(is_local("file:///tmp/index.html"));
/// assert!(!is_local("https://example.com/"));
/// ```
pub fn is_local(raw: &str) -> bool {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();

    if lower.starts_with("localhost") || lower.starts_with("127.0.0.1") {
        return true;
    }

    let Ok(url) = Url::parse(trimmed) else {
        return false;
    };

    if url.scheme() == "file" {
        return true;
    }

    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}
