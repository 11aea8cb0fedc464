//! Outbound target gating.
//!
//! The check is syntactic: it looks at the parsed hostname only and never
//! resolves DNS, so a public name pointing at a private address passes.
//! IPv6 literals are not classified.

use url::Url;

/// True when the relay must not call `raw_url`.
///
/// Unparseable URLs and URLs without a host are blocked.
pub fn is_blocked(raw_url: &str) -> bool {
    let Ok(url) = Url::parse(raw_url) else {
        return true;
    };
    match url.host_str() {
        Some(host) if !host.is_empty() => is_blocked_host(host),
        _ => true,
    }
}

/// Classify a hostname as it appears in a parsed URL.
pub fn is_blocked_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    if host == "localhost" || host.ends_with(".local") {
        return true;
    }

    host.starts_with("127.")
        || host.starts_with("10.")
        || host.starts_with("192.168.")
        || is_private_172(&host)
}

/// `172.16.*` through `172.31.*`.
fn is_private_172(host: &str) -> bool {
    let Some(rest) = host.strip_prefix("172.") else {
        return false;
    };
    let Some((second, _)) = rest.split_once('.') else {
        return false;
    };
    if second.len() != 2 || !second.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    matches!(second.parse::<u8>(), Ok(16..=31))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_targets_pass() {
        assert!(!is_blocked("https://example.com/api"));
        assert!(!is_blocked("http://93.184.216.34/"));
        assert!(!is_blocked("https://api.example.com:8443/v1?x=1"));
        assert!(!is_blocked("http://relay-target.test:8080/echo"));
    }

    #[test]
    fn localhost_variants_are_blocked() {
        assert!(is_blocked("http://localhost"));
        assert!(is_blocked("http://localhost:3000/api"));
        assert!(is_blocked("https://LOCALHOST/api"));
        assert!(is_blocked("http://printer.local/status"));
        assert!(is_blocked("http://NAS.LOCAL"));
    }

    #[test]
    fn private_ipv4_ranges_are_blocked() {
        assert!(is_blocked("http://127.0.0.1"));
        assert!(is_blocked("http://127.1.2.3:8080/test"));
        assert!(is_blocked("http://10.0.0.5/x"));
        assert!(is_blocked("http://192.168.1.1/admin"));
        assert!(is_blocked("http://172.16.0.1/"));
        assert!(is_blocked("http://172.31.255.255/"));
    }

    #[test]
    fn neighbours_of_private_ranges_pass() {
        assert!(!is_blocked("http://172.15.0.1/"));
        assert!(!is_blocked("http://172.32.0.1/"));
        assert!(!is_blocked("http://192.169.0.1/"));
        assert!(!is_blocked("http://11.0.0.1/"));
        assert!(!is_blocked("http://mylocalhost.com/"));
        assert!(!is_blocked("http://local.example.com/"));
    }

    #[test]
    fn numeric_host_spellings_are_normalized_first() {
        // WHATWG parsing turns these into dotted-quad 127.0.0.1.
        assert!(is_blocked("http://2130706433/"));
        assert!(is_blocked("http://0x7f.0.0.1/"));
        assert!(is_blocked("http://127.1/"));
    }

    #[test]
    fn unparseable_urls_fail_closed() {
        assert!(is_blocked(""));
        assert!(is_blocked("not a url"));
        assert!(is_blocked("/relative/path"));
        assert!(is_blocked("http://"));
        assert!(is_blocked("mailto:ops@example.com"));
    }

    #[test]
    fn blocked_domain_in_path_does_not_block() {
        assert!(!is_blocked("https://example.com/redirect?to=localhost"));
        assert!(!is_blocked("https://example.com/10.0.0.1"));
    }

    #[test]
    fn ipv6_literals_are_not_classified() {
        assert!(!is_blocked("http://[::1]/"));
        assert!(!is_blocked("http://[fd00::1]/"));
    }
}
