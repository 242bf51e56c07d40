//! Utility functions

use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;

pub fn mask_email(email: &str) -> String {
    if let Some(at_pos) = email.find('@') {
        let (local, domain) = email.split_at(at_pos);
        match local.chars().count() {
            0 => format!("***{}", domain),
            1 | 2 => format!("{}***{}", local.chars().take(1).collect::<String>(), domain),
            _ => format!("{}***{}", local.chars().take(2).collect::<String>(), domain),
        }
    } else {
        "***".to_string()
    }
}

/// Lower-cased ASCII alphanumerics of a display name, used as a mailbox local part.
pub fn mailbox_from_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// First `X-Forwarded-For` entry when present and parseable, otherwise the peer address.
pub fn client_ip(forwarded_for: Option<&str>, peer: Option<IpAddr>) -> Option<IpAddr> {
    forwarded_for
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .and_then(|first| first.parse::<IpAddr>().ok())
        .or(peer)
}

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("Invalid tag regex"));
static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n+").expect("Invalid blank line regex"));
static SUBDOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("Invalid subdomain regex")
});

/// Plain-text rendition of an HTML fragment.
pub fn strip_tags(html: &str) -> String {
    let text = TAG_RE.replace_all(html, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'");
    BLANK_LINES_RE.replace_all(text.trim(), "\n\n").into_owned()
}

pub fn is_valid_subdomain(value: &str) -> bool {
    SUBDOMAIN_RE.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("jane.doe@example.com"), "ja***@example.com");
        assert_eq!(mask_email("jo@example.com"), "j***@example.com");
        assert_eq!(mask_email("invalid"), "***");
    }

    #[test]
    fn test_mailbox_from_name() {
        assert_eq!(mailbox_from_name("Mary-Ann O'Neil"), "maryannoneil");
        assert_eq!(mailbox_from_name("  "), "");
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let peer: IpAddr = "10.0.0.9".parse().unwrap();
        let ip = client_ip(Some("203.0.113.7, 10.0.0.1"), Some(peer));
        assert_eq!(ip, Some("203.0.113.7".parse().unwrap()));
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let peer: IpAddr = "10.0.0.9".parse().unwrap();
        assert_eq!(client_ip(None, Some(peer)), Some(peer));
        assert_eq!(client_ip(Some("garbage"), Some(peer)), Some(peer));
        assert_eq!(client_ip(None, None), None);
    }

    #[test]
    fn test_strip_tags() {
        let html = "<html><body><h1>Hello</h1>\n<p>Trip &amp; tour</p></body></html>";
        assert_eq!(strip_tags(html), "Hello\nTrip & tour");
    }

    #[test]
    fn test_subdomain_rules() {
        assert!(is_valid_subdomain("sunny-travel"));
        assert!(is_valid_subdomain("a1"));
        assert!(!is_valid_subdomain("-bad"));
        assert!(!is_valid_subdomain("Upper"));
        assert!(!is_valid_subdomain("with space"));
    }
}
