//! URL pattern classification and host normalization.
//!
//! # Pattern Formats
//! - Exact host: `example.com` - matches only `example.com`
//! - Wildcard host: `*.example.com`, `google.*`, `mail.*.com`
//! - Nonstandard: `*`, `//cdn.example`, IP literals, malformed entries
//!
//! A scheme prefix (`https://`), a path and a port are ignored for indexing.

use std::net::Ipv4Addr;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static SCHEME_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("scheme pattern is valid"));

/// How a URL pattern participates in the domain index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternKind {
    /// Plain host, normalized to lower-case ASCII
    Exact(String),
    /// Host with `*` labels, normalized to lower-case ASCII
    Wildcard(String),
    /// Anything that cannot be keyed by host
    Nonstandard,
}

/// Classify a URL pattern from a rule record.
pub fn classify(pattern: &str) -> PatternKind {
    let pattern = pattern.trim();
    if pattern.is_empty() || pattern == "*" || pattern.starts_with("//") {
        return PatternKind::Nonstandard;
    }

    let host = match pattern_host(pattern) {
        Some(host) => host,
        None => return PatternKind::Nonstandard,
    };

    if is_ip_literal(host) {
        return PatternKind::Nonstandard;
    }

    if host.contains('*') {
        return classify_wildcard(host);
    }

    match to_ascii_host(host) {
        Some(host) => PatternKind::Exact(host),
        None => PatternKind::Nonstandard,
    }
}

/// Host part of a pattern: scheme, path, query, fragment and port removed.
fn pattern_host(pattern: &str) -> Option<&str> {
    let rest = match SCHEME_PREFIX.find(pattern) {
        Some(m) => &pattern[m.end()..],
        None => pattern,
    };
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let host = &rest[..end];

    if host.starts_with('[') {
        // Bracketed IPv6; the port, if any, follows the closing bracket
        return host.find(']').map(|end| &host[..=end]);
    }

    let host = match host.rfind(':') {
        Some(pos) if host[pos + 1..].bytes().all(|b| b.is_ascii_digit()) => &host[..pos],
        Some(_) => return None,
        None => host,
    };
    let host = host.strip_suffix('.').unwrap_or(host);

    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

fn is_ip_literal(host: &str) -> bool {
    host.starts_with('[') || host.parse::<Ipv4Addr>().is_ok()
}

fn classify_wildcard(host: &str) -> PatternKind {
    let mut normalized = Vec::new();
    let mut has_literal = false;

    for label in host.split('.') {
        if label == "*" {
            normalized.push("*".to_string());
            continue;
        }
        if label.is_empty() || label.contains('*') {
            return PatternKind::Nonstandard;
        }
        match to_ascii_host(label) {
            Some(label) => {
                has_literal = true;
                normalized.push(label);
            }
            None => return PatternKind::Nonstandard,
        }
    }

    if has_literal {
        PatternKind::Wildcard(normalized.join("."))
    } else {
        PatternKind::Nonstandard
    }
}

/// Lower-case and convert a host to its ASCII (punycode) form.
fn to_ascii_host(host: &str) -> Option<String> {
    let ascii = idna::domain_to_ascii(&host.to_lowercase()).ok()?;
    if ascii.is_empty() || ascii.split('.').any(str::is_empty) {
        return None;
    }
    if !ascii
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
    {
        return None;
    }
    Some(ascii)
}

/// Normalize a queried URL or bare host to the form used as index key.
///
/// Returns `None` when no host can be extracted.
///
/// # Examples
/// ```
/// use sitefix::pattern::normalize_host;
///
/// assert_eq!(normalize_host("https://Sub.Example.COM/page?q=1").as_deref(), Some("sub.example.com"));
/// assert_eq!(normalize_host("example.com").as_deref(), Some("example.com"));
/// assert_eq!(normalize_host("").as_deref(), None);
/// ```
pub fn normalize_host(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if SCHEME_PREFIX.is_match(input) {
        let url = Url::parse(input).ok()?;
        let host = url.host_str()?;
        let host = host.strip_suffix('.').unwrap_or(host);
        return if host.is_empty() {
            None
        } else {
            Some(host.to_lowercase())
        };
    }

    let host = pattern_host(input.strip_prefix("//").unwrap_or(input))?;
    if is_ip_literal(host) {
        return Some(host.to_string());
    }
    to_ascii_host(host)
}

/// Check a normalized host against a pattern that is not keyed by host.
///
/// `*` matches every host, an IP literal matches itself and `//host/...`
/// matches like the host it names. Malformed patterns match nothing.
pub fn nonstandard_matches(pattern: &str, host: &str) -> bool {
    let pattern = pattern.trim();
    if pattern == "*" {
        return true;
    }

    let Some(candidate) = pattern_host(pattern.strip_prefix("//").unwrap_or(pattern)) else {
        return false;
    };
    if is_ip_literal(candidate) {
        return candidate.eq_ignore_ascii_case(host);
    }
    if candidate.contains('*') {
        return match classify_wildcard(candidate) {
            PatternKind::Wildcard(wildcard) => wildcard_matches(&wildcard, host),
            _ => false,
        };
    }
    to_ascii_host(candidate).is_some_and(|exact| exact == host)
}

/// Check a normalized host against a normalized wildcard pattern.
///
/// A `*` label in first position matches one or more leading labels, in last
/// position one or more trailing labels, and elsewhere exactly one label.
pub fn wildcard_matches(pattern: &str, host: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let host: Vec<&str> = host.split('.').collect();
    match_labels(&pattern, &host, 0, 0)
}

fn match_labels(pattern: &[&str], host: &[&str], i: usize, j: usize) -> bool {
    if i == pattern.len() {
        return j == host.len();
    }
    if j == host.len() {
        return false;
    }

    if pattern[i] == "*" {
        let greedy = i == 0 || i == pattern.len() - 1;
        if greedy {
            (j + 1..=host.len()).any(|next| match_labels(pattern, host, i + 1, next))
        } else {
            match_labels(pattern, host, i + 1, j + 1)
        }
    } else {
        pattern[i] == host[j] && match_labels(pattern, host, i + 1, j + 1)
    }
}

/// Candidate label keys of a normalized wildcard pattern.
///
/// The labels after the last `*` form the postfix, which comes first; the
/// literal labels before it follow in order.
pub fn wildcard_label_keys(pattern: &str) -> Vec<String> {
    let labels: Vec<&str> = pattern.split('.').collect();
    let last_star = labels.iter().rposition(|l| *l == "*");

    let (prefix, postfix) = match last_star {
        Some(k) => (&labels[..k], labels[k + 1..].join(".")),
        None => (&labels[..0], labels.join(".")),
    };

    let mut keys = Vec::new();
    if !postfix.is_empty() {
        keys.push(postfix);
    }
    for label in prefix {
        if *label != "*" && !keys.iter().any(|k| k == label) {
            keys.push(label.to_string());
        }
    }
    keys
}

/// Label keys a host can be looked up under: every suffix, then every label.
pub fn host_label_keys(host: &str) -> Vec<&str> {
    let mut keys = Vec::new();

    let mut current = host;
    keys.push(current);
    while let Some(pos) = current.find('.') {
        current = &current[pos + 1..];
        keys.push(current);
    }

    for label in host.split('.') {
        if !keys.contains(&label) {
            keys.push(label);
        }
    }

    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_exact() {
        assert_eq!(classify("example.com"), PatternKind::Exact("example.com".into()));
        assert_eq!(classify("Example.COM"), PatternKind::Exact("example.com".into()));
        assert_eq!(
            classify("https://example.com/path?q"),
            PatternKind::Exact("example.com".into())
        );
        assert_eq!(classify("example.com:8080"), PatternKind::Exact("example.com".into()));
        assert_eq!(classify("localhost"), PatternKind::Exact("localhost".into()));
    }

    #[test]
    fn test_classify_idn() {
        assert_eq!(
            classify("bücher.example"),
            PatternKind::Exact("xn--bcher-kva.example".into())
        );
    }

    #[test]
    fn test_classify_wildcard() {
        assert_eq!(
            classify("*.example.com"),
            PatternKind::Wildcard("*.example.com".into())
        );
        assert_eq!(classify("google.*"), PatternKind::Wildcard("google.*".into()));
        assert_eq!(
            classify("mail.*.COM/inbox"),
            PatternKind::Wildcard("mail.*.com".into())
        );
    }

    #[test]
    fn test_classify_nonstandard() {
        assert_eq!(classify("*"), PatternKind::Nonstandard);
        assert_eq!(classify(""), PatternKind::Nonstandard);
        assert_eq!(classify("//cdn.example.com"), PatternKind::Nonstandard);
        assert_eq!(classify("192.168.1.1"), PatternKind::Nonstandard);
        assert_eq!(classify("http://[::1]:8080/"), PatternKind::Nonstandard);
        assert_eq!(classify("*.*"), PatternKind::Nonstandard);
        assert_eq!(classify("foo*.com"), PatternKind::Nonstandard);
        assert_eq!(classify("a..com"), PatternKind::Nonstandard);
        assert_eq!(classify("example.com:abc"), PatternKind::Nonstandard);
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(
            normalize_host("https://Sub.Example.com/x").as_deref(),
            Some("sub.example.com")
        );
        assert_eq!(normalize_host("blocked.test").as_deref(), Some("blocked.test"));
        assert_eq!(
            normalize_host("http://bücher.example/").as_deref(),
            Some("xn--bcher-kva.example")
        );
        assert_eq!(normalize_host("example.com.").as_deref(), Some("example.com"));
        assert_eq!(normalize_host("10.0.0.1").as_deref(), Some("10.0.0.1"));
        assert_eq!(normalize_host("about:blank").as_deref(), None);
        assert_eq!(normalize_host("   ").as_deref(), None);
    }

    #[test]
    fn test_nonstandard_matches() {
        assert!(nonstandard_matches("*", "any.example"));

        assert!(nonstandard_matches("192.168.1.1", "192.168.1.1"));
        assert!(!nonstandard_matches("192.168.1.1", "other.org"));
        assert!(nonstandard_matches("http://[::1]:8080/", "[::1]"));

        assert!(nonstandard_matches("//cdn.example.com/lib", "cdn.example.com"));
        assert!(!nonstandard_matches("//cdn.example.com", "example.com"));
        assert!(nonstandard_matches("//*.cdn.example", "a.cdn.example"));

        assert!(!nonstandard_matches("foo*.com", "foo.com"));
        assert!(!nonstandard_matches("a..com", "a.com"));
        assert!(!nonstandard_matches("", "other.org"));
    }

    #[test]
    fn test_wildcard_leading() {
        assert!(wildcard_matches("*.example.com", "sub.example.com"));
        assert!(wildcard_matches("*.example.com", "a.b.example.com"));
        assert!(!wildcard_matches("*.example.com", "example.com"));
        assert!(!wildcard_matches("*.example.com", "example.org"));
        assert!(!wildcard_matches("*.example.com", "notexample.com"));
    }

    #[test]
    fn test_wildcard_trailing_and_middle() {
        assert!(wildcard_matches("google.*", "google.com"));
        assert!(wildcard_matches("google.*", "google.co.uk"));
        assert!(!wildcard_matches("google.*", "www.google.com"));

        assert!(wildcard_matches("mail.*.com", "mail.x.com"));
        assert!(!wildcard_matches("mail.*.com", "mail.x.y.com"));
        assert!(!wildcard_matches("mail.*.com", "mail.com"));
    }

    #[test]
    fn test_wildcard_label_keys() {
        assert_eq!(wildcard_label_keys("*.example.com"), vec!["example.com"]);
        assert_eq!(wildcard_label_keys("google.*"), vec!["google"]);
        assert_eq!(wildcard_label_keys("mail.*.com"), vec!["com", "mail"]);
        assert_eq!(wildcard_label_keys("*.cdn.*.net"), vec!["net", "cdn"]);
    }

    #[test]
    fn test_host_label_keys() {
        assert_eq!(
            host_label_keys("a.b.example.com"),
            vec!["a.b.example.com", "b.example.com", "example.com", "com", "a", "b", "example"]
        );
        assert_eq!(host_label_keys("localhost"), vec!["localhost"]);
    }

    #[test]
    fn test_matching_pattern_key_is_derivable() {
        let cases = [
            ("*.example.com", "x.y.example.com"),
            ("google.*", "google.co.uk"),
            ("mail.*.com", "mail.host.com"),
        ];
        for (pattern, host) in cases {
            assert!(wildcard_matches(pattern, host));
            let host_keys = host_label_keys(host);
            for key in wildcard_label_keys(pattern) {
                assert!(host_keys.contains(&key.as_str()), "{pattern} / {host} / {key}");
            }
        }
    }
}
