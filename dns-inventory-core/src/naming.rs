//! Discovery filters and hostname normalization shared by all collectors.
//!
//! Providers disagree on wire formats: the registrar API returns short
//! record names (`www`, `@`) while the DNS provider returns fully-qualified
//! hostnames (`www.example.com`). Everything is normalized here so the
//! reconciler only ever sees one shape.

/// Domains that are placeholders or test fixtures, never real assets.
/// Compared against the lowercased full name.
const TEST_DOMAINS: &[&str] = &[
    "example.com",
    "example.org",
    "example.net",
    "test.com",
    "test.org",
    "test.net",
    "domain.com",
    "domain.org",
    "domain.net",
    "localhost",
    "invalid",
    "example",
    "test",
    "local",
    "internal",
    "localdomain",
];

/// Name prefixes that mark throwaway/staging domains.
const TEST_PREFIXES: &[&str] = &[
    "test-", "test.", "example-", "example.", "demo-", "demo.", "staging-", "dev-",
];

/// Record types this system vouches for. Unknown types are still collected,
/// just not validated.
const KNOWN_RECORD_TYPES: &[&str] = &[
    "A", "AAAA", "CNAME", "MX", "TXT", "NS", "SOA", "SRV", "CAA", "PTR", "NAPTR", "DNSKEY", "DS",
    "TLSA", "SSHFP", "SPF",
];

/// Returns whether `domain` is a test/example domain that discovery must skip.
#[must_use]
pub fn is_test_domain(domain: &str) -> bool {
    let d = domain.trim().to_lowercase();

    if TEST_DOMAINS.contains(&d.as_str()) {
        return true;
    }

    TEST_PREFIXES.iter().any(|prefix| d.starts_with(prefix))
}

/// Normalizes a provider-reported record name into a subdomain.
///
/// `"@"` (and whitespace-only names) become the empty string, meaning the
/// zone apex; everything else is trimmed and lowercased.
#[must_use]
pub fn normalize_subdomain(name: &str) -> String {
    let s = name.trim();
    if s == "@" {
        return String::new();
    }
    s.to_lowercase()
}

/// Extracts the subdomain part of a fully-qualified hostname within `zone`.
///
/// Comparison is case-insensitive with trailing dots stripped. A hostname
/// equal to the zone is the apex (empty string); a hostname outside the zone
/// is returned unchanged.
#[must_use]
pub fn extract_subdomain(hostname: &str, zone: &str) -> String {
    let hostname = hostname.trim().trim_end_matches('.').to_lowercase();
    let zone = zone.trim().trim_end_matches('.').to_lowercase();

    if hostname == zone {
        return String::new();
    }

    let suffix = format!(".{zone}");
    if let Some(subdomain) = hostname.strip_suffix(&suffix) {
        return subdomain.to_string();
    }

    hostname
}

/// Uppercases and trims a record type label.
#[must_use]
pub fn normalize_record_type(record_type: &str) -> String {
    record_type.trim().to_uppercase()
}

/// Returns whether a record type is one of the recognized DNS types.
#[must_use]
pub fn is_known_record_type(record_type: &str) -> bool {
    KNOWN_RECORD_TYPES.contains(&normalize_record_type(record_type).as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocklisted_domains_are_filtered() {
        assert!(is_test_domain("example.com"));
        assert!(is_test_domain("EXAMPLE.COM"));
        assert!(is_test_domain("  localhost "));
        assert!(is_test_domain("localdomain"));
    }

    #[test]
    fn test_prefixes_are_filtered() {
        assert!(is_test_domain("test-internal.io"));
        assert!(is_test_domain("staging-api.mycorp.com"));
        assert!(is_test_domain("demo.mycorp.com"));
        assert!(is_test_domain("dev-tools.net"));
    }

    #[test]
    fn real_domains_pass() {
        assert!(!is_test_domain("mycorp.com"));
        assert!(!is_test_domain("contest.com"));
        assert!(!is_test_domain("protesting.org"));
    }

    #[test]
    fn at_sign_is_apex() {
        assert_eq!(normalize_subdomain("@"), "");
        assert_eq!(normalize_subdomain(" @ "), "");
    }

    #[test]
    fn subdomain_is_lowercased_and_trimmed() {
        assert_eq!(normalize_subdomain(" WWW "), "www");
        assert_eq!(normalize_subdomain("mail"), "mail");
    }

    #[test]
    fn extract_simple_subdomain() {
        assert_eq!(extract_subdomain("www.example.com", "example.com"), "www");
    }

    #[test]
    fn extract_apex_is_empty() {
        assert_eq!(extract_subdomain("example.com", "example.com"), "");
    }

    #[test]
    fn extract_deep_subdomain() {
        assert_eq!(
            extract_subdomain("a.b.c.example.com", "example.com"),
            "a.b.c"
        );
    }

    #[test]
    fn extract_is_case_insensitive_and_dot_tolerant() {
        assert_eq!(
            extract_subdomain("WWW.Example.COM.", "example.com."),
            "www"
        );
    }

    #[test]
    fn extract_outside_zone_returns_hostname() {
        assert_eq!(
            extract_subdomain("www.other.com", "example.com"),
            "www.other.com"
        );
    }

    #[test]
    fn record_types_are_uppercased() {
        assert_eq!(normalize_record_type(" cname "), "CNAME");
        assert_eq!(normalize_record_type("a"), "A");
    }

    #[test]
    fn known_and_unknown_record_types() {
        assert!(is_known_record_type("a"));
        assert!(is_known_record_type("TLSA"));
        assert!(is_known_record_type("spf"));
        assert!(!is_known_record_type("LOC"));
    }
}
