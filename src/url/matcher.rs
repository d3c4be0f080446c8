/// Checks if a host matches a domain pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "example.com" matches only "example.com"
/// 2. Wildcard match: "*.example.com" matches:
///    - "example.com" (the bare domain)
///    - "blog.example.com" (single subdomain)
///    - "api.v2.example.com" (nested subdomains)
///
/// Both sides are expected to be normalized already; the comparison is
/// case-sensitive.
///
/// # Examples
///
/// ```
/// use news_ripple::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(!matches_wildcard("example.com", "blog.example.com"));
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "example.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base
            || candidate
                .strip_suffix(base)
                .is_some_and(|prefix| prefix.ends_with('.') && prefix.len() > 1)
    } else {
        candidate == pattern
    }
}
