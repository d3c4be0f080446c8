use crate::url::matcher::matches_wildcard;
use crate::UrlError;
use url::Url;

/// Lowercases a host and strips a leading `www.` and trailing dot
pub(crate) fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('.').to_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => host,
    }
}

/// Extracts the domain from a URL
///
/// The host is lowercased and a leading `www.` is removed, matching what
/// [`crate::url::normalize_url`] does, so the result is directly comparable to
/// a configured target domain. Ports are not part of the domain.
///
/// # Returns
///
/// * `Some(String)` - The normalized host
/// * `None` - If the URL has no host
///
/// # Examples
///
/// ```
/// use url::Url;
/// use news_ripple::url::extract_domain;
///
/// let url = Url::parse("https://WWW.Example.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(normalize_host).filter(|h| !h.is_empty())
}

/// Accepts or rejects URLs by comparing their host with the target domain
///
/// With `include_subdomains` off (the default), only the exact target host is
/// accepted; `www.` is never significant because both sides are normalized.
/// With it on, any subdomain of the target is accepted as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainGuard {
    domain: String,
    include_subdomains: bool,
}

impl DomainGuard {
    /// Creates a guard for the given target domain
    ///
    /// # Returns
    ///
    /// * `Ok(DomainGuard)` - Guard for the normalized domain
    /// * `Err(UrlError::MissingDomain)` - The domain is empty
    pub fn new(domain: &str, include_subdomains: bool) -> Result<Self, UrlError> {
        let domain = normalize_host(domain);
        if domain.is_empty() {
            return Err(UrlError::MissingDomain);
        }
        Ok(Self {
            domain,
            include_subdomains,
        })
    }

    /// The normalized target domain; also the store's directory name
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Whether subdomains of the target are accepted
    pub fn includes_subdomains(&self) -> bool {
        self.include_subdomains
    }

    /// Returns true if the URL's host is within the target domain
    pub fn allowed(&self, url: &Url) -> bool {
        match extract_domain(url) {
            Some(host) => self.allows_host(&host),
            None => false,
        }
    }

    /// Returns true if the (already normalized) host is within the target domain
    pub fn allows_host(&self, host: &str) -> bool {
        if self.include_subdomains {
            matches_wildcard(&format!("*.{}", self.domain), host)
        } else {
            matches_wildcard(&self.domain, host)
        }
    }
}
