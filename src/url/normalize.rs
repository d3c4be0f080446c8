use crate::url::domain::normalize_host;
use crate::UrlError;
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
    "ref",
    "source",
];

/// Normalizes a URL into the comparable form used for dedup, scoping and fingerprints
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only http and https
/// 3. Lowercase the host and remove a leading `www.`
/// 4. Normalize path:
///    - Remove dot segments (. and ..) and repeated slashes
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 5. Remove fragment (everything after #)
/// 6. Remove tracking query parameters
/// 7. Sort remaining query parameters by name (values keep their order)
/// 8. Remove empty query string (trailing ?)
///
/// Normalizing an already normalized URL returns it unchanged.
///
/// # Examples
///
/// ```
/// use news_ripple::url::normalize_url;
///
/// let url = normalize_url("https://WWW.EXAMPLE.COM/News/?b=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/News?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?;
    let normalized_host = normalize_host(host);
    if normalized_host.is_empty() {
        return Err(UrlError::MissingDomain);
    }
    if normalized_host != host {
        url.set_host(Some(&normalized_host))
            .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);

        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    // Stable: repeated keys keep their relative order
    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
