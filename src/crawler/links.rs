//! Article link discovery
//!
//! Link candidates are scanned out of page markdown with two patterns: markdown
//! links (`[text](target)`) and bare absolute URLs or root-relative paths. Each
//! candidate is resolved against the page URL, normalized, and kept only if it
//! has the site's article shape.
//!
//! The normalized form is the link's identity. The resolved spelling is what
//! gets requested, so `www.` hosts and query parameters that normalization
//! drops still reach the server as written.

use crate::config::LinkConfig;
use crate::url::normalize_url;
use crate::ConfigError;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use url::Url;

static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[[^\]]*\]\(\s*([^)\s]+)(?:\s+"[^"]*")?\s*\)"#)
        .expect("markdown link regex should compile")
});

static BARE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:https?://[^\s"'()<>\[\]]+|/[^\s"'()<>\[\]]+)"#)
        .expect("bare link regex should compile")
});

/// Article links keyed by normalized URL, each mapped to the URL to request
///
/// When one article is linked under several spellings, the first one found
/// in the page is kept.
pub type DiscoveredLinks = BTreeMap<Url, Url>;

/// Decides which URLs found in page content are worth enqueueing
pub trait LinkPolicy: Send + Sync {
    /// Returns the article links found in `content`
    ///
    /// Empty content yields an empty map. Relative candidates resolve against
    /// `page_url`. Candidates that fail to resolve or normalize are dropped.
    fn extract_links(&self, content: &str, page_url: &Url) -> DiscoveredLinks;
}

/// Matches article pages by path pattern plus a numeric id query parameter
///
/// With the default configuration this accepts
/// `/NewsDetail.aspx?newsID=<digits>` and nothing else.
#[derive(Debug, Clone)]
pub struct ArticleLinkPolicy {
    path_pattern: Regex,
    id_param: String,
}

impl ArticleLinkPolicy {
    /// Creates a policy from a path regex and the id parameter name
    pub fn new(path_pattern: &str, id_param: &str) -> Result<Self, ConfigError> {
        let path_pattern = Regex::new(path_pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("Invalid path pattern '{}': {}", path_pattern, e))
        })?;
        Ok(Self {
            path_pattern,
            id_param: id_param.to_string(),
        })
    }

    pub fn from_config(config: &LinkConfig) -> Result<Self, ConfigError> {
        Self::new(&config.path_pattern, &config.id_param)
    }

    /// Returns true if the URL has the article shape
    pub fn is_article(&self, url: &Url) -> bool {
        if !self.path_pattern.is_match(url.path()) {
            return false;
        }

        url.query_pairs().any(|(key, value)| {
            key.eq_ignore_ascii_case(&self.id_param)
                && !value.is_empty()
                && value.bytes().all(|b| b.is_ascii_digit())
        })
    }

    /// Resolves a candidate to its `(normalized, requestable)` pair
    fn resolve(&self, candidate: &str, page_url: &Url) -> Option<(Url, Url)> {
        let candidate = candidate.trim_end_matches(['.', ',', ';', ':', '!', '?']);
        if candidate.is_empty() {
            return None;
        }

        let mut joined = match page_url.join(candidate) {
            Ok(u) => u,
            Err(e) => {
                tracing::trace!("Dropping unresolvable link '{}': {}", candidate, e);
                return None;
            }
        };
        joined.set_fragment(None);

        match normalize_url(joined.as_str()) {
            Ok(url) => Some((url, joined)),
            Err(e) => {
                tracing::trace!("Dropping link '{}': {}", candidate, e);
                None
            }
        }
    }
}

impl Default for ArticleLinkPolicy {
    fn default() -> Self {
        let config = LinkConfig::default();
        Self {
            path_pattern: Regex::new(&config.path_pattern)
                .expect("default path pattern should compile"),
            id_param: config.id_param,
        }
    }
}

impl LinkPolicy for ArticleLinkPolicy {
    fn extract_links(&self, content: &str, page_url: &Url) -> DiscoveredLinks {
        let mut links = DiscoveredLinks::new();
        if content.trim().is_empty() {
            return links;
        }

        let markdown_targets = MARKDOWN_LINK
            .captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str());
        let bare_targets = BARE_LINK.find_iter(content).map(|m| m.as_str());

        let resolved = markdown_targets
            .chain(bare_targets)
            .filter_map(|candidate| self.resolve(candidate, page_url))
            .filter(|(url, _)| self.is_article(url));
        for (url, fetch_url) in resolved {
            links.entry(url).or_insert(fetch_url);
        }
        links
    }
}
