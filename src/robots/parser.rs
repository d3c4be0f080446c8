//! Robots.txt rules for one origin
//!
//! Matching is delegated to the robotstxt crate's Google-compatible matcher.

use robotstxt::DefaultMatcher;

/// Robots.txt rules fetched from one origin
#[derive(Debug, Clone, Default)]
pub struct ParsedRobots {
    /// Raw robots.txt body; empty means everything is allowed
    content: String,
}

impl ParsedRobots {
    /// Wraps a robots.txt body
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Rules that allow every path
    ///
    /// Used when an origin has no reachable robots.txt.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Returns true if this value carries no rules
    pub fn is_permissive(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Checks if a URL may be fetched by the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL of the page
    /// * `user_agent` - Product token of the crawler (e.g. "NewsRipple")
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.is_permissive() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }
}
