//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching robots.txt files.
//! The HTTP fetcher consults it before every page request when robots checks are enabled.

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::ParsedRobots;

use reqwest::Client;
use url::Url;

/// Fetches robots.txt for the origin of a URL
///
/// Any failure (network error, non-2xx status, unreadable body) yields
/// [`ParsedRobots::allow_all`]; a missing robots file never blocks a crawl.
///
/// # Arguments
///
/// * `client` - HTTP client carrying the crawler's user agent
/// * `url` - Any URL on the origin
pub async fn fetch_robots(client: &Client, url: &Url) -> ParsedRobots {
    let robots_url = match url.join("/robots.txt") {
        Ok(u) => u,
        Err(_) => return ParsedRobots::allow_all(),
    };

    let response = match client.get(robots_url.as_str()).send().await {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!("robots.txt unreachable at {}: {}", robots_url, e);
            return ParsedRobots::allow_all();
        }
    };

    if !response.status().is_success() {
        tracing::debug!(
            "robots.txt at {} returned {}, allowing all",
            robots_url,
            response.status()
        );
        return ParsedRobots::allow_all();
    }

    match response.text().await {
        Ok(body) => {
            tracing::debug!("Loaded robots.txt from {} ({} bytes)", robots_url, body.len());
            ParsedRobots::from_content(&body)
        }
        Err(_) => ParsedRobots::allow_all(),
    }
}

/// Product token for `User-agent` matching: the part before the first `/`
///
/// `NewsRipple/0.1.0 (+https://example.com; a@b.c)` → `NewsRipple`
pub fn agent_token(user_agent: &str) -> &str {
    user_agent
        .split(['/', ' '])
        .next()
        .filter(|t| !t.is_empty())
        .unwrap_or(user_agent)
}
