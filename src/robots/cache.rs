//! Per-origin robots.txt cache
//!
//! Each origin's robots.txt is fetched at most once per crawl and kept for the
//! rest of the run.

use crate::robots::{fetch_robots, ParsedRobots};
use reqwest::Client;
use std::collections::HashMap;
use tokio::sync::Mutex;
use url::Url;

/// Robots rules keyed by origin (`scheme://host[:port]`)
#[derive(Debug, Default)]
pub struct RobotsCache {
    entries: Mutex<HashMap<String, ParsedRobots>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks a URL against its origin's robots.txt, fetching it on first use
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client carrying the crawler's user agent
    /// * `url` - The page about to be fetched
    /// * `agent_token` - Product token matched against `User-agent` lines
    pub async fn is_allowed(&self, client: &Client, url: &Url, agent_token: &str) -> bool {
        let origin = url.origin().ascii_serialization();

        // The lock is held across the fetch so concurrent callers for one
        // origin never issue a second request.
        let mut entries = self.entries.lock().await;
        if !entries.contains_key(&origin) {
            let robots = fetch_robots(client, url).await;
            entries.insert(origin.clone(), robots);
        }

        entries
            .get(&origin)
            .map(|robots| robots.is_allowed(url.as_str(), agent_token))
            .unwrap_or(true)
    }
}
