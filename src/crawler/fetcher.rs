//! HTTP fetcher implementation
//!
//! This module handles all page retrieval for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - robots.txt checks before each page request
//! - GET requests to fetch page content
//! - Error classification
//! - Rendering fetched HTML to markdown

use crate::config::{FetcherConfig, UserAgentConfig};
use crate::crawler::parser::html_to_markdown;
use crate::robots::{agent_token, RobotsCache};
use crate::url::DomainGuard;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that end processing of one URL at the fetch step
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP status {status}")]
    Http { status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Disallowed by robots.txt")]
    RobotsDenied,

    #[error("Redirected outside the target domain to {location}")]
    RedirectOutOfDomain { location: String },

    #[error("Not an HTML page (Content-Type: {content_type})")]
    ContentMismatch { content_type: String },

    #[error("Empty response body")]
    EmptyBody,
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = e.status() {
            FetchError::Http {
                status: status.as_u16(),
            }
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// A fetched page, rendered for link discovery and extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// The URL that was requested (normalized)
    pub url: Url,

    /// The page title, when the document has one
    pub title: Option<String>,

    /// Page content as markdown
    pub markdown: String,
}

/// Retrieves a page and returns its markdown rendering
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError>;
}

/// Maximum redirect hops followed for one request
const MAX_REDIRECTS: usize = 10;

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed only while they stay inside `guard`; a hop to
/// another host stops the chain and the 3xx response is returned as-is.
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `timeout` - Whole-request timeout
/// * `guard` - Domain scope that redirect targets must stay within
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use news_ripple::config::UserAgentConfig;
/// use news_ripple::crawler::build_http_client;
/// use news_ripple::DomainGuard;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "NewsRipple".to_string(),
///     crawler_version: "0.1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
/// let guard = DomainGuard::new("merolagani.com", false).unwrap();
///
/// let client = build_http_client(&config, Duration::from_secs(30), &guard).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
    guard: &DomainGuard,
) -> Result<Client, reqwest::Error> {
    let guard = guard.clone();
    let redirects = Policy::custom(move |attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if guard.allowed(attempt.url()) {
            attempt.follow()
        } else {
            tracing::debug!("Not following redirect out of domain to {}", attempt.url());
            attempt.stop()
        }
    });

    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .redirect(redirects)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page source backed by real HTTP requests
#[derive(Debug)]
pub struct HttpFetcher {
    client: Client,
    agent_token: String,
    robots: Option<RobotsCache>,
}

impl HttpFetcher {
    /// Creates a fetcher from the user agent and fetcher configuration
    ///
    /// Redirects are followed only within `guard`.
    pub fn new(
        user_agent: &UserAgentConfig,
        config: &FetcherConfig,
        guard: &DomainGuard,
    ) -> Result<Self, reqwest::Error> {
        let client =
            build_http_client(user_agent, Duration::from_secs(config.timeout_secs), guard)?;
        let header = user_agent.header_value();
        Ok(Self {
            client,
            agent_token: agent_token(&header).to_string(),
            robots: config.respect_robots.then(RobotsCache::new),
        })
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    /// Fetches a URL and renders it to markdown
    ///
    /// # Request Flow
    ///
    /// 1. Check robots.txt for the URL's origin (fetched once per origin)
    /// 2. Send GET request (in-domain redirects followed, max 10 hops)
    /// 3. Classify the response:
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | robots.txt disallows | `RobotsDenied` |
    /// | redirect leaves the domain | `RedirectOutOfDomain` |
    /// | non-2xx status | `Http { status }` |
    /// | Content-Type present and not HTML | `ContentMismatch` |
    /// | blank body | `EmptyBody` |
    /// | timeout | `Timeout` |
    /// | connection failure | `Network` |
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
        if let Some(robots) = &self.robots {
            if !robots.is_allowed(&self.client, url, &self.agent_token).await {
                return Err(FetchError::RobotsDenied);
            }
        }

        let response = self.client.get(url.as_str()).send().await?;
        let status = response.status();
        if status.is_redirection() {
            if let Some(location) = response.headers().get(LOCATION) {
                return Err(FetchError::RedirectOutOfDomain {
                    location: String::from_utf8_lossy(location.as_bytes()).into_owned(),
                });
            }
        }
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if !content_type.is_empty()
            && !content_type.contains("text/html")
            && !content_type.contains("application/xhtml")
        {
            return Err(FetchError::ContentMismatch { content_type });
        }

        // Relative links resolve against the final URL after redirects
        let final_url = response.url().clone();
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }

        let rendered = html_to_markdown(&body, &final_url);
        tracing::debug!(
            "Fetched {} ({} bytes HTML, {} bytes markdown)",
            url,
            body.len(),
            rendered.markdown.len()
        );

        Ok(Page {
            url: url.clone(),
            title: rendered.title,
            markdown: rendered.markdown,
        })
    }
}
