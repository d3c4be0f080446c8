//! News-Ripple: a polite single-site news crawler
//!
//! This crate walks a news site's internal link graph breadth-first from a
//! seed article, extracts a structured record from every article page via an
//! LLM, and stores one JSON file per URL fingerprint so interrupted crawls
//! resume where they stopped.

pub mod config;
pub mod crawler;
pub mod output;
pub mod record;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for News-Ripple operations
#[derive(Debug, Error)]
pub enum RippleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("URL {url} is outside target domain {domain}")]
    OutOfDomain { url: String, domain: String },

    #[error("Fetch failed: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] crawler::ExtractionError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RippleError {
    /// Short label for the failure class, attached to per-URL log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::InvalidUrl(_) => "invalid_url",
            Self::OutOfDomain { .. } => "out_of_domain",
            Self::Fetch(_) | Self::Reqwest(_) => "fetch_failure",
            Self::Extraction(_) => "extraction_failure",
            Self::Storage(_) | Self::Io(_) => "storage_failure",
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),

    #[error("Failed to load env file: {0}")]
    EnvFile(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for News-Ripple operations
pub type Result<T> = std::result::Result<T, RippleError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Crawler;
pub use output::CrawlStatistics;
pub use record::NewsRecord;
pub use state::{CrawlState, UrlOutcome};
pub use url::{fingerprint, normalize_url, DomainGuard, Fingerprint};
