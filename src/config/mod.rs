//! Configuration module for News-Ripple
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Validation resolves everything that can fail at startup (seed URL, target
//! domain, link pattern, API key) into a [`CrawlPlan`], so the crawl loop itself
//! only ever sees per-URL failures.
//!
//! # Example
//!
//! ```no_run
//! use news_ripple::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawling from: {}", config.crawler.seed_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, ExtractionConfig, FetcherConfig, LinkConfig, OutputConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, load_env_file};
pub use validation::{resolve_api_key, validate, CrawlPlan};
