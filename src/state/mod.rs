//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: Where the traversal loop is (running, draining a URL, done)
//! - `UrlOutcome`: What happened to each dequeued URL (persisted, cache hit, skipped, failed)

mod crawl_state;
mod url_outcome;

// Re-export main types
pub use crawl_state::CrawlState;
pub use url_outcome::UrlOutcome;
