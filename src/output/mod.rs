//! Output module for crawl summaries
//!
//! This module handles:
//! - Accumulating per-run statistics from URL outcomes
//! - Counting records already persisted in a store
//! - Printing both to stdout

pub mod stats;

pub use stats::{
    load_store_statistics, print_statistics, print_store_statistics, CrawlStatistics,
    StoreStatistics,
};
