//! Crawl statistics
//!
//! Run statistics are accumulated in memory from per-URL outcomes while the
//! crawl proceeds; store statistics are read back from the record store.

use crate::state::UrlOutcome;
use crate::storage::RecordStore;
use crate::RippleError;
use std::collections::HashMap;
use std::time::Duration;

/// Summary of one crawl run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlStatistics {
    /// URLs taken off the queue
    pub dequeued: u64,

    /// Count of dequeued URLs by outcome
    pub outcomes: HashMap<UrlOutcome, u64>,

    /// URLs added to the queue, seed included
    pub enqueued: u64,

    /// Deepest link distance from the seed that was processed
    pub max_depth: u32,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of one dequeued URL
    pub fn record(&mut self, outcome: UrlOutcome, depth: u32) {
        self.dequeued += 1;
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        if outcome != UrlOutcome::AlreadyVisited {
            self.max_depth = self.max_depth.max(depth);
        }
    }

    /// Records URLs added to the queue
    pub fn record_enqueued(&mut self, count: usize) {
        self.enqueued += count as u64;
    }

    /// Number of dequeued URLs with the given outcome
    pub fn count(&self, outcome: UrlOutcome) -> u64 {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Records written during this run
    pub fn persisted(&self) -> u64 {
        self.count(UrlOutcome::Persisted)
    }

    pub fn cache_hits(&self) -> u64 {
        self.count(UrlOutcome::CacheHit)
    }

    /// URLs whose processing failed at any step
    pub fn failures(&self) -> u64 {
        self.outcomes
            .iter()
            .filter(|(outcome, _)| outcome.is_failure())
            .map(|(_, count)| count)
            .sum()
    }
}

/// Record count for one domain's store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatistics {
    /// Target domain the store belongs to
    pub domain: String,

    /// Number of persisted records
    pub records: u64,
}

/// Loads statistics from a record store
///
/// # Arguments
///
/// * `store` - The store to inspect
/// * `domain` - Domain the store is scoped to (for display)
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully counted records
/// * `Err(RippleError)` - Failed to list the store
pub fn load_store_statistics(
    store: &dyn RecordStore,
    domain: &str,
) -> Result<StoreStatistics, RippleError> {
    let records = store.keys()?.len() as u64;
    Ok(StoreStatistics {
        domain: domain.to_string(),
        records,
    })
}

/// Prints run statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  URLs dequeued: {}", stats.dequeued);
    println!("  URLs enqueued: {}", stats.enqueued);
    println!("  Max depth reached: {}", stats.max_depth);
    println!("  Elapsed: {:.1}s", stats.elapsed.as_secs_f64());
    println!();

    println!("URLs by Outcome:");
    for outcome in UrlOutcome::all() {
        let count = stats.count(outcome);
        if count == 0 {
            continue;
        }
        let percentage = if stats.dequeued > 0 {
            (count as f64 / stats.dequeued as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", outcome, count, percentage);
    }
    println!();

    println!(
        "Records: {} new, {} already stored, {} failed",
        stats.persisted(),
        stats.cache_hits(),
        stats.failures()
    );
}

/// Prints store statistics to stdout
pub fn print_store_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");
    println!("  Domain: {}", stats.domain);
    println!("  Records stored: {}", stats.records);
}
