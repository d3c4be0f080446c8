//! Scheduler for managing the crawl frontier and rate limiting
//!
//! This module handles:
//! - The FIFO queue of pending URLs (breadth-first by discovery depth)
//! - The per-run visited set, keyed by URL fingerprint
//! - The pause taken after each processed URL

use crate::url::Fingerprint;
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use url::Url;

/// A URL waiting in the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedUrl {
    /// The URL's identity (normalized); used for scoping and logging
    pub url: Url,

    /// The URL as discovered, which is what gets requested
    pub fetch_url: Url,

    /// Storage key for the URL
    pub fingerprint: Fingerprint,

    /// Link hops from the seed (the seed is depth 0)
    pub depth: u32,
}

/// Pending URLs plus the set of URLs already dequeued in this run
///
/// A URL is never queued twice: [`Frontier::push`] rejects anything that is
/// already pending or already visited. Because every push goes to the tail
/// and every pop comes from the head, URLs are processed in non-decreasing
/// depth order.
#[derive(Debug, Default)]
pub struct Frontier {
    /// FIFO queue of URLs to process
    queue: VecDeque<QueuedUrl>,

    /// Fingerprints currently in `queue`
    pending: HashSet<Fingerprint>,

    /// Fingerprints dequeued in this run (never persisted)
    visited: HashSet<Fingerprint>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frontier holding only the seed at depth 0
    pub fn with_seed(seed: Url, fetch_url: Url) -> Self {
        let mut frontier = Self::new();
        frontier.push(seed, fetch_url, 0);
        frontier
    }

    /// Appends a URL at the tail
    ///
    /// `url` must be normalized; `fetch_url` is requested in its place.
    ///
    /// # Returns
    ///
    /// * `true` - The URL was queued
    /// * `false` - Already pending or already visited this run
    pub fn push(&mut self, url: Url, fetch_url: Url, depth: u32) -> bool {
        let fingerprint = Fingerprint::from_normalized(&url);
        if self.visited.contains(&fingerprint) || self.pending.contains(&fingerprint) {
            return false;
        }

        self.pending.insert(fingerprint.clone());
        self.queue.push_back(QueuedUrl {
            url,
            fetch_url,
            fingerprint,
            depth,
        });
        true
    }

    /// Removes and returns the head of the queue
    pub fn pop(&mut self) -> Option<QueuedUrl> {
        let next = self.queue.pop_front()?;
        self.pending.remove(&next.fingerprint);
        Some(next)
    }

    /// Records a URL as visited
    ///
    /// # Returns
    ///
    /// `true` if this is the first visit in the run
    pub fn mark_visited(&mut self, fingerprint: &Fingerprint) -> bool {
        self.visited.insert(fingerprint.clone())
    }

    /// Number of URLs waiting
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Politeness policy applied after each processed URL
#[async_trait]
pub trait RateLimit: Send + Sync {
    /// Blocks until the next request may be issued
    async fn wait(&self);
}

/// Sleeps a fixed duration every time
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl RateLimit for FixedDelay {
    async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}
