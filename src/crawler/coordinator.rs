//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Draining the frontier breadth-first from the seed
//! - Skipping URLs already visited this run or outside the target domain
//! - Reusing stored records, otherwise fetching, extracting and persisting
//! - Discovering article links and enqueueing the new ones
//! - Pausing between URLs

use crate::config::{validate, Config, CrawlPlan};
use crate::crawler::extractor::{Extractor, LlmExtractor};
use crate::crawler::fetcher::{HttpFetcher, PageSource};
use crate::crawler::links::{ArticleLinkPolicy, DiscoveredLinks, LinkPolicy};
use crate::crawler::scheduler::{FixedDelay, Frontier, QueuedUrl, RateLimit};
use crate::output::CrawlStatistics;
use crate::record::{NewsRecord, RecordSchema};
use crate::state::{CrawlState, UrlOutcome};
use crate::storage::{open_store, RecordStore, StorageError};
use crate::url::{normalize_url, DomainGuard, Fingerprint};
use crate::RippleError;
use std::path::Path;
use std::time::Instant;
use url::Url;

/// Default instruction handed to the extractor with every page
pub const DEFAULT_INSTRUCTION: &str = "Extract the news data from the markdown content";

/// Breadth-first single-site crawler
///
/// Owns the frontier and visited set; talks to the network, the extraction
/// service and the disk only through its collaborators.
pub struct Crawler {
    seed: Url,
    guard: DomainGuard,
    store: Box<dyn RecordStore>,
    fetcher: Box<dyn PageSource>,
    extractor: Box<dyn Extractor>,
    links: Box<dyn LinkPolicy>,
    limiter: Box<dyn RateLimit>,
    schema: RecordSchema,
    instruction: String,
    max_pages: u64,
    frontier: Frontier,
    state: CrawlState,
    stats: CrawlStatistics,
}

impl Crawler {
    /// Creates a crawler from a validated plan and its collaborators
    ///
    /// The link policy defaults to [`ArticleLinkPolicy::default`] and the rate
    /// limit to a [`FixedDelay`] of the plan's delay; both can be replaced
    /// with the `with_*` methods.
    pub fn new(
        plan: CrawlPlan,
        store: impl RecordStore + 'static,
        fetcher: impl PageSource + 'static,
        extractor: impl Extractor + 'static,
    ) -> Self {
        let frontier = Frontier::with_seed(plan.seed.clone(), plan.seed_fetch_url);
        let state = CrawlState::for_queue_len(frontier.len());

        Self {
            seed: plan.seed,
            guard: plan.guard,
            store: Box::new(store),
            fetcher: Box::new(fetcher),
            extractor: Box::new(extractor),
            links: Box::new(ArticleLinkPolicy::default()),
            limiter: Box::new(FixedDelay::new(plan.delay)),
            schema: RecordSchema::news(),
            instruction: DEFAULT_INSTRUCTION.to_string(),
            max_pages: 0,
            frontier,
            state,
            stats: CrawlStatistics::new(),
        }
    }

    /// Builds a crawler with the built-in HTTP fetcher, LLM extractor and JSON store
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to run
    /// * `Err(RippleError)` - Invalid configuration, missing API key, or the
    ///   store directory could not be created
    pub fn from_config(config: &Config) -> Result<Self, RippleError> {
        let plan = validate(config)?;
        let extractor = LlmExtractor::from_config(&config.extraction)?;
        let links = ArticleLinkPolicy::from_config(&config.links)?;
        let fetcher = HttpFetcher::new(&config.user_agent, &config.fetcher, &plan.guard)?;
        let store = open_store(Path::new(&config.output.data_root), plan.guard.domain())?;

        tracing::info!(
            "Storing records under {}, {}ms between requests",
            store.root().display(),
            plan.delay.as_millis()
        );

        Ok(Self::new(plan, store, fetcher, extractor)
            .with_link_policy(links)
            .with_instruction(&config.extraction.instruction)
            .with_max_pages(config.crawler.max_pages))
    }

    pub fn with_link_policy(mut self, links: impl LinkPolicy + 'static) -> Self {
        self.links = Box::new(links);
        self
    }

    pub fn with_rate_limit(mut self, limiter: impl RateLimit + 'static) -> Self {
        self.limiter = Box::new(limiter);
        self
    }

    pub fn with_instruction(mut self, instruction: &str) -> Self {
        self.instruction = instruction.to_string();
        self
    }

    /// Caps the number of URLs dequeued in one run (0 = unbounded)
    pub fn with_max_pages(mut self, max_pages: u64) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    /// Number of URLs still waiting
    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    pub fn statistics(&self) -> &CrawlStatistics {
        &self.stats
    }

    /// Runs the main crawl loop until the queue is empty
    ///
    /// Per-URL failures are logged and the loop moves on; nothing that
    /// happens to a single URL ends the crawl.
    pub async fn run(&mut self) -> CrawlStatistics {
        tracing::info!(
            "Starting crawl from {} (domain {}{}, {} queued)",
            self.seed,
            self.guard.domain(),
            if self.guard.includes_subdomains() {
                " and subdomains"
            } else {
                ""
            },
            self.frontier.len()
        );

        let start_time = Instant::now();
        self.stats.record_enqueued(self.frontier.len());

        loop {
            self.transition(CrawlState::for_queue_len(self.frontier.len()));
            if self.state.is_done() {
                tracing::info!("Queue is empty, crawl complete");
                break;
            }

            if self.max_pages > 0 && self.stats.dequeued >= self.max_pages {
                tracing::info!(
                    "Reached max-pages limit of {}, stopping with {} URLs still queued",
                    self.max_pages,
                    self.frontier.len()
                );
                self.transition(CrawlState::Done);
                break;
            }

            let Some(queued) = self.frontier.pop() else {
                continue;
            };
            self.transition(CrawlState::Draining);
            tracing::debug!("Processing URL: {} (depth {})", queued.url, queued.depth);

            let outcome = self.process_url(&queued).await;
            self.stats.record(outcome, queued.depth);

            if outcome.is_rate_limited() {
                self.limiter.wait().await;
            }

            if self.stats.dequeued % 10 == 0 {
                let elapsed = start_time.elapsed();
                let rate = self.stats.dequeued as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
                tracing::info!(
                    "Progress: {} URLs processed, {} stored, {} in queue, {:.2} URLs/sec",
                    self.stats.dequeued,
                    self.stats.persisted() + self.stats.cache_hits(),
                    self.frontier.len(),
                    rate
                );
            }
        }

        self.stats.elapsed = start_time.elapsed();
        tracing::info!(
            "Crawl completed: {} URLs processed ({} new records, {} cached, {} failed) in {:?}",
            self.stats.dequeued,
            self.stats.persisted(),
            self.stats.cache_hits(),
            self.stats.failures(),
            self.stats.elapsed
        );

        self.stats.clone()
    }

    fn transition(&mut self, next: CrawlState) {
        if self.state != next {
            debug_assert!(
                self.state.can_transition_to(next),
                "illegal crawl state transition {} -> {}",
                self.state,
                next
            );
            self.state = next;
        }
    }

    /// Processes a single dequeued URL
    ///
    /// This method:
    /// 1. Drops the URL if it was already visited this run
    /// 2. Marks it visited
    /// 3. Drops it if it is outside the target domain
    /// 4. Reuses the stored record if it reads back, otherwise fetches,
    ///    extracts and persists
    /// 5. Enqueues newly discovered article links at depth + 1
    async fn process_url(&mut self, queued: &QueuedUrl) -> UrlOutcome {
        let QueuedUrl {
            url,
            fetch_url,
            fingerprint,
            depth,
        } = queued;

        if !self.frontier.mark_visited(fingerprint) {
            tracing::debug!("Skipping already visited URL: {}", url);
            return UrlOutcome::AlreadyVisited;
        }

        if !self.guard.allowed(url) {
            log_failure(
                url,
                &RippleError::OutOfDomain {
                    url: url.to_string(),
                    domain: self.guard.domain().to_string(),
                },
            );
            return UrlOutcome::OutOfDomain;
        }

        let (outcome, links) = match self.stored_record(url, fingerprint) {
            Some(record) => {
                tracing::info!(
                    "Cache hit for {} ({}: \"{}\"), skipping fetch",
                    url,
                    fingerprint,
                    record.title
                );
                let links = self.cached_links(url, fetch_url, fingerprint).await;
                (UrlOutcome::CacheHit, links)
            }
            None => self.fetch_and_extract(url, fetch_url, fingerprint).await,
        };

        let found = links.len();
        let enqueued = self.enqueue_links(links, depth + 1);
        if found > 0 {
            tracing::info!(
                "Discovered {} article links on {}, {} new enqueued",
                found,
                url,
                enqueued
            );
        }

        outcome
    }

    /// Reads back the stored record for a fingerprint
    ///
    /// A record that exists but cannot be read is logged and treated as
    /// absent, so the page is crawled again and the record replaced.
    fn stored_record(&self, url: &Url, fingerprint: &Fingerprint) -> Option<NewsRecord> {
        if !self.store.exists(fingerprint) {
            return None;
        }
        match self.store.read(fingerprint) {
            Ok(record) => Some(record),
            Err(e) => {
                log_failure(url, &e.into());
                tracing::info!("Crawling {} again to replace its unreadable record", url);
                None
            }
        }
    }

    /// Fetch, extract and persist path for a URL with no usable stored record
    ///
    /// Links are returned whenever the page was fetched, even if extraction
    /// or persistence failed afterwards.
    async fn fetch_and_extract(
        &mut self,
        url: &Url,
        fetch_url: &Url,
        fingerprint: &Fingerprint,
    ) -> (UrlOutcome, DiscoveredLinks) {
        let page = match self.fetcher.fetch(fetch_url).await {
            Ok(page) => page,
            Err(e) => {
                log_failure(url, &e.into());
                return (UrlOutcome::FetchFailed, DiscoveredLinks::new());
            }
        };

        let links = self.links.extract_links(&page.markdown, &page.url);

        let record = match self
            .extractor
            .extract(&page, &self.schema, &self.instruction)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                log_failure(url, &e.into());
                return (UrlOutcome::ExtractionFailed, links);
            }
        };

        if let Err(e) = self.persist(fingerprint, &record, &links) {
            log_failure(url, &e.into());
            return (UrlOutcome::StorageFailed, links);
        }

        tracing::info!("Stored record for {} as {}", url, fingerprint);
        (UrlOutcome::Persisted, links)
    }

    /// Writes the link list first so a stored record always has one
    fn persist(
        &mut self,
        fingerprint: &Fingerprint,
        record: &NewsRecord,
        links: &DiscoveredLinks,
    ) -> Result<(), StorageError> {
        self.store.write_links(fingerprint, &link_strings(links))?;
        self.store.write(fingerprint, record)
    }

    /// Discovery for a URL whose record is already stored
    ///
    /// Uses the saved link list when there is one. Records written without a
    /// link list get their page fetched again (never re-extracted) and the
    /// list is saved for next time.
    async fn cached_links(
        &mut self,
        url: &Url,
        fetch_url: &Url,
        fingerprint: &Fingerprint,
    ) -> DiscoveredLinks {
        match self.store.read_links(fingerprint) {
            Ok(Some(saved)) => {
                let mut links = DiscoveredLinks::new();
                for link in &saved {
                    match (normalize_url(link), Url::parse(link)) {
                        (Ok(identity), Ok(target)) => {
                            links.entry(identity).or_insert(target);
                        }
                        (Err(e), _) => tracing::debug!("Dropping saved link '{}': {}", link, e),
                        (_, Err(e)) => tracing::debug!("Dropping saved link '{}': {}", link, e),
                    }
                }
                return links;
            }
            Ok(None) => {
                tracing::debug!("No saved links for {}, fetching page for discovery", url);
            }
            Err(e) => {
                tracing::warn!(
                    "Unreadable saved links for {}: {}, fetching page for discovery",
                    url,
                    e
                );
            }
        }

        let page = match self.fetcher.fetch(fetch_url).await {
            Ok(page) => page,
            Err(e) => {
                log_failure(url, &e.into());
                return DiscoveredLinks::new();
            }
        };

        let links = self.links.extract_links(&page.markdown, &page.url);
        if let Err(e) = self.store.write_links(fingerprint, &link_strings(&links)) {
            log_failure(url, &e.into());
        }
        links
    }

    /// Enqueues in-domain links not yet visited or queued
    ///
    /// # Returns
    ///
    /// Number of URLs added to the queue
    fn enqueue_links(&mut self, links: DiscoveredLinks, depth: u32) -> usize {
        let mut added = 0;
        for (link, fetch_url) in links {
            if !self.guard.allowed(&link) {
                tracing::debug!("Not following out-of-domain link {}", link);
                continue;
            }
            if self.frontier.push(link.clone(), fetch_url, depth) {
                tracing::debug!("Added to queue: {} (depth {})", link, depth);
                added += 1;
            }
        }
        self.stats.record_enqueued(added);
        added
    }
}

/// Saved link lists hold the requestable spelling; identity is recomputed on load
fn link_strings(links: &DiscoveredLinks) -> Vec<String> {
    links.values().map(|u| u.to_string()).collect()
}

/// Logs a per-URL failure with its kind label
fn log_failure(url: &Url, err: &RippleError) {
    match err {
        RippleError::OutOfDomain { .. } | RippleError::Extraction(_) => {
            tracing::warn!("{} [{}]: {}", url, err.kind(), err);
        }
        _ => {
            tracing::error!("{} [{}]: {}", url, err.kind(), err);
        }
    }
}

/// Runs a complete crawl from configuration
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Validate the configuration and resolve the API key
/// 2. Open the domain-scoped record store
/// 3. Build the HTTP fetcher and LLM extractor
/// 4. Drain the queue from the seed URL
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Crawl completed
/// * `Err(RippleError)` - Startup failed; no URL was processed
pub async fn run_crawl(config: &Config) -> Result<CrawlStatistics, RippleError> {
    let mut crawler = Crawler::from_config(config)?;
    Ok(crawler.run().await)
}
