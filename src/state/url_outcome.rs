/// Per-URL results of one pass through the crawl loop
use std::fmt;

/// What happened to a dequeued URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlOutcome {
    // ===== Success =====
    /// Fetched, extracted and written to the store
    Persisted,

    /// Record already in the store; fetch and extraction skipped
    CacheHit,

    // ===== Skips =====
    /// Dequeued a second time in this run
    AlreadyVisited,

    /// Host outside the target domain
    OutOfDomain,

    // ===== Failures (the crawl continues) =====
    /// Page could not be retrieved
    FetchFailed,

    /// Page retrieved but no record could be extracted; retried on a later run
    ExtractionFailed,

    /// Record could not be written or read
    StorageFailed,
}

impl UrlOutcome {
    /// Returns true if the URL has a record in the store afterwards
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Persisted | Self::CacheHit)
    }

    /// Returns true if the URL was dropped without any work
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::AlreadyVisited | Self::OutOfDomain)
    }

    /// Returns true if processing the URL failed
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::FetchFailed | Self::ExtractionFailed | Self::StorageFailed
        )
    }

    /// Whether the crawler should wait on the rate limiter after this outcome
    ///
    /// Every URL that reached the domain check pays the delay; an intra-run
    /// duplicate is discarded before that and costs nothing.
    pub fn is_rate_limited(&self) -> bool {
        !matches!(self, Self::AlreadyVisited)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Persisted => "persisted",
            Self::CacheHit => "cache_hit",
            Self::AlreadyVisited => "already_visited",
            Self::OutOfDomain => "out_of_domain",
            Self::FetchFailed => "fetch_failed",
            Self::ExtractionFailed => "extraction_failed",
            Self::StorageFailed => "storage_failed",
        }
    }

    /// Returns all possible outcomes
    pub fn all() -> [Self; 7] {
        [
            Self::Persisted,
            Self::CacheHit,
            Self::AlreadyVisited,
            Self::OutOfDomain,
            Self::FetchFailed,
            Self::ExtractionFailed,
            Self::StorageFailed,
        ]
    }
}

impl fmt::Display for UrlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
