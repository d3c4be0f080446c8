/// Crawl-level state for the traversal loop
use std::fmt;

/// Where the crawler is in its queue-draining cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    /// Queue is non-empty; the next URL can be dequeued
    Running,

    /// A URL has been dequeued and is being processed
    Draining,

    /// Queue is empty (or the page cap was hit); nothing more happens
    Done,
}

impl CrawlState {
    /// State the loop is in before dequeuing, given the queue length
    pub fn for_queue_len(len: usize) -> Self {
        if len == 0 {
            Self::Done
        } else {
            Self::Running
        }
    }

    /// Returns true once the crawl has finished
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Checks whether moving to `next` is a legal transition
    ///
    /// `Running → Draining`, `Draining → Running | Done`, `Running → Done`
    /// (cap reached). `Done` is terminal.
    pub fn can_transition_to(&self, next: CrawlState) -> bool {
        matches!(
            (self, next),
            (Self::Running, Self::Draining)
                | (Self::Running, Self::Done)
                | (Self::Draining, Self::Running)
                | (Self::Draining, Self::Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
