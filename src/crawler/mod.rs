//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with robots.txt checks and HTML to markdown rendering
//! - Article link discovery
//! - Structured extraction through an LLM
//! - Frontier management and rate limiting
//! - Overall crawl coordination

mod coordinator;
mod extractor;
mod fetcher;
mod links;
mod parser;
mod scheduler;

pub use coordinator::{run_crawl, Crawler, DEFAULT_INSTRUCTION};
pub use extractor::{parse_record, ExtractionError, Extractor, LlmExtractor};
pub use fetcher::{build_http_client, FetchError, HttpFetcher, Page, PageSource};
pub use links::{ArticleLinkPolicy, DiscoveredLinks, LinkPolicy};
pub use parser::{html_to_markdown, RenderedPage};
pub use scheduler::{FixedDelay, Frontier, QueuedUrl, RateLimit};
