//! Storage traits and error types
//!
//! This module defines the trait interface for record stores and
//! associated error types.

use crate::record::NewsRecord;
use crate::url::Fingerprint;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("No record stored for fingerprint {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable record of completed crawl work, keyed by URL fingerprint
///
/// The store is the authority on "already processed": the crawler consults
/// [`RecordStore::exists`] before any fetch, so a restarted process resumes
/// without refetching finished pages. Implementations need not be safe for
/// concurrent writers, but a reader must never observe a half-written record.
pub trait RecordStore: Send {
    // ===== Records =====

    /// Returns true iff a record was previously written for this key
    fn exists(&self, key: &Fingerprint) -> bool;

    /// Reads the record for a key
    ///
    /// # Returns
    ///
    /// * `Ok(NewsRecord)` - The record exactly as written
    /// * `Err(StorageError::NotFound)` - Nothing stored for this key
    fn read(&self, key: &Fingerprint) -> StorageResult<NewsRecord>;

    /// Writes (or overwrites) the record for a key
    fn write(&mut self, key: &Fingerprint, record: &NewsRecord) -> StorageResult<()>;

    // ===== Discovered links =====

    /// Reads the link candidates found on the page when it was first fetched
    ///
    /// `Ok(None)` means no link list was ever saved for this key.
    fn read_links(&self, key: &Fingerprint) -> StorageResult<Option<Vec<String>>>;

    /// Saves the link candidates found on a page
    fn write_links(&mut self, key: &Fingerprint, links: &[String]) -> StorageResult<()>;

    // ===== Inspection =====

    /// Lists every key that has a record, sorted
    fn keys(&self) -> StorageResult<Vec<Fingerprint>>;
}
