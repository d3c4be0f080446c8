//! Storage module for persisting extracted records
//!
//! This module handles all durable state for the crawler, including:
//! - One JSON record per URL fingerprint, written atomically
//! - The link list discovered on each stored page, so resumed runs can keep
//!   traversing past already-stored pages
//! - Listing stored fingerprints for statistics

mod json;
mod traits;

pub use json::{JsonFileStore, LINKS_FILE, RESULT_FILE};
pub use traits::{RecordStore, StorageError, StorageResult};

use crate::RippleError;

use std::path::Path;

/// Opens the record store for a domain
///
/// # Arguments
///
/// * `data_root` - Base output directory from the configuration
/// * `domain` - Normalized target domain
///
/// # Returns
///
/// * `Ok(JsonFileStore)` - Store rooted at `<data_root>/<domain>`
/// * `Err(RippleError)` - The directory could not be created
pub fn open_store(data_root: &Path, domain: &str) -> Result<JsonFileStore, RippleError> {
    Ok(JsonFileStore::open(data_root, domain)?)
}
