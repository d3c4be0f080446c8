//! JSON file storage implementation
//!
//! Layout: `<data_root>/<domain>/<fingerprint>/result.json`, with the page's
//! discovered links next to it in `links.json`.

use crate::record::NewsRecord;
use crate::storage::traits::{RecordStore, StorageError, StorageResult};
use crate::url::Fingerprint;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of the extracted record inside a fingerprint directory
pub const RESULT_FILE: &str = "result.json";

/// File name of the discovered link list inside a fingerprint directory
pub const LINKS_FILE: &str = "links.json";

/// One directory per fingerprint under a domain-scoped root
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Opens (creating if needed) the store for one domain under `data_root`
    ///
    /// # Arguments
    ///
    /// * `data_root` - Base directory shared by all domains
    /// * `domain` - Normalized target domain; becomes the directory name
    ///
    /// # Returns
    ///
    /// * `Ok(JsonFileStore)` - Store rooted at `<data_root>/<domain>`
    /// * `Err(StorageError)` - The directory could not be created
    pub fn open(data_root: impl AsRef<Path>, domain: &str) -> StorageResult<Self> {
        let root = data_root.as_ref().join(domain);
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The domain-scoped root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record file for a key
    pub fn result_path(&self, key: &Fingerprint) -> PathBuf {
        self.root.join(key.as_str()).join(RESULT_FILE)
    }

    fn links_path(&self, key: &Fingerprint) -> PathBuf {
        self.root.join(key.as_str()).join(LINKS_FILE)
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        write_atomic(path, &bytes)
    }

    fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<T> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            StorageError::Serialization(format!("{}: {}", path.display(), e))
        })
    }
}

impl RecordStore for JsonFileStore {
    fn exists(&self, key: &Fingerprint) -> bool {
        self.result_path(key).is_file()
    }

    fn read(&self, key: &Fingerprint) -> StorageResult<NewsRecord> {
        let path = self.result_path(key);
        if !path.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Self::read_json(&path)
    }

    fn write(&mut self, key: &Fingerprint, record: &NewsRecord) -> StorageResult<()> {
        self.write_json(&self.result_path(key), record)
    }

    fn read_links(&self, key: &Fingerprint) -> StorageResult<Option<Vec<String>>> {
        let path = self.links_path(key);
        if !path.is_file() {
            return Ok(None);
        }
        Self::read_json(&path).map(Some)
    }

    fn write_links(&mut self, key: &Fingerprint, links: &[String]) -> StorageResult<()> {
        self.write_json(&self.links_path(key), links)
    }

    fn keys(&self) -> StorageResult<Vec<Fingerprint>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(key) = name.to_str().and_then(Fingerprint::parse) else {
                continue;
            };
            if self.exists(&key) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Writes a file so readers see either the old content or the new, never a prefix
///
/// The bytes go to a sibling temp file which is synced and then renamed over
/// the target; rename is atomic within one directory.
fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| StorageError::Serialization(format!("no parent for {}", path.display())))?;
    fs::create_dir_all(dir)?;

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = dir.join(tmp_name);

    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}
