use crate::url::normalize::normalize_url;
use crate::UrlError;
use sha2::{Digest, Sha256};
use std::fmt;
use url::{Position, Url};

/// Number of hex characters in a fingerprint (128 bits of SHA-256)
pub const FINGERPRINT_LEN: usize = 32;

/// Storage key derived from a normalized URL
///
/// Always [`FINGERPRINT_LEN`] lowercase hex characters, so it is safe as a
/// single path segment on every filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprints a URL that has already been through [`normalize_url`]
    ///
    /// The scheme is not part of the key: `http` and `https` variants of the
    /// same page share one record.
    pub fn from_normalized(url: &Url) -> Self {
        let key = &url[Position::BeforeHost..Position::AfterQuery];
        let digest = Sha256::digest(key.as_bytes());
        Self(hex::encode(&digest[..FINGERPRINT_LEN / 2]))
    }

    /// Wraps an existing key, e.g. a directory name read back from the store
    ///
    /// Returns `None` unless the string has the fingerprint shape.
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = raw.len() == FINGERPRINT_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        valid.then(|| Self(raw.to_string()))
    }

    /// The key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalizes a URL string and computes its fingerprint
///
/// # Returns
///
/// * `Ok(Fingerprint)` - Deterministic key for the URL
/// * `Err(UrlError)` - The URL could not be parsed or normalized
///
/// # Examples
///
/// ```
/// use news_ripple::url::fingerprint;
///
/// let a = fingerprint("https://www.example.com/NewsDetail.aspx?newsID=1#top").unwrap();
/// let b = fingerprint("https://example.com/NewsDetail.aspx?newsID=1").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str().len(), 32);
/// ```
pub fn fingerprint(url: &str) -> Result<Fingerprint, UrlError> {
    let normalized = normalize_url(url)?;
    Ok(Fingerprint::from_normalized(&normalized))
}
