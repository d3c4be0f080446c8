//! URL handling module for News-Ripple
//!
//! This module provides URL normalization, fingerprinting, domain extraction,
//! wildcard matching, and the [`DomainGuard`] that confines a crawl to one site.
//!
//! All three consumers of URL identity (the visited set, the domain check and
//! the store key) go through [`normalize_url`], so two spellings of the same
//! page can never be processed or stored twice.

mod domain;
mod fingerprint;
mod matcher;
mod normalize;

pub use domain::{extract_domain, DomainGuard};
pub use fingerprint::{fingerprint, Fingerprint, FINGERPRINT_LEN};
pub use matcher::matches_wildcard;
pub use normalize::normalize_url;
