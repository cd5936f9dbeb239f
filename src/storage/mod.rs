//! Object storage for uploaded content images
//!
//! Wraps the bucket behind an injectable trait so the submit workflow can run
//! against S3-compatible storage or an in-memory fake.

pub mod client;
pub mod mock;

pub use client::S3ObjectStore;
pub use mock::MockObjectStore;

use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key` and return the stored object path.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> Result<String>;

    /// Batch delete. Keys that do not exist are not an error.
    async fn remove(&self, keys: &[String]) -> Result<()>;

    /// Public URL prefix for objects in the bucket, without a trailing slash.
    fn public_base_url(&self) -> &str;

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url(), path)
    }

    /// Reverse of [`ObjectStore::public_url`] for URLs served from this bucket.
    fn key_for_url(&self, url: &str) -> Option<String> {
        storage_key_from_public_url(self.public_base_url(), url)
    }
}

/// Extract the storage key from a public URL, ignoring query strings.
///
/// Returns `None` when the URL does not live under `base_url`.
pub fn storage_key_from_public_url(base_url: &str, url: &str) -> Option<String> {
    let base = base_url.trim_end_matches('/');
    let rest = url.strip_prefix(base)?.strip_prefix('/')?;
    let key = rest.split(['?', '#']).next().unwrap_or_default();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}
