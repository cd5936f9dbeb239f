//! Best-effort removal of storage objects.
//!
//! Cleanup failures are logged and swallowed. They never replace the error the
//! caller is already reporting; leftovers are orphaned objects, nothing more.

use crate::models::AssetRefs;
use crate::storage::ObjectStore;
use tracing::{error, info, warn};

/// Delete the objects uploaded by a submit that failed to save.
///
/// `keys` must be exactly this invocation's successful uploads.
pub async fn compensate(storage: &dyn ObjectStore, keys: &[String]) {
    if keys.is_empty() {
        return;
    }

    info!(
        "Removing {} file(s) uploaded before the failed save",
        keys.len()
    );
    remove_best_effort(storage, keys).await;
}

/// Delete the objects referenced by a record that no longer exists.
///
/// URLs that do not point into this bucket are left alone.
pub async fn remove_record_assets(storage: &dyn ObjectStore, assets: &AssetRefs) {
    let mut keys = Vec::new();
    for url in assets.urls() {
        match storage.key_for_url(url) {
            Some(key) => keys.push(key),
            None => warn!("Skipping asset outside the storage bucket: {}", url),
        }
    }

    if keys.is_empty() {
        return;
    }

    info!("Removing {} file(s) of the deleted record", keys.len());
    remove_best_effort(storage, &keys).await;
}

async fn remove_best_effort(storage: &dyn ObjectStore, keys: &[String]) {
    match storage.remove(keys).await {
        Ok(()) => info!("Removed {} file(s) from storage", keys.len()),
        Err(e) => {
            error!(
                "Failed to remove {} file(s) from storage, leaving them orphaned: {} (keys: {})",
                keys.len(),
                e,
                keys.join(", ")
            );
        }
    }
}
