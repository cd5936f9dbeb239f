use super::keys::generate_storage_key;
use super::{UploadCandidate, UploadPolicy, UploadResult};
use crate::storage::ObjectStore;
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

/// Validates candidates and pushes the valid ones to object storage.
pub struct UploadCoordinator<'a> {
    store: &'a dyn ObjectStore,
    policy: &'a UploadPolicy,
}

impl<'a> UploadCoordinator<'a> {
    pub fn new(store: &'a dyn ObjectStore, policy: &'a UploadPolicy) -> Self {
        Self { store, policy }
    }

    /// Validate, then upload a single candidate under `folder`.
    ///
    /// Never returns an error: every failure is captured in the result.
    pub async fn upload_one(&self, folder: &str, candidate: &UploadCandidate) -> UploadResult {
        let validation = self.policy.validate(candidate);
        if !validation.valid {
            let reason = validation
                .reason
                .unwrap_or_else(|| "File rejected by upload policy".to_string());
            warn!("Rejected {}: {}", candidate.filename, reason);
            return UploadResult::rejected(candidate.filename.clone(), reason);
        }
        if !candidate.is_loaded() {
            warn!("Rejected {}: contents were not loaded", candidate.filename);
            return UploadResult::rejected(
                candidate.filename.clone(),
                format!("File contents were not loaded ({} bytes)", candidate.size()),
            );
        }

        let key = generate_storage_key(folder, &candidate.filename);
        debug!(
            "Uploading {} ({} bytes, {}) as {}",
            candidate.filename,
            candidate.size(),
            candidate.content_type,
            key
        );

        match self
            .store
            .upload(&key, &candidate.data, &candidate.content_type)
            .await
        {
            Ok(path) if !path.is_empty() => {
                let public_url = self.store.public_url(&path);
                UploadResult::uploaded(candidate.filename.clone(), path, public_url)
            }
            Ok(_) => {
                warn!("Store returned an empty path for {}", candidate.filename);
                UploadResult::failed(
                    candidate.filename.clone(),
                    "Storage returned an empty object path".to_string(),
                )
            }
            Err(e) => {
                warn!("Upload of {} failed: {}", candidate.filename, e);
                UploadResult::failed(candidate.filename.clone(), e.to_string())
            }
        }
    }

    /// Upload every candidate, returning one result per input in input order.
    ///
    /// Individual failures never stop the batch.
    pub async fn upload_all(
        &self,
        folder: &str,
        candidates: &[UploadCandidate],
    ) -> Vec<UploadResult> {
        stream::iter(candidates)
            .map(|candidate| self.upload_one(folder, candidate))
            .buffered(self.policy.max_concurrent_uploads.max(1))
            .collect()
            .await
    }
}
