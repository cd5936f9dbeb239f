//! Submit workflow for a content record with attached images.
//!
//! Uploads run first, then the record mutation. If the mutation fails, the
//! objects uploaded by this invocation are removed again. Objects referenced by
//! the previously saved record are never touched here, even when a new
//! featured image replaces one of them.

use crate::cleanup;
use crate::models::{AssetRefs, EntityKind, Record, RecordPayload};
use crate::records::RecordStore;
use crate::storage::ObjectStore;
use crate::upload::{UploadCandidate, UploadCoordinator, UploadOutcome, UploadPolicy};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::fmt;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitTarget {
    Create,
    Update { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSlot {
    /// Single primary image; any failure aborts the submit.
    Featured,
    /// Optional batch; failures become warnings.
    Gallery,
}

/// Everything one form submit hands to the workflow.
#[derive(Debug, Clone)]
pub struct Submission {
    pub kind: EntityKind,
    pub target: SubmitTarget,
    pub fields: Map<String, Value>,
    /// References the saved record already has and that the form keeps.
    pub existing_assets: AssetRefs,
    pub featured: Option<UploadCandidate>,
    pub gallery: Vec<UploadCandidate>,
}

impl Submission {
    pub fn create(kind: EntityKind, fields: Map<String, Value>) -> Self {
        Self {
            kind,
            target: SubmitTarget::Create,
            fields,
            existing_assets: AssetRefs::new(),
            featured: None,
            gallery: Vec::new(),
        }
    }

    pub fn update(
        kind: EntityKind,
        id: String,
        fields: Map<String, Value>,
        existing_assets: AssetRefs,
    ) -> Self {
        Self {
            kind,
            target: SubmitTarget::Update { id },
            fields,
            existing_assets,
            featured: None,
            gallery: Vec::new(),
        }
    }

    /// Start an edit from a persisted row.
    pub fn from_record(kind: EntityKind, record: &Record) -> Self {
        Self::update(
            kind,
            record.id.clone(),
            record.editable_fields(),
            AssetRefs::from_record(kind, record),
        )
    }

    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn with_featured(mut self, candidate: UploadCandidate) -> Self {
        self.featured = Some(candidate);
        self
    }

    pub fn with_gallery_image(mut self, candidate: UploadCandidate) -> Self {
        self.gallery.push(candidate);
        self
    }
}

/// A file that could not be stored, with the reason shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub slot: AssetSlot,
    pub filename: String,
    pub reason: String,
}

impl FileFailure {
    pub fn new(slot: AssetSlot, filename: String, reason: String) -> Self {
        Self {
            slot,
            filename,
            reason,
        }
    }
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.filename.is_empty() {
            f.write_str(&self.reason)
        } else {
            write!(f, "{}: {}", self.filename, self.reason)
        }
    }
}

#[derive(Debug)]
pub struct Submitted {
    pub record: Record,
    /// Gallery files that were skipped; the record saved without them.
    pub warnings: Vec<FileFailure>,
    pub uploaded_keys: Vec<String>,
}

/// Terminal state of one submit.
#[derive(Debug)]
pub enum WorkflowOutcome {
    Succeeded(Submitted),
    /// Rejected before anything was uploaded or saved.
    FailedValidation(Vec<FileFailure>),
    /// The featured image could not be uploaded; nothing was saved.
    FailedUpload(FileFailure),
    /// The record store rejected the payload. `uploaded_keys` were handed to
    /// cleanup before this outcome was returned.
    FailedMutation {
        error: Error,
        uploaded_keys: Vec<String>,
    },
    /// The store reported success but its response could not be read. The row
    /// may reference `uploaded_keys`, so they are kept in storage.
    Unconfirmed {
        error: Error,
        uploaded_keys: Vec<String>,
    },
}

impl WorkflowOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, WorkflowOutcome::Succeeded(_))
    }

    pub fn into_result(self) -> Result<Submitted> {
        match self {
            WorkflowOutcome::Succeeded(submitted) => Ok(submitted),
            WorkflowOutcome::FailedValidation(failures) => Err(Error::Validation(
                failures
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            )),
            WorkflowOutcome::FailedUpload(failure) => Err(Error::Upload {
                filename: failure.filename,
                reason: failure.reason,
            }),
            WorkflowOutcome::FailedMutation { error, .. }
            | WorkflowOutcome::Unconfirmed { error, .. } => Err(error),
        }
    }
}

pub struct SubmitWorkflow<'a> {
    storage: &'a dyn ObjectStore,
    records: &'a dyn RecordStore,
    policy: &'a UploadPolicy,
}

impl<'a> SubmitWorkflow<'a> {
    pub fn new(
        storage: &'a dyn ObjectStore,
        records: &'a dyn RecordStore,
        policy: &'a UploadPolicy,
    ) -> Self {
        Self {
            storage,
            records,
            policy,
        }
    }

    pub async fn run(&self, submission: Submission) -> WorkflowOutcome {
        let Submission {
            kind,
            target,
            fields,
            existing_assets,
            featured,
            gallery,
        } = submission;

        let shape_failures = check_shape(kind, &existing_assets, featured.as_ref(), &gallery);
        if !shape_failures.is_empty() {
            warn!("[{}] Submission rejected before upload", kind);
            return WorkflowOutcome::FailedValidation(shape_failures);
        }

        let coordinator = UploadCoordinator::new(self.storage, self.policy);
        let folder = kind.storage_folder();
        let mut uploaded_keys = Vec::new();

        let mut featured_url = None;
        if let Some(candidate) = &featured {
            let result = coordinator.upload_one(folder, candidate).await;
            match result.outcome {
                UploadOutcome::Uploaded {
                    storage_key,
                    public_url,
                } => {
                    info!("[{}] Uploaded featured image {}", kind, storage_key);
                    uploaded_keys.push(storage_key);
                    featured_url = Some(public_url);
                }
                UploadOutcome::Rejected { reason } => {
                    return WorkflowOutcome::FailedValidation(vec![FileFailure::new(
                        AssetSlot::Featured,
                        result.source_filename,
                        reason,
                    )]);
                }
                UploadOutcome::Failed { error } => {
                    error!(
                        "[{}] Featured image upload failed, aborting submit: {}",
                        kind, error
                    );
                    return WorkflowOutcome::FailedUpload(FileFailure::new(
                        AssetSlot::Featured,
                        result.source_filename,
                        error,
                    ));
                }
            }
        }

        let mut gallery_urls = Vec::new();
        let mut warnings = Vec::new();
        for result in coordinator.upload_all(folder, &gallery).await {
            match result.outcome {
                UploadOutcome::Uploaded {
                    storage_key,
                    public_url,
                } => {
                    uploaded_keys.push(storage_key);
                    gallery_urls.push(public_url);
                }
                UploadOutcome::Rejected { reason: message }
                | UploadOutcome::Failed { error: message } => {
                    warnings.push(FileFailure::new(
                        AssetSlot::Gallery,
                        result.source_filename,
                        message,
                    ));
                }
            }
        }
        if !gallery.is_empty() {
            info!(
                "[{}] Uploaded {}/{} gallery image(s)",
                kind,
                gallery_urls.len(),
                gallery.len()
            );
        }
        for warning in &warnings {
            warn!("[{}] Gallery image skipped: {}", kind, warning);
        }

        let assets = existing_assets.merged(featured_url, gallery_urls);
        let payload = RecordPayload::new(kind, fields, assets);

        let mutation = match &target {
            SubmitTarget::Create => self.records.insert(&payload).await,
            SubmitTarget::Update { id } => self.records.update(id, &payload).await,
        };

        match mutation {
            Ok(record) => {
                info!("[{}] Saved record {}", kind, record.id);
                WorkflowOutcome::Succeeded(Submitted {
                    record,
                    warnings,
                    uploaded_keys,
                })
            }
            Err(error @ Error::UnreadableResponse(_)) => {
                warn!(
                    "[{}] Record store answered success without a usable row; keeping {} upload(s): {}",
                    kind,
                    uploaded_keys.len(),
                    error
                );
                WorkflowOutcome::Unconfirmed {
                    error,
                    uploaded_keys,
                }
            }
            Err(error) => {
                error!("[{}] Saving record failed: {}", kind, error);
                cleanup::compensate(self.storage, &uploaded_keys).await;
                WorkflowOutcome::FailedMutation {
                    error,
                    uploaded_keys,
                }
            }
        }
    }
}

/// Structural checks that need no network access.
fn check_shape(
    kind: EntityKind,
    existing: &AssetRefs,
    featured: Option<&UploadCandidate>,
    gallery: &[UploadCandidate],
) -> Vec<FileFailure> {
    let mut failures = Vec::new();

    if !kind.supports_gallery() {
        failures.extend(gallery.iter().map(|candidate| {
            FileFailure::new(
                AssetSlot::Gallery,
                candidate.filename.clone(),
                format!("Gallery images are not supported for {} records", kind),
            )
        }));
    }

    if kind.requires_featured_image() && featured.is_none() && existing.featured_image_url.is_none()
    {
        failures.push(FileFailure::new(
            AssetSlot::Featured,
            String::new(),
            format!("An image is required for {} records", kind),
        ));
    }

    failures
}
