//! Application wiring for the content dashboard backend.

use crate::cleanup;
use crate::models::{AssetRefs, Config, EntityKind, Record};
use crate::records::{MockRecordStore, RecordStore, RestRecordStore};
use crate::storage::{MockObjectStore, ObjectStore, S3ObjectStore};
use crate::upload::UploadPolicy;
use crate::workflow::{Submission, SubmitWorkflow, WorkflowOutcome};
use crate::{Error, Result};
use tracing::info;

/// Holds the injected storage and record clients plus the upload policy.
pub struct App {
    storage: Box<dyn ObjectStore>,
    records: Box<dyn RecordStore>,
    policy: UploadPolicy,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub storage: Box<dyn ObjectStore>,
    pub records: Box<dyn RecordStore>,
}

fn require(value: &Option<String>, name: &str) -> Result<String> {
    value
        .clone()
        .ok_or_else(|| Error::Config(format!("{} not set", name)))
}

impl App {
    pub fn with_services(services: AppServices, policy: UploadPolicy) -> Self {
        Self {
            storage: services.storage,
            records: services.records,
            policy,
        }
    }

    /// Construct an app from environment configuration (`Config::from_env`).
    pub async fn new() -> Result<Self> {
        let config = Config::from_env()?;
        Self::from_config(&config).await
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        let policy = UploadPolicy::from_config(config);

        let services = if config.dry_run {
            info!("DRY_RUN enabled, using in-memory storage and records");
            AppServices {
                storage: Box::new(
                    MockObjectStore::new()
                        .with_public_base_url(config.storage_public_base_url.clone()),
                ),
                records: Box::new(MockRecordStore::new()),
            }
        } else {
            let storage = S3ObjectStore::new(
                require(&config.storage_access_key_id, "STORAGE_ACCESS_KEY_ID")?,
                require(&config.storage_secret_access_key, "STORAGE_SECRET_ACCESS_KEY")?,
                config.storage_endpoint.clone(),
                config.storage_region.clone(),
                config.storage_bucket.clone(),
                config.storage_public_base_url.clone(),
            )
            .await?;
            let records = RestRecordStore::new(
                require(&config.records_url, "RECORDS_URL")?,
                require(&config.records_api_key, "RECORDS_API_KEY")?,
            )?;
            info!(
                "Using bucket {} and record store {}",
                config.storage_bucket,
                config.records_url.as_deref().unwrap_or_default()
            );
            AppServices {
                storage: Box::new(storage),
                records: Box::new(records),
            }
        };

        Ok(Self::with_services(services, policy))
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Upload attached images, save the record, and undo the uploads if the
    /// save fails.
    pub async fn submit(&self, submission: Submission) -> WorkflowOutcome {
        SubmitWorkflow::new(self.storage.as_ref(), self.records.as_ref(), &self.policy)
            .run(submission)
            .await
    }

    pub async fn fetch_record(&self, kind: EntityKind, id: &str) -> Result<Record> {
        self.records.fetch(kind, id).await
    }

    /// Delete a record, then remove the images it referenced.
    ///
    /// A failed delete leaves both the row and its images in place.
    pub async fn delete_record(&self, kind: EntityKind, id: &str) -> Result<()> {
        let record = self.records.fetch(kind, id).await?;
        let assets = AssetRefs::from_record(kind, &record);

        self.records.delete(kind, id).await?;
        info!("[{}] Deleted record {}", kind, id);

        cleanup::remove_record_assets(self.storage.as_ref(), &assets).await;
        Ok(())
    }
}
