use super::ObjectStore;
use crate::{Error, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectCannedAcl, ObjectIdentifier};
use aws_sdk_s3::{config::Region, Client as S3Client};
use tracing::debug;

pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
    public_base_url: String,
}

impl S3ObjectStore {
    pub async fn new(
        access_key_id: String,
        secret_access_key: String,
        endpoint: Option<String>,
        region: String,
        bucket: String,
        public_base_url: String,
    ) -> Result<Self> {
        let credentials = aws_sdk_s3::config::Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "content-admin",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region));
        // S3-compatible backends are reached through a custom endpoint
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: S3Client::from_conf(s3_config),
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> Result<String> {
        let body = ByteStream::from(data.to_vec());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("Failed to upload file: {}", e)))?;

        debug!("Stored {} ({} bytes) in bucket {}", key, data.len(), self.bucket);
        Ok(key.to_string())
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Storage(format!("Invalid object key: {}", e)))?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| Error::Storage(format!("Invalid delete request: {}", e)))?;

        let output = self
            .client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("Failed to delete files: {}", e)))?;

        let failed: Vec<String> = output
            .errors()
            .iter()
            .map(|err| {
                format!(
                    "{} ({})",
                    err.key().unwrap_or("<unknown>"),
                    err.message().unwrap_or("no message")
                )
            })
            .collect();
        if !failed.is_empty() {
            return Err(Error::Storage(format!(
                "Failed to delete {} file(s): {}",
                failed.len(),
                failed.join(", ")
            )));
        }

        debug!("Removed {} object(s) from bucket {}", keys.len(), self.bucket);
        Ok(())
    }

    fn public_base_url(&self) -> &str {
        &self.public_base_url
    }
}
