use super::mime::declared_content_type;
use crate::Result;
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Leading bytes kept from a file too large to load, enough for type sniffing.
const SNIFF_BYTES: u64 = 32;

/// A user-selected file for one submit action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCandidate {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
    size: u64,
}

impl UploadCandidate {
    pub fn new(filename: &str, content_type: &str, data: Vec<u8>) -> Self {
        Self {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size: data.len() as u64,
            data,
        }
    }

    /// Read a local file, declaring its type from the extension or contents.
    ///
    /// Files larger than `max_bytes` are not read into memory. The candidate
    /// keeps the on-disk size so the upload policy rejects it with the usual
    /// reason, but carries no data.
    pub async fn from_path(path: &Path, max_bytes: u64) -> Result<Self> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let size = tokio::fs::metadata(path).await?.len();

        if size > max_bytes {
            tracing::debug!(
                "Not loading {} ({} bytes exceeds {} byte limit)",
                path.display(),
                size,
                max_bytes
            );
            let mut head = Vec::new();
            tokio::fs::File::open(path)
                .await?
                .take(SNIFF_BYTES)
                .read_to_end(&mut head)
                .await?;
            return Ok(Self {
                filename,
                content_type: declared_content_type(path, &head),
                data: Vec::new(),
                size,
            });
        }

        let data = tokio::fs::read(path).await?;
        let content_type = declared_content_type(path, &data);

        Ok(Self {
            filename,
            content_type,
            size: data.len() as u64,
            data,
        })
    }

    /// Size of the file, whether or not its contents were loaded.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// False when the file was too large to read into memory.
    pub fn is_loaded(&self) -> bool {
        self.data.len() as u64 == self.size
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Stored; both fields are non-empty.
    Uploaded {
        storage_key: String,
        public_url: String,
    },
    /// Failed policy validation. Nothing was sent to the store.
    Rejected { reason: String },
    /// The store or transport returned an error.
    Failed { error: String },
}

/// One result per attempted candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub source_filename: String,
    pub outcome: UploadOutcome,
}

impl UploadResult {
    pub fn uploaded(source_filename: String, storage_key: String, public_url: String) -> Self {
        Self {
            source_filename,
            outcome: UploadOutcome::Uploaded {
                storage_key,
                public_url,
            },
        }
    }

    pub fn rejected(source_filename: String, reason: String) -> Self {
        Self {
            source_filename,
            outcome: UploadOutcome::Rejected { reason },
        }
    }

    pub fn failed(source_filename: String, error: String) -> Self {
        Self {
            source_filename,
            outcome: UploadOutcome::Failed { error },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, UploadOutcome::Uploaded { .. })
    }

    pub fn storage_key(&self) -> Option<&str> {
        match &self.outcome {
            UploadOutcome::Uploaded { storage_key, .. } => Some(storage_key),
            _ => None,
        }
    }

    pub fn public_url(&self) -> Option<&str> {
        match &self.outcome {
            UploadOutcome::Uploaded { public_url, .. } => Some(public_url),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            UploadOutcome::Uploaded { .. } => None,
            UploadOutcome::Rejected { reason } => Some(reason),
            UploadOutcome::Failed { error } => Some(error),
        }
    }
}
