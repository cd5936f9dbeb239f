use super::UploadCandidate;
use crate::models::{Config, DEFAULT_UPLOAD_MAX_BYTES};

pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Result of checking one candidate against the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub reason: Option<String>,
}

impl ValidationOutcome {
    pub fn accepted() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn rejected(reason: String) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_file_size_bytes: u64,
    pub allowed_mime_types: &'static [&'static str],
    /// Gallery uploads in flight at once. 1 keeps them strictly sequential.
    pub max_concurrent_uploads: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_UPLOAD_MAX_BYTES,
            allowed_mime_types: ALLOWED_IMAGE_TYPES,
            max_concurrent_uploads: 1,
        }
    }
}

impl UploadPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_file_size_bytes: config.upload_max_bytes,
            max_concurrent_uploads: config.upload_concurrency.max(1),
            ..Self::default()
        }
    }

    pub fn with_max_concurrent_uploads(mut self, max: usize) -> Self {
        self.max_concurrent_uploads = max.max(1);
        self
    }

    /// Pure check of size and declared content type.
    pub fn validate(&self, candidate: &UploadCandidate) -> ValidationOutcome {
        if candidate.size() > self.max_file_size_bytes {
            return ValidationOutcome::rejected(format!(
                "File size exceeds {} limit",
                format_limit(self.max_file_size_bytes)
            ));
        }

        // Parameters such as `; charset=` do not change the media type
        let media_type = candidate
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();
        let allowed = self
            .allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(media_type));
        if !allowed {
            let declared = if media_type.is_empty() {
                "unknown"
            } else {
                media_type
            };
            return ValidationOutcome::rejected(format!(
                "Invalid file type: {}. Allowed types: {}",
                declared,
                self.allowed_mime_types.join(", ")
            ));
        }

        ValidationOutcome::accepted()
    }
}

fn format_limit(bytes: u64) -> String {
    if bytes >= BYTES_PER_MB && bytes % BYTES_PER_MB == 0 {
        format!("{}MB", bytes / BYTES_PER_MB)
    } else {
        format!("{} bytes", bytes)
    }
}
