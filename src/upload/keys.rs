//! Storage key generation.
//!
//! Key format: `{folder}/{unix_millis}-{random suffix}-{sanitized filename}`.
//! Uniqueness across sessions is probabilistic, not transactional.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;

const SUFFIX_LEN: usize = 8;

pub fn generate_storage_key(folder: &str, filename: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect();

    format!(
        "{}/{}-{}-{}",
        folder.trim_matches('/'),
        Utc::now().timestamp_millis(),
        suffix,
        sanitize_filename(filename)
    )
}

/// Reduce a user-supplied filename to a safe single path segment.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();

    let mut sanitized = String::with_capacity(base.len());
    for ch in base.chars() {
        let ch = if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            ch
        } else {
            '-'
        };
        if ch == '-' && sanitized.ends_with('-') {
            continue;
        }
        sanitized.push(ch);
    }

    let trimmed = sanitized.trim_matches(|c| c == '-' || c == '.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}
