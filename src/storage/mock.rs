use super::ObjectStore;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory bucket with failure injection and call tracking.
#[derive(Clone)]
pub struct MockObjectStore {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    public_base_url: String,
    upload_count: Arc<Mutex<usize>>,
    remove_calls: Arc<Mutex<Vec<Vec<String>>>>,
    failing_uploads: Arc<Mutex<Vec<String>>>,
    fail_removes: Arc<Mutex<bool>>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            public_base_url: "https://mock-storage.example.com/public".to_string(),
            upload_count: Arc::new(Mutex::new(0)),
            remove_calls: Arc::new(Mutex::new(Vec::new())),
            failing_uploads: Arc::new(Mutex::new(Vec::new())),
            fail_removes: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_public_base_url(mut self, base_url: String) -> Self {
        self.public_base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_file(self, key: String, content: Vec<u8>) -> Self {
        self.files.lock().unwrap().insert(key, content);
        self
    }

    /// Fail every upload whose key contains `pattern`.
    pub fn with_upload_failure(self, pattern: &str) -> Self {
        self.failing_uploads
            .lock()
            .unwrap()
            .push(pattern.to_string());
        self
    }

    pub fn with_remove_failure(self, should_fail: bool) -> Self {
        *self.fail_removes.lock().unwrap() = should_fail;
        self
    }

    /// Number of upload calls that reached the store, failed or not.
    pub fn get_upload_count(&self) -> usize {
        *self.upload_count.lock().unwrap()
    }

    pub fn get_remove_calls(&self) -> Vec<Vec<String>> {
        self.remove_calls.lock().unwrap().clone()
    }

    pub fn get_files(&self) -> HashMap<String, Vec<u8>> {
        self.files.lock().unwrap().clone()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.files.lock().unwrap().contains_key(key)
    }
}

impl Default for MockObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn upload(&self, key: &str, data: &[u8], _content_type: &str) -> Result<String> {
        *self.upload_count.lock().unwrap() += 1;

        let should_fail = self
            .failing_uploads
            .lock()
            .unwrap()
            .iter()
            .any(|pattern| key.contains(pattern.as_str()));
        if should_fail {
            return Err(Error::Storage(format!(
                "Network error while uploading {}",
                key
            )));
        }

        self.files
            .lock()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
        Ok(key.to_string())
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        self.remove_calls.lock().unwrap().push(keys.to_vec());

        if *self.fail_removes.lock().unwrap() {
            return Err(Error::Storage("Mock remove failure".to_string()));
        }

        let mut files = self.files.lock().unwrap();
        for key in keys {
            files.remove(key);
        }
        Ok(())
    }

    fn public_base_url(&self) -> &str {
        &self.public_base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_upload_and_public_url() {
        let store = MockObjectStore::new();

        let path = store
            .upload("events/a.jpg", b"jpeg", "image/jpeg")
            .await
            .unwrap();

        assert_eq!(path, "events/a.jpg");
        assert_eq!(
            store.public_url(&path),
            "https://mock-storage.example.com/public/events/a.jpg"
        );
        assert_eq!(store.get_upload_count(), 1);
        assert!(store.contains("events/a.jpg"));
    }

    #[tokio::test]
    async fn test_mock_upload_failure_pattern() {
        let store = MockObjectStore::new().with_upload_failure("broken");

        let result = store.upload("events/broken.png", b"png", "image/png").await;

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Network error"));
        assert_eq!(store.get_upload_count(), 1);
        assert!(store.get_files().is_empty());
    }

    #[tokio::test]
    async fn test_mock_remove_records_calls() {
        let store = MockObjectStore::new().with_file("gallery/x.gif".to_string(), b"gif".to_vec());

        store.remove(&["gallery/x.gif".to_string()]).await.unwrap();

        assert!(!store.contains("gallery/x.gif"));
        assert_eq!(store.get_remove_calls(), vec![vec!["gallery/x.gif".to_string()]]);
    }

    #[tokio::test]
    async fn test_mock_remove_failure_keeps_files() {
        let store = MockObjectStore::new()
            .with_file("team/p.jpg".to_string(), b"jpg".to_vec())
            .with_remove_failure(true);

        assert!(store.remove(&["team/p.jpg".to_string()]).await.is_err());
        assert!(store.contains("team/p.jpg"));
        assert_eq!(store.get_remove_calls().len(), 1);
    }

    #[test]
    fn test_mock_key_for_url() {
        let store = MockObjectStore::new().with_public_base_url("https://cdn.test/".to_string());
        assert_eq!(
            store.key_for_url("https://cdn.test/partners/logo.png").as_deref(),
            Some("partners/logo.png")
        );
    }
}
