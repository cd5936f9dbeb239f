use super::RecordStore;
use crate::models::{EntityKind, Record, RecordPayload};
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Clone)]
pub struct MockRecordStore {
    rows: Arc<Mutex<HashMap<(EntityKind, String), Record>>>,
    payloads: Arc<Mutex<Vec<RecordPayload>>>,
    insert_count: Arc<Mutex<usize>>,
    update_count: Arc<Mutex<usize>>,
    delete_count: Arc<Mutex<usize>>,
    mutation_failure: Arc<Mutex<Option<String>>>,
    delete_failure: Arc<Mutex<Option<String>>>,
    unreadable_response: Arc<Mutex<bool>>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(Mutex::new(HashMap::new())),
            payloads: Arc::new(Mutex::new(Vec::new())),
            insert_count: Arc::new(Mutex::new(0)),
            update_count: Arc::new(Mutex::new(0)),
            delete_count: Arc::new(Mutex::new(0)),
            mutation_failure: Arc::new(Mutex::new(None)),
            delete_failure: Arc::new(Mutex::new(None)),
            unreadable_response: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_record(self, kind: EntityKind, record: Record) -> Self {
        self.rows
            .lock()
            .unwrap()
            .insert((kind, record.id.clone()), record);
        self
    }

    /// Make every insert and update fail with `message`.
    pub fn with_mutation_failure(self, message: &str) -> Self {
        *self.mutation_failure.lock().unwrap() = Some(message.to_string());
        self
    }

    /// Save rows from insert and update but answer as if the response body was garbled.
    pub fn with_unreadable_response(self) -> Self {
        *self.unreadable_response.lock().unwrap() = true;
        self
    }

    pub fn with_delete_failure(self, message: &str) -> Self {
        *self.delete_failure.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn get_insert_count(&self) -> usize {
        *self.insert_count.lock().unwrap()
    }

    pub fn get_update_count(&self) -> usize {
        *self.update_count.lock().unwrap()
    }

    pub fn get_delete_count(&self) -> usize {
        *self.delete_count.lock().unwrap()
    }

    /// Payloads submitted to insert/update, in call order.
    pub fn get_payloads(&self) -> Vec<RecordPayload> {
        self.payloads.lock().unwrap().clone()
    }

    pub fn get_record(&self, kind: EntityKind, id: &str) -> Option<Record> {
        self.rows
            .lock()
            .unwrap()
            .get(&(kind, id.to_string()))
            .cloned()
    }

    fn store_row(&self, kind: EntityKind, id: String, payload: &RecordPayload) -> Result<Record> {
        let mut body = payload.to_json();
        if let Value::Object(map) = &mut body {
            map.insert("id".to_string(), Value::from(id.as_str()));
        }
        let record = Record::try_from(body)?;
        self.rows
            .lock()
            .unwrap()
            .insert((kind, id), record.clone());

        if *self.unreadable_response.lock().unwrap() {
            return Err(Error::UnreadableResponse(format!(
                "write to {} saved but body was empty",
                kind.table()
            )));
        }
        Ok(record)
    }

    fn check_mutation_failure(&self) -> Result<()> {
        let failure = self.mutation_failure.lock().unwrap().clone();
        match failure {
            Some(message) => Err(Error::RecordStore(message)),
            None => Ok(()),
        }
    }
}

impl Default for MockRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn insert(&self, payload: &RecordPayload) -> Result<Record> {
        *self.insert_count.lock().unwrap() += 1;
        self.payloads.lock().unwrap().push(payload.clone());
        self.check_mutation_failure()?;

        self.store_row(payload.kind, Uuid::new_v4().to_string(), payload)
    }

    async fn update(&self, id: &str, payload: &RecordPayload) -> Result<Record> {
        *self.update_count.lock().unwrap() += 1;
        self.payloads.lock().unwrap().push(payload.clone());
        self.check_mutation_failure()?;

        if self.get_record(payload.kind, id).is_none() {
            return Err(Error::RecordStore(format!(
                "No {} row with id {}",
                payload.kind.table(),
                id
            )));
        }
        self.store_row(payload.kind, id.to_string(), payload)
    }

    async fn fetch(&self, kind: EntityKind, id: &str) -> Result<Record> {
        self.get_record(kind, id).ok_or_else(|| {
            Error::RecordStore(format!("No {} row with id {}", kind.table(), id))
        })
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<()> {
        *self.delete_count.lock().unwrap() += 1;
        let failure = self.delete_failure.lock().unwrap().clone();
        if let Some(message) = failure {
            return Err(Error::RecordStore(message));
        }

        let removed = self.rows.lock().unwrap().remove(&(kind, id.to_string()));
        match removed {
            Some(_) => Ok(()),
            None => Err(Error::RecordStore(format!(
                "delete on {} returned no rows",
                kind.table()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetRefs;
    use serde_json::{json, Map};

    fn event_payload(title: &str) -> RecordPayload {
        let mut fields = Map::new();
        fields.insert("title".to_string(), json!(title));
        RecordPayload::new(EntityKind::Event, fields, AssetRefs::new())
    }

    #[tokio::test]
    async fn test_mock_insert_assigns_id() {
        let store = MockRecordStore::new();

        let record = store.insert(&event_payload("Meetup")).await.unwrap();

        assert!(!record.id.is_empty());
        assert_eq!(record.data["title"], json!("Meetup"));
        assert_eq!(store.get_insert_count(), 1);
        assert!(store.get_record(EntityKind::Event, &record.id).is_some());
    }

    #[tokio::test]
    async fn test_mock_update_requires_existing_row() {
        let store = MockRecordStore::new();
        let result = store.update("missing", &event_payload("x")).await;
        assert!(result.is_err());
        assert_eq!(store.get_update_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_mutation_failure_still_records_payload() {
        let store = MockRecordStore::new().with_mutation_failure("insert rejected");

        let err = store.insert(&event_payload("Gala")).await.unwrap_err();

        assert!(err.to_string().contains("insert rejected"));
        assert_eq!(store.get_payloads().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_delete() {
        let record = Record::try_from(json!({ "id": "p1", "name": "Acme" })).unwrap();
        let store = MockRecordStore::new().with_record(EntityKind::Partner, record);

        store.delete(EntityKind::Partner, "p1").await.unwrap();

        assert!(store.fetch(EntityKind::Partner, "p1").await.is_err());
        assert_eq!(store.get_delete_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_delete_missing_row_is_error() {
        let store = MockRecordStore::new();

        let err = store.delete(EntityKind::Partner, "p9").await.unwrap_err();

        assert!(err.to_string().contains("returned no rows"));
        assert_eq!(store.get_delete_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_unreadable_response_still_saves_row() {
        let store = MockRecordStore::new().with_unreadable_response();

        let err = store.insert(&event_payload("Gala")).await.unwrap_err();

        assert!(matches!(err, Error::UnreadableResponse(_)));
        assert_eq!(store.rows.lock().unwrap().len(), 1);
    }
}
