use super::RecordStore;
use crate::models::{EntityKind, Record, RecordPayload};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

/// Record store speaking the backend's PostgREST-style table API.
pub struct RestRecordStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestRecordStore {
    pub fn new(base_url: String, api_key: String) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self::new_with_client(base_url, api_key, client))
    }

    pub fn new_with_client(base_url: String, api_key: String, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn table_url(&self, kind: EntityKind) -> String {
        format!("{}/rest/v1/{}", self.base_url, kind.table())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> Result<Response> {
        let response = self.authorized(request).send().await.map_err(|e| {
            tracing::error!("Failed to send {} request to record store: {}", action, e);
            e
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            tracing::error!(
                "Record store {} error (status {}): {}",
                action,
                status,
                error_text
            );
            return Err(Error::RecordStore(format!(
                "{} failed (status {}): {}",
                action, status, error_text
            )));
        }

        Ok(response)
    }

    /// Rows come back as an array; a single-row request yields exactly one.
    ///
    /// Once the status is a success the write has landed, so a body that cannot
    /// be read or decoded maps to `Error::UnreadableResponse` rather than a
    /// rejection. An empty row set means nothing matched and stays a rejection.
    async fn single_row(response: Response, kind: EntityKind, action: &str) -> Result<Record> {
        let unreadable = |detail: String| {
            tracing::error!(
                "Record store {} on {} succeeded but the response was unusable: {}",
                action,
                kind.table(),
                detail
            );
            Error::UnreadableResponse(format!("{} on {}: {}", action, kind.table(), detail))
        };

        let text = response
            .text()
            .await
            .map_err(|e| unreadable(format!("failed to read body: {}", e)))?;
        let body: Value = serde_json::from_str(&text)
            .map_err(|e| unreadable(format!("invalid JSON body ({}): {:?}", e, text)))?;

        let row = match body {
            Value::Array(rows) => rows.into_iter().next(),
            object @ Value::Object(_) => Some(object),
            _ => None,
        };
        match row {
            Some(row) => Record::try_from(row).map_err(|e| unreadable(e.to_string())),
            None => Err(Error::RecordStore(format!(
                "{} on {} returned no rows",
                action,
                kind.table()
            ))),
        }
    }
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn insert(&self, payload: &RecordPayload) -> Result<Record> {
        tracing::debug!("Inserting row into {}", payload.kind.table());

        let request = self
            .client
            .post(self.table_url(payload.kind))
            .header("Prefer", "return=representation")
            .json(&payload.to_json());
        let response = self.send(request, "insert").await?;
        Self::single_row(response, payload.kind, "insert").await
    }

    async fn update(&self, id: &str, payload: &RecordPayload) -> Result<Record> {
        tracing::debug!("Updating row {} in {}", id, payload.kind.table());

        let request = self
            .client
            .patch(self.table_url(payload.kind))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(&payload.to_json());
        let response = self.send(request, "update").await?;
        Self::single_row(response, payload.kind, "update").await
    }

    async fn fetch(&self, kind: EntityKind, id: &str) -> Result<Record> {
        let request = self
            .client
            .get(self.table_url(kind))
            .query(&[("id", format!("eq.{}", id)), ("select", "*".to_string())]);
        let response = self.send(request, "fetch").await?;
        Self::single_row(response, kind, "fetch").await
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<()> {
        tracing::debug!("Deleting row {} from {}", id, kind.table());

        let request = self
            .client
            .delete(self.table_url(kind))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation");
        let response = self.send(request, "delete").await?;
        // A filter that matches nothing (missing id, row policy) still answers 2xx
        Self::single_row(response, kind, "delete").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetRefs;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Map};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> RestRecordStore {
        RestRecordStore::new(server.uri(), "anon-key".to_string()).unwrap()
    }

    fn partner_payload() -> RecordPayload {
        let mut fields = Map::new();
        fields.insert("name".to_string(), json!("Acme"));
        RecordPayload::new(
            EntityKind::Partner,
            fields,
            AssetRefs::new().with_featured("https://cdn.test/partners/logo.png".to_string()),
        )
    }

    #[tokio::test]
    async fn test_insert_posts_payload_and_returns_row() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/partners"))
            .and(header("apikey", "anon-key"))
            .and(header("Authorization", "Bearer anon-key"))
            .and(header("Prefer", "return=representation"))
            .and(body_json(json!({
                "name": "Acme",
                "logo_url": "https://cdn.test/partners/logo.png"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
                "id": 12,
                "name": "Acme",
                "logo_url": "https://cdn.test/partners/logo.png"
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let record = store(&server).insert(&partner_payload()).await.unwrap();

        assert_eq!(record.id, "12");
        assert_eq!(record.data["name"], json!("Acme"));
    }

    #[tokio::test]
    async fn test_update_filters_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/partners"))
            .and(query_param("id", "eq.12"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "id": 12, "name": "Acme" }])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let record = store(&server)
            .update("12", &partner_payload())
            .await
            .unwrap();

        assert_eq!(record.id, "12");
    }

    #[tokio::test]
    async fn test_error_status_surfaces_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/partners"))
            .respond_with(
                ResponseTemplate::new(409).set_body_string("duplicate key value violates unique"),
            )
            .mount(&server)
            .await;

        let err = store(&server).insert(&partner_payload()).await.unwrap_err();

        assert!(matches!(err, Error::RecordStore(_)));
        assert!(err.to_string().contains("409"));
        assert!(err.to_string().contains("duplicate key"));
    }

    #[tokio::test]
    async fn test_fetch_missing_row_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/events"))
            .and(query_param("id", "eq.99"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let err = store(&server)
            .fetch(EntityKind::Event, "99")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("returned no rows"));
    }

    #[tokio::test]
    async fn test_delete_sends_filter() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/team_members"))
            .and(query_param("id", "eq.abc"))
            .and(header("Prefer", "return=representation"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "id": "abc", "name": "Ada" }])),
            )
            .expect(1)
            .mount(&server)
            .await;

        store(&server)
            .delete(EntityKind::Team, "abc")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_matching_no_rows_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/team_members"))
            .and(query_param("id", "eq.gone"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let err = store(&server)
            .delete(EntityKind::Team, "gone")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RecordStore(_)));
        assert_eq!(
            err.to_string(),
            "Record store error: delete on team_members returned no rows"
        );
    }

    #[tokio::test]
    async fn test_insert_created_with_empty_body_is_unreadable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/partners"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let err = store(&server).insert(&partner_payload()).await.unwrap_err();

        assert!(matches!(err, Error::UnreadableResponse(_)));
        assert!(err.to_string().contains("insert on partners"));
    }

    #[tokio::test]
    async fn test_update_row_without_id_is_unreadable() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/partners"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "name": "Acme" }])))
            .mount(&server)
            .await;

        let err = store(&server)
            .update("12", &partner_payload())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnreadableResponse(_)));
        assert!(err.to_string().contains("missing an 'id' column"));
    }

    #[tokio::test]
    async fn test_update_matching_no_rows_is_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/partners"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let err = store(&server)
            .update("404", &partner_payload())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RecordStore(_)));
    }
}
