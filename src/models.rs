//! Data models and structures
//!
//! Defines the content entities managed through the dashboard, the typed asset
//! references stored on their rows, and runtime configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

const METADATA_KEY: &str = "metadata";
const FEATURED_IMAGE_KEY: &str = "featured_image";
const GALLERY_IMAGES_KEY: &str = "gallery_images";

/// Server-managed columns that are never sent back on update.
const READ_ONLY_COLUMNS: [&str; 3] = ["id", "created_at", "updated_at"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Event,
    Team,
    Partner,
    Gallery,
}

/// Where a kind keeps its asset URLs inside a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetLayout {
    /// `metadata.featured_image` plus `metadata.gallery_images`.
    Metadata,
    /// A single top-level column holding the primary image URL.
    Column(&'static str),
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Event,
        EntityKind::Team,
        EntityKind::Partner,
        EntityKind::Gallery,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Event => "event",
            EntityKind::Team => "team",
            EntityKind::Partner => "partner",
            EntityKind::Gallery => "gallery",
        }
    }

    /// Table name in the record store.
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Event => "events",
            EntityKind::Team => "team_members",
            EntityKind::Partner => "partners",
            EntityKind::Gallery => "gallery_items",
        }
    }

    /// Folder prefix for storage keys uploaded for this kind.
    pub fn storage_folder(self) -> &'static str {
        match self {
            EntityKind::Event => "events",
            EntityKind::Team => "team",
            EntityKind::Partner => "partners",
            EntityKind::Gallery => "gallery",
        }
    }

    pub fn asset_layout(self) -> AssetLayout {
        match self {
            EntityKind::Event => AssetLayout::Metadata,
            EntityKind::Team => AssetLayout::Column("image_url"),
            EntityKind::Partner => AssetLayout::Column("logo_url"),
            EntityKind::Gallery => AssetLayout::Column("image_url"),
        }
    }

    pub fn supports_gallery(self) -> bool {
        matches!(self.asset_layout(), AssetLayout::Metadata)
    }

    /// Whether a record of this kind cannot exist without a primary image.
    pub fn requires_featured_image(self) -> bool {
        matches!(self, EntityKind::Gallery)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "event" | "events" => Ok(EntityKind::Event),
            "team" | "team_members" | "team-member" => Ok(EntityKind::Team),
            "partner" | "partners" => Ok(EntityKind::Partner),
            "gallery" | "gallery_items" => Ok(EntityKind::Gallery),
            other => Err(Error::Validation(format!(
                "Unknown entity kind '{}'. Expected one of: event, team, partner, gallery",
                other
            ))),
        }
    }
}

/// Typed view of the asset URLs carried by a row.
///
/// Merging never drops a reference that is not explicitly replaced: a new
/// featured image replaces the old one, new gallery images are appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRefs {
    pub featured_image_url: Option<String>,
    pub gallery_image_urls: Vec<String>,
}

impl AssetRefs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_featured(mut self, url: String) -> Self {
        self.featured_image_url = Some(url);
        self
    }

    pub fn with_gallery<I>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.gallery_image_urls.extend(urls);
        self
    }

    /// Apply this invocation's uploads on top of the retained references.
    pub fn merged(&self, featured: Option<String>, gallery: Vec<String>) -> Self {
        let mut merged = self.clone();
        if let Some(url) = featured {
            merged.featured_image_url = Some(url);
        }
        merged.gallery_image_urls.extend(gallery);
        merged
    }

    pub fn is_empty(&self) -> bool {
        self.featured_image_url.is_none() && self.gallery_image_urls.is_empty()
    }

    /// All referenced URLs, featured image first.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.featured_image_url
            .iter()
            .chain(self.gallery_image_urls.iter())
            .map(String::as_str)
    }

    pub fn from_fields(kind: EntityKind, fields: &Map<String, Value>) -> Self {
        match kind.asset_layout() {
            AssetLayout::Metadata => {
                let Some(metadata) = fields.get(METADATA_KEY).and_then(Value::as_object) else {
                    return Self::default();
                };
                let featured_image_url = metadata
                    .get(FEATURED_IMAGE_KEY)
                    .and_then(Value::as_str)
                    .filter(|url| !url.is_empty())
                    .map(str::to_string);
                let gallery_image_urls = metadata
                    .get(GALLERY_IMAGES_KEY)
                    .and_then(Value::as_array)
                    .map(|entries| {
                        let urls: Vec<String> = entries
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect();
                        if urls.len() < entries.len() {
                            tracing::warn!(
                                "Ignoring {} non-string entries in metadata.{}",
                                entries.len() - urls.len(),
                                GALLERY_IMAGES_KEY
                            );
                        }
                        urls
                    })
                    .unwrap_or_default();
                Self {
                    featured_image_url,
                    gallery_image_urls,
                }
            }
            AssetLayout::Column(column) => Self {
                featured_image_url: fields
                    .get(column)
                    .and_then(Value::as_str)
                    .filter(|url| !url.is_empty())
                    .map(str::to_string),
                gallery_image_urls: Vec::new(),
            },
        }
    }

    pub fn from_record(kind: EntityKind, record: &Record) -> Self {
        Self::from_fields(kind, &record.data)
    }

    /// Write the references into a row, leaving every other key untouched.
    fn write_into(&self, kind: EntityKind, fields: &mut Map<String, Value>) {
        match kind.asset_layout() {
            AssetLayout::Metadata => {
                let metadata = fields
                    .entry(METADATA_KEY)
                    .or_insert_with(|| Value::Object(Map::new()));
                if !metadata.is_object() {
                    *metadata = Value::Object(Map::new());
                }
                if let Value::Object(metadata) = metadata {
                    if let Some(url) = &self.featured_image_url {
                        metadata.insert(FEATURED_IMAGE_KEY.to_string(), Value::from(url.as_str()));
                    }
                    // Non-string entries are carried over after the URLs
                    let unrecognized: Vec<Value> = metadata
                        .get(GALLERY_IMAGES_KEY)
                        .and_then(Value::as_array)
                        .map(|entries| {
                            entries
                                .iter()
                                .filter(|entry| !entry.is_string())
                                .cloned()
                                .collect()
                        })
                        .unwrap_or_default();
                    let mut gallery: Vec<Value> = self
                        .gallery_image_urls
                        .iter()
                        .map(|url| Value::from(url.as_str()))
                        .collect();
                    gallery.extend(unrecognized);
                    metadata.insert(GALLERY_IMAGES_KEY.to_string(), Value::Array(gallery));
                }
            }
            AssetLayout::Column(column) => {
                if let Some(url) = &self.featured_image_url {
                    fields.insert(column.to_string(), Value::from(url.as_str()));
                }
            }
        }
    }
}

/// Create/update body for one entity row.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPayload {
    pub kind: EntityKind,
    pub fields: Map<String, Value>,
    pub assets: AssetRefs,
}

impl RecordPayload {
    pub fn new(kind: EntityKind, fields: Map<String, Value>, assets: AssetRefs) -> Self {
        Self {
            kind,
            fields,
            assets,
        }
    }

    /// JSON body sent to the record store.
    pub fn to_json(&self) -> Value {
        let mut body = self.fields.clone();
        for column in READ_ONLY_COLUMNS {
            body.remove(column);
        }
        self.assets.write_into(self.kind, &mut body);
        Value::Object(body)
    }
}

/// A persisted row as returned by the record store.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub data: Map<String, Value>,
}

impl Record {
    /// Columns a caller may send back when editing this row.
    pub fn editable_fields(&self) -> Map<String, Value> {
        let mut fields = self.data.clone();
        for column in READ_ONLY_COLUMNS {
            fields.remove(column);
        }
        fields
    }
}

impl TryFrom<Value> for Record {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        let data = match value {
            Value::Object(data) => data,
            other => {
                return Err(Error::RecordStore(format!(
                    "Expected a JSON object for a record, got: {}",
                    other
                )))
            }
        };

        let id = match data.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(Error::RecordStore(
                    "Record is missing an 'id' column".to_string(),
                ))
            }
        };

        Ok(Self { id, data })
    }
}

// Configuration
pub const DEFAULT_UPLOAD_MAX_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_BUCKET: &str = "content-images";
const DEFAULT_REGION: &str = "us-east-1";
const DRY_RUN_PUBLIC_BASE_URL: &str = "https://storage.invalid/public";

#[derive(Debug, Clone)]
pub struct Config {
    pub storage_endpoint: Option<String>,
    pub storage_region: String,
    pub storage_bucket: String,
    pub storage_access_key_id: Option<String>,
    pub storage_secret_access_key: Option<String>,
    pub storage_public_base_url: String,
    pub records_url: Option<String>,
    pub records_api_key: Option<String>,
    pub upload_max_bytes: u64,
    pub upload_concurrency: usize,
    pub dry_run: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let dry_run = var("DRY_RUN")
            .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let required = |name: &str| -> Result<Option<String>> {
            match var(name) {
                Some(value) => Ok(Some(value)),
                None if dry_run => Ok(None),
                None => Err(Error::Config(format!("{} not set", name))),
            }
        };

        let storage_access_key_id = required("STORAGE_ACCESS_KEY_ID")?;
        let storage_secret_access_key = required("STORAGE_SECRET_ACCESS_KEY")?;
        let records_url = required("RECORDS_URL")?;
        let records_api_key = required("RECORDS_API_KEY")?;
        let storage_public_base_url = required("STORAGE_PUBLIC_BASE_URL")?
            .unwrap_or_else(|| DRY_RUN_PUBLIC_BASE_URL.to_string());

        let upload_max_bytes = match var("UPLOAD_MAX_BYTES") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!("UPLOAD_MAX_BYTES must be a byte count, got '{}'", raw))
            })?,
            None => DEFAULT_UPLOAD_MAX_BYTES,
        };

        let upload_concurrency = match var("UPLOAD_CONCURRENCY") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(Error::Config(format!(
                        "UPLOAD_CONCURRENCY must be a positive integer, got '{}'",
                        raw
                    )))
                }
            },
            None => 1,
        };

        Ok(Self {
            storage_endpoint: var("STORAGE_ENDPOINT"),
            storage_region: var("STORAGE_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            storage_bucket: var("STORAGE_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            storage_access_key_id,
            storage_secret_access_key,
            storage_public_base_url: storage_public_base_url.trim_end_matches('/').to_string(),
            records_url: records_url.map(|url| url.trim_end_matches('/').to_string()),
            records_api_key,
            upload_max_bytes,
            upload_concurrency,
            dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    #[test]
    fn test_entity_kind_parsing() {
        assert_eq!("event".parse::<EntityKind>().unwrap(), EntityKind::Event);
        assert_eq!("Partners".parse::<EntityKind>().unwrap(), EntityKind::Partner);
        assert_eq!(
            "team_members".parse::<EntityKind>().unwrap(),
            EntityKind::Team
        );
        let err = "sponsor".parse::<EntityKind>().unwrap_err();
        assert!(err.to_string().contains("sponsor"));
    }

    #[test]
    fn test_only_events_support_gallery() {
        let with_gallery: Vec<EntityKind> = EntityKind::ALL
            .into_iter()
            .filter(|kind| kind.supports_gallery())
            .collect();
        assert_eq!(with_gallery, vec![EntityKind::Event]);
    }

    #[test]
    fn test_merge_replaces_featured_and_appends_gallery() {
        let existing = AssetRefs::new()
            .with_featured("https://cdn/old.jpg".to_string())
            .with_gallery(vec!["https://cdn/g1.jpg".to_string()]);

        let merged = existing.merged(
            Some("https://cdn/new.jpg".to_string()),
            vec!["https://cdn/g2.jpg".to_string()],
        );

        assert_eq!(merged.featured_image_url.as_deref(), Some("https://cdn/new.jpg"));
        assert_eq!(
            merged.gallery_image_urls,
            vec!["https://cdn/g1.jpg", "https://cdn/g2.jpg"]
        );
    }

    #[test]
    fn test_merge_without_new_featured_keeps_old() {
        let existing = AssetRefs::new().with_featured("https://cdn/old.jpg".to_string());
        let merged = existing.merged(None, Vec::new());
        assert_eq!(merged, existing);
    }

    #[test]
    fn test_event_payload_preserves_other_metadata_keys() {
        let fields = as_map(json!({
            "id": 7,
            "title": "Launch night",
            "metadata": { "color": "#ff0000", "featured_image": "https://cdn/old.jpg" }
        }));
        let assets = AssetRefs::from_fields(EntityKind::Event, &fields)
            .merged(None, vec!["https://cdn/g.jpg".to_string()]);

        let body = RecordPayload::new(EntityKind::Event, fields, assets).to_json();

        assert_eq!(
            body,
            json!({
                "title": "Launch night",
                "metadata": {
                    "color": "#ff0000",
                    "featured_image": "https://cdn/old.jpg",
                    "gallery_images": ["https://cdn/g.jpg"]
                }
            })
        );
    }

    #[test]
    fn test_event_edit_keeps_non_url_gallery_entries() {
        let fields = as_map(json!({
            "title": "Open day",
            "metadata": {
                "gallery_images": [
                    "https://cdn/a.jpg",
                    { "url": "https://cdn/legacy.jpg", "caption": "Stage" },
                    "https://cdn/b.jpg"
                ]
            }
        }));
        let existing = AssetRefs::from_fields(EntityKind::Event, &fields);
        assert_eq!(
            existing.gallery_image_urls,
            vec!["https://cdn/a.jpg", "https://cdn/b.jpg"]
        );

        let assets = existing.merged(None, vec!["https://cdn/c.jpg".to_string()]);
        let body = RecordPayload::new(EntityKind::Event, fields, assets).to_json();

        assert_eq!(
            body["metadata"]["gallery_images"],
            json!([
                "https://cdn/a.jpg",
                "https://cdn/b.jpg",
                "https://cdn/c.jpg",
                { "url": "https://cdn/legacy.jpg", "caption": "Stage" }
            ])
        );
    }

    #[test]
    fn test_column_layout_payload() {
        let fields = as_map(json!({ "name": "Acme" }));
        let assets = AssetRefs::new().with_featured("https://cdn/logo.png".to_string());

        let body = RecordPayload::new(EntityKind::Partner, fields, assets).to_json();

        assert_eq!(body, json!({ "name": "Acme", "logo_url": "https://cdn/logo.png" }));
    }

    #[test]
    fn test_record_from_json_accepts_numeric_id() {
        let record = Record::try_from(json!({ "id": 42, "name": "Ada", "created_at": "x" })).unwrap();
        assert_eq!(record.id, "42");
        assert_eq!(record.editable_fields(), as_map(json!({ "name": "Ada" })));
    }

    #[test]
    fn test_record_from_json_requires_id() {
        assert!(Record::try_from(json!({ "name": "Ada" })).is_err());
        assert!(Record::try_from(json!([1, 2])).is_err());
    }

    #[test]
    fn test_asset_refs_from_team_record() {
        let record = Record::try_from(json!({ "id": "a1", "image_url": "https://cdn/p.jpg" })).unwrap();
        let assets = AssetRefs::from_record(EntityKind::Team, &record);
        assert_eq!(assets.urls().collect::<Vec<_>>(), vec!["https://cdn/p.jpg"]);
    }

    #[test]
    fn test_config_requires_credentials_outside_dry_run() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("STORAGE_ACCESS_KEY_ID"));
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("STORAGE_ACCESS_KEY_ID", "id"),
            ("STORAGE_SECRET_ACCESS_KEY", "secret"),
            ("STORAGE_PUBLIC_BASE_URL", "https://cdn.example.com/public/"),
            ("RECORDS_URL", "https://db.example.com/"),
            ("RECORDS_API_KEY", "key"),
        ]))
        .unwrap();

        assert_eq!(config.storage_bucket, "content-images");
        assert_eq!(config.storage_region, "us-east-1");
        assert_eq!(config.storage_public_base_url, "https://cdn.example.com/public");
        assert_eq!(config.records_url.as_deref(), Some("https://db.example.com"));
        assert_eq!(config.upload_max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.upload_concurrency, 1);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_config_dry_run_needs_no_credentials() {
        let config = Config::from_lookup(lookup(&[("DRY_RUN", "true"), ("UPLOAD_CONCURRENCY", "4")]))
            .unwrap();
        assert!(config.dry_run);
        assert!(config.records_url.is_none());
        assert_eq!(config.upload_concurrency, 4);
    }

    #[test]
    fn test_config_rejects_zero_concurrency() {
        let err = Config::from_lookup(lookup(&[("DRY_RUN", "1"), ("UPLOAD_CONCURRENCY", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("UPLOAD_CONCURRENCY"));
    }
}
