//! Relational record store for content rows
//!
//! Insert, update, fetch and delete rows of the hosted backend's tables. The
//! workflow only depends on the trait, never on a process-wide client.

pub mod client;
pub mod mock;

pub use client::RestRecordStore;
pub use mock::MockRecordStore;

use crate::models::{EntityKind, Record, RecordPayload};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, payload: &RecordPayload) -> Result<Record>;
    async fn update(&self, id: &str, payload: &RecordPayload) -> Result<Record>;
    async fn fetch(&self, kind: EntityKind, id: &str) -> Result<Record>;
    async fn delete(&self, kind: EntityKind, id: &str) -> Result<()>;
}
