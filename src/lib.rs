//! Content administration backend for events, team members, partners and gallery images
//!
//! Saves records whose images live in an object storage bucket: attached files are
//! validated and uploaded first, the record is written next, and uploads from a
//! failed save are removed again so they do not linger as orphans.

pub mod app;
pub mod cleanup;
pub mod error;
pub mod models;
pub mod records;
pub mod storage;
pub mod upload;
pub mod workflow;

pub use error::{Error, Result};
