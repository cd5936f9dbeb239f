//! Validation and upload of user-selected images
//!
//! Candidates are checked against an [`UploadPolicy`] before any network call,
//! stored under collision-free keys and resolved to public URLs.

pub mod coordinator;
pub mod keys;
pub mod mime;
pub mod policy;
pub mod types;

pub use coordinator::UploadCoordinator;
pub use keys::generate_storage_key;
pub use policy::{UploadPolicy, ValidationOutcome, ALLOWED_IMAGE_TYPES};
pub use types::{UploadCandidate, UploadOutcome, UploadResult};
