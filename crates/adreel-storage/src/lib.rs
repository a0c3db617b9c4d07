//! Object storage manager for campaign artifacts.
//!
//! This crate provides:
//! - The canonical/staging key layout for campaign videos
//! - The [`ObjectStore`] trait: stage, atomic canonical replace, fetch,
//!   idempotent staged delete, playback URL resolution
//! - An S3-compatible implementation (R2/S3/minio)
//! - An in-memory implementation for tests and local development
//!
//! Canonical keys are stable and versionless by design: readers always
//! resolve the same key, and a replace is atomic from their point of view.

pub mod error;
pub mod memory;
pub mod paths;
pub mod s3;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use paths::CampaignPaths;
pub use s3::{S3Config, S3Store};
pub use store::ObjectStore;
