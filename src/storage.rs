//! Storage subsystem
//!
//! This module provides the content directory: the only state shared between the capture
//! loop and the artifact server.
//!
//! Components:
//! - `storage_trait`: the Storage trait defining the publish/list/read/purge contract.
//! - `types`: artifact names, listing entries and purge reports.
//! - `file_storage`: filesystem-backed implementation with atomic publish.

pub mod file_storage;
pub mod storage_trait;
pub mod types;

pub use file_storage::FileStorage;
pub use storage_trait::Storage;
pub use types::{Artifact, ArtifactName, PurgeReport};
