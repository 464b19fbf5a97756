//! Storage Trait
//!
//! This module defines the `Storage` trait, the contract of the content directory shared by
//! the capture loop and the artifact server.
//!
//! Implementors of this trait are responsible for:
//! - Publishing artifacts atomically (a reader never sees a partial write)
//! - Listing the artifacts present at call time, without caching
//! - Reading a single artifact by name, confined to the store
//! - Best-effort bulk deletion at session teardown

use crate::error_handling::types::StorageError;
use crate::storage::types::{Artifact, ArtifactName, PurgeReport};

/// The `Storage` trait defines the interface of an artifact store.
///
/// The capture loop only calls [`Storage::save_artifact`], the server only calls the read
/// methods, and the lifecycle owner alone calls [`Storage::purge_all`].
pub trait Storage: Send + Sync {
    /// Publishes `bytes` under `name`, replacing any artifact with the same name.
    fn save_artifact(&self, name: &ArtifactName, bytes: &[u8]) -> Result<(), StorageError>;

    /// Lists the artifacts currently present, sorted by name.
    fn list_artifacts(&self) -> Result<Vec<Artifact>, StorageError>;

    /// Reads the full content of the artifact called `name`.
    ///
    /// Returns [`StorageError::InvalidName`] for anything that is not a flat artifact name and
    /// [`StorageError::NotFound`] when no such artifact exists.
    fn read_artifact(&self, name: &str) -> Result<Vec<u8>, StorageError>;

    /// Deletes every artifact, continuing past individual failures.
    fn purge_all(&self) -> PurgeReport;
}
