//! Storage driver abstraction
//!
//! This module defines the StorageDriver trait that all storage backends
//! must implement, and the error kinds every backend maps into.

use std::path::Path;

use async_trait::async_trait;
use depot_core::StorageProvider;
use futures::stream::BoxStream;
use thiserror::Error;

/// Storage operation errors
///
/// `ObjectNotFound` is the load-bearing variant: callers use it to tell
/// "this candidate is absent, try the next one" apart from transient I/O
/// failure. Backends must never leak their native error types instead.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Container does not exist: {0}")]
    ContainerNotFound(String),

    #[error("Object does not exist: {bucket}/{object_name}")]
    ObjectNotFound { bucket: String, object_name: String },

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid object name: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Lazy, unordered sequence of object names relative to a bucket root.
/// A fresh `iterate_objects` call re-scans from scratch.
pub type ObjectStream = BoxStream<'static, StorageResult<String>>;

/// Storage driver abstraction
///
/// All backends (local filesystem, S3, GCS) implement this trait with
/// identical externally observable semantics. One instance owns a handle to
/// one backend endpoint, holds no per-call mutable state, and is safe to
/// share across concurrent callers.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// List object names under `bucket`, optionally restricted to a key
    /// prefix. An empty bucket yields an empty stream; a missing bucket
    /// fails with `ContainerNotFound`.
    async fn iterate_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> StorageResult<ObjectStream>;

    /// Store the bytes of `local_path` at `object_name`, atomically
    /// replacing whatever currently occupies the destination. A concurrent
    /// reader never observes a truncated object under the final name.
    async fn upload_object(
        &self,
        local_path: &Path,
        bucket: &str,
        object_name: &str,
    ) -> StorageResult<()>;

    /// Copy the object's bytes to `destination_path`. Fails with
    /// `ObjectNotFound` when the object is absent.
    async fn download_object(
        &self,
        bucket: &str,
        object_name: &str,
        destination_path: &Path,
    ) -> StorageResult<()>;

    /// Remove the object. Deleting an absent object is a no-op, not an
    /// error.
    async fn delete_object(&self, bucket: &str, object_name: &str) -> StorageResult<()>;

    /// Whether the object is present. Absence is `false`; only backend
    /// connectivity failures raise.
    async fn exists(&self, bucket: &str, object_name: &str) -> StorageResult<bool>;

    /// The provider kind backing this driver.
    fn provider(&self) -> StorageProvider;
}

/// Reject object names that could escape the bucket root.
pub(crate) fn validate_object_name(object_name: &str) -> StorageResult<()> {
    if object_name.is_empty()
        || object_name.starts_with('/')
        || object_name.split('/').any(|segment| segment == "..")
    {
        return Err(StorageError::InvalidKey(object_name.to_string()));
    }
    Ok(())
}
