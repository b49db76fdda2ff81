//! Depot Storage Library
//!
//! This crate provides the storage driver abstraction and its backend
//! implementations. Every backend satisfies the same `StorageDriver`
//! contract, so a backend swap is transparent to callers.
//!
//! # Object names
//!
//! Object names are slash-separated keys relative to a bucket root,
//! regardless of host path conventions. Names must not contain `..` or a
//! leading `/`.

pub mod factory;
#[cfg(feature = "storage-gcs")]
pub mod gcs;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod settings;
pub mod traits;

// Re-export commonly used types
pub use depot_core::StorageProvider;
pub use factory::create_driver;
#[cfg(feature = "storage-gcs")]
pub use gcs::GcsStorageDriver;
#[cfg(feature = "storage-local")]
pub use local::LocalStorageDriver;
#[cfg(feature = "storage-s3")]
pub use s3::S3StorageDriver;
pub use settings::{DriverSettings, GcsDriverSettings, LocalDriverSettings, S3DriverSettings};
pub use traits::{ObjectStream, StorageDriver, StorageError, StorageResult};
