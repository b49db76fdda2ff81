use std::sync::Arc;

#[cfg(feature = "storage-gcs")]
use crate::GcsStorageDriver;
#[cfg(feature = "storage-local")]
use crate::LocalStorageDriver;
#[cfg(feature = "storage-s3")]
use crate::S3StorageDriver;
use crate::{DriverSettings, StorageDriver, StorageResult};
#[cfg(feature = "storage-s3")]
use depot_core::StorageProvider;
#[cfg(not(all(
    feature = "storage-local",
    feature = "storage-s3",
    feature = "storage-gcs"
)))]
use crate::StorageError;

/// Create a storage driver from validated settings.
pub fn create_driver(settings: &DriverSettings) -> StorageResult<Arc<dyn StorageDriver>> {
    match settings {
        #[cfg(feature = "storage-local")]
        DriverSettings::Local(local) => Ok(Arc::new(LocalStorageDriver::new(local.clone())?)),

        #[cfg(not(feature = "storage-local"))]
        DriverSettings::Local(_) => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-s3")]
        DriverSettings::S3(s3) => Ok(Arc::new(S3StorageDriver::new(
            s3.clone(),
            StorageProvider::S3,
        ))),

        #[cfg(feature = "storage-s3")]
        DriverSettings::S3Ssm(s3) => Ok(Arc::new(S3StorageDriver::new(
            s3.clone(),
            StorageProvider::S3Ssm,
        ))),

        #[cfg(not(feature = "storage-s3"))]
        DriverSettings::S3(_) | DriverSettings::S3Ssm(_) => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-gcs")]
        DriverSettings::Gcs(gcs) => Ok(Arc::new(GcsStorageDriver::new(gcs.clone()))),

        #[cfg(not(feature = "storage-gcs"))]
        DriverSettings::Gcs(_) => Err(StorageError::ConfigError(
            "GCS storage backend not available (storage-gcs feature not enabled)".to_string(),
        )),
    }
}
