use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use depot_core::StorageProvider;
use futures::stream::{self, StreamExt, TryStreamExt};
use object_store::gcp::{GoogleCloudStorage, GoogleCloudStorageBuilder};
use object_store::path::Path as ObjectPath;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStore, ObjectStoreExt, PutPayload, Result as ObjectResult};
use tokio::fs;

use crate::settings::GcsDriverSettings;
use crate::traits::{
    validate_object_name, ObjectStream, StorageDriver, StorageError, StorageResult,
};

/// Google Cloud Storage driver. Credentials are application default
/// credentials from the environment; the configured bucket is passed per
/// call, so the settings payload carries nothing the driver needs to keep.
#[derive(Debug, Clone)]
pub struct GcsStorageDriver;

impl GcsStorageDriver {
    pub fn new(_settings: GcsDriverSettings) -> Self {
        GcsStorageDriver
    }

    fn store(&self, bucket: &str) -> StorageResult<GoogleCloudStorage> {
        GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))
    }
}

#[async_trait]
impl StorageDriver for GcsStorageDriver {
    async fn iterate_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> StorageResult<ObjectStream> {
        let store = self.store(bucket)?;
        let prefix_path = prefix.map(|p| ObjectPath::from(p.to_string()));

        let names: Vec<String> = store
            .list(prefix_path.as_ref())
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await
            .map_err(|e| match e {
                ObjectStoreError::NotFound { .. } => {
                    StorageError::ContainerNotFound(bucket.to_string())
                }
                other => StorageError::BackendError(other.to_string()),
            })?;

        Ok(stream::iter(names.into_iter().map(Ok)).boxed())
    }

    async fn upload_object(
        &self,
        local_path: &Path,
        bucket: &str,
        object_name: &str,
    ) -> StorageResult<()> {
        validate_object_name(object_name)?;
        let data = fs::read(local_path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to read {}: {}",
                local_path.display(),
                e
            ))
        })?;
        let size_bytes = data.len() as u64;
        let store = self.store(bucket)?;
        let location = ObjectPath::from(object_name.to_string());

        let result: ObjectResult<_> = store
            .put(&location, PutPayload::from(Bytes::from(data)))
            .await;
        result.map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        tracing::info!(
            bucket = %bucket,
            key = %object_name,
            size_bytes,
            "GCS upload successful"
        );

        Ok(())
    }

    async fn download_object(
        &self,
        bucket: &str,
        object_name: &str,
        destination_path: &Path,
    ) -> StorageResult<()> {
        validate_object_name(object_name)?;
        let store = self.store(bucket)?;
        let location = ObjectPath::from(object_name.to_string());

        let result: ObjectResult<_> = store.get(&location).await;
        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                object_name: object_name.to_string(),
            },
            other => StorageError::DownloadFailed(other.to_string()),
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        if let Some(parent) = destination_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(destination_path, &bytes).await.map_err(|e| {
            StorageError::DownloadFailed(format!(
                "Failed to write {}: {}",
                destination_path.display(),
                e
            ))
        })?;

        tracing::info!(
            bucket = %bucket,
            key = %object_name,
            size_bytes = bytes.len() as u64,
            "GCS download successful"
        );

        Ok(())
    }

    async fn delete_object(&self, bucket: &str, object_name: &str) -> StorageResult<()> {
        validate_object_name(object_name)?;
        let store = self.store(bucket)?;
        let location = ObjectPath::from(object_name.to_string());

        let result: ObjectResult<_> = store.delete(&location).await;
        match result {
            Ok(()) => Ok(()),
            Err(ObjectStoreError::NotFound { .. }) => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(e.to_string())),
        }
    }

    async fn exists(&self, bucket: &str, object_name: &str) -> StorageResult<bool> {
        validate_object_name(object_name)?;
        let store = self.store(bucket)?;
        let location = ObjectPath::from(object_name.to_string());

        match store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn provider(&self) -> StorageProvider {
        StorageProvider::Gcs
    }
}
