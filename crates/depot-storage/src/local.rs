use std::path::{Path, PathBuf};

use async_trait::async_trait;
use depot_core::StorageProvider;
use futures::future::ready;
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::fs;
use uuid::Uuid;

use crate::settings::LocalDriverSettings;
use crate::traits::{
    validate_object_name, ObjectStream, StorageDriver, StorageError, StorageResult,
};

/// Local filesystem storage driver, the reference implementation.
///
/// The backend root is a configured directory; buckets are subdirectories of
/// it and object names map segment-by-segment to relative paths below the
/// bucket directory.
#[derive(Debug, Clone)]
pub struct LocalStorageDriver {
    root: PathBuf,
}

impl LocalStorageDriver {
    /// Create a driver over an existing root directory.
    pub fn new(settings: LocalDriverSettings) -> StorageResult<Self> {
        if !settings.root.is_dir() {
            return Err(StorageError::ConfigError(format!(
                "Local storage root {} is not an existing directory",
                settings.root.display()
            )));
        }
        Ok(LocalStorageDriver {
            root: settings.root,
        })
    }

    fn bucket_path(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }

    /// Map a slash-separated object name to its host path.
    fn object_path(&self, bucket: &str, object_name: &str) -> PathBuf {
        let mut path = self.bucket_path(bucket);
        for segment in object_name.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }
}

#[async_trait]
impl StorageDriver for LocalStorageDriver {
    async fn iterate_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> StorageResult<ObjectStream> {
        let bucket_path = self.bucket_path(bucket);
        match fs::metadata(&bucket_path).await {
            Ok(meta) if meta.is_dir() => {}
            _ => return Err(StorageError::ContainerNotFound(bucket.to_string())),
        }

        let prefix = prefix.map(str::to_string);
        let walk = stream::try_unfold(
            WalkState {
                bucket_path: bucket_path.clone(),
                dirs: vec![bucket_path],
                files: Vec::new(),
            },
            walk_next,
        );

        Ok(walk
            .try_filter(move |name| {
                ready(prefix.as_deref().is_none_or(|p| name.starts_with(p)))
            })
            .boxed())
    }

    async fn upload_object(
        &self,
        local_path: &Path,
        bucket: &str,
        object_name: &str,
    ) -> StorageResult<()> {
        validate_object_name(object_name)?;
        let object_path = self.object_path(bucket, object_name);
        let start = std::time::Instant::now();

        // Clear whatever currently occupies the destination. Three distinct
        // cases: a file at the exact path, a directory at the exact path,
        // and a plain file occupying a segment that must become a directory.
        match fs::metadata(&object_path).await {
            Ok(meta) if meta.is_file() => {
                fs::remove_file(&object_path).await?;
            }
            Ok(meta) if meta.is_dir() => {
                fs::remove_dir_all(&object_path).await?;
            }
            _ => {}
        }

        let segments: Vec<&str> = object_name.split('/').filter(|s| !s.is_empty()).collect();
        let mut dir = self.bucket_path(bucket);
        for segment in segments.iter().take(segments.len().saturating_sub(1)) {
            dir.push(segment);
            match fs::metadata(&dir).await {
                Ok(meta) if meta.is_file() => {
                    fs::remove_file(&dir).await?;
                }
                _ => {}
            }
        }

        let parent = object_path
            .parent()
            .ok_or_else(|| StorageError::InvalidKey(object_name.to_string()))?
            .to_path_buf();
        fs::create_dir_all(&parent).await?;

        // Write through a temporary file renamed into place, so a concurrent
        // reader never observes a truncated object under the final name.
        let tmp_path = parent.join(format!(".{}.tmp", Uuid::new_v4()));
        let size_bytes = match fs::copy(local_path, &tmp_path).await {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::UploadFailed(format!(
                    "Failed to copy {} into {}: {}",
                    local_path.display(),
                    bucket,
                    e
                )));
            }
        };
        if let Err(e) = fs::rename(&tmp_path, &object_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::UploadFailed(format!(
                "Failed to move object into place at {}: {}",
                object_path.display(),
                e
            )));
        }

        tracing::info!(
            bucket = %bucket,
            object = %object_name,
            size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local upload successful"
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
        let object_path = self.object_path(bucket, object_name);

        match fs::metadata(&object_path).await {
            Ok(meta) if meta.is_file() => {}
            _ => {
                tracing::error!(bucket = %bucket, object = %object_name, "Object not found");
                return Err(StorageError::ObjectNotFound {
                    bucket: bucket.to_string(),
                    object_name: object_name.to_string(),
                });
            }
        }

        if let Some(parent) = destination_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(&object_path, destination_path)
            .await
            .map_err(|e| {
                StorageError::DownloadFailed(format!(
                    "Failed to copy object to {}: {}",
                    destination_path.display(),
                    e
                ))
            })?;

        tracing::debug!(bucket = %bucket, object = %object_name, "Local download successful");

        Ok(())
    }

    async fn delete_object(&self, bucket: &str, object_name: &str) -> StorageResult<()> {
        validate_object_name(object_name)?;
        let object_path = self.object_path(bucket, object_name);

        match fs::metadata(&object_path).await {
            Ok(meta) if meta.is_file() => {
                fs::remove_file(&object_path).await.map_err(|e| {
                    StorageError::DeleteFailed(format!(
                        "Failed to delete {}: {}",
                        object_path.display(),
                        e
                    ))
                })?;
                tracing::info!(bucket = %bucket, object = %object_name, "Local delete successful");
            }
            // Deleting an absent object is a no-op.
            _ => {}
        }

        Ok(())
    }

    async fn exists(&self, bucket: &str, object_name: &str) -> StorageResult<bool> {
        validate_object_name(object_name)?;
        let object_path = self.object_path(bucket, object_name);
        match fs::metadata(&object_path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(_) => Ok(false),
        }
    }

    fn provider(&self) -> StorageProvider {
        StorageProvider::Local
    }
}

struct WalkState {
    bucket_path: PathBuf,
    dirs: Vec<PathBuf>,
    files: Vec<PathBuf>,
}

/// Depth-first walk over the bucket directory, yielding one relative object
/// name per step. Directories are read lazily as the stream is polled.
async fn walk_next(mut state: WalkState) -> StorageResult<Option<(String, WalkState)>> {
    loop {
        if let Some(file) = state.files.pop() {
            let name = relative_object_name(&state.bucket_path, &file)?;
            return Ok(Some((name, state)));
        }
        let Some(dir) = state.dirs.pop() else {
            return Ok(None);
        };
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                state.dirs.push(entry.path());
            } else if file_type.is_file() {
                state.files.push(entry.path());
            }
        }
    }
}

fn relative_object_name(bucket_path: &Path, file: &Path) -> StorageResult<String> {
    let relative = file.strip_prefix(bucket_path).map_err(|_| {
        StorageError::BackendError(format!(
            "Walked path {} escapes bucket {}",
            file.display(),
            bucket_path.display()
        ))
    })?;
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn driver_in(dir: &Path) -> LocalStorageDriver {
        LocalStorageDriver::new(LocalDriverSettings {
            root: dir.to_path_buf(),
            bucket: "assets".to_string(),
        })
        .unwrap()
    }

    async fn write_source(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).await.unwrap();
        path
    }

    async fn collect_names(driver: &LocalStorageDriver, bucket: &str) -> Vec<String> {
        let mut names: Vec<String> = driver
            .iterate_objects(bucket, None)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        names.sort();
        names
    }

    #[tokio::test]
    async fn upload_download_round_trip() {
        let root = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        let driver = driver_in(root.path());

        let source = write_source(scratch.path(), "weights.bin", b"hello").await;
        driver
            .upload_object(&source, "store", "models/x:1.0")
            .await
            .unwrap();

        assert!(driver.exists("store", "models/x:1.0").await.unwrap());

        let dest = scratch.path().join("fetched.bin");
        driver
            .download_object("store", "models/x:1.0", &dest)
            .await
            .unwrap();
        assert_eq!(fs::read(&dest).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn second_upload_replaces_content() {
        let root = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        let driver = driver_in(root.path());

        let first = write_source(scratch.path(), "v1", b"first").await;
        let second = write_source(scratch.path(), "v2", b"second").await;
        driver.upload_object(&first, "b", "obj").await.unwrap();
        driver.upload_object(&second, "b", "obj").await.unwrap();

        let dest = scratch.path().join("out");
        driver.download_object("b", "obj", &dest).await.unwrap();
        assert_eq!(fs::read(&dest).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn upload_replaces_directory_at_destination() {
        let root = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        let driver = driver_in(root.path());

        let source = write_source(scratch.path(), "src", b"nested").await;
        driver.upload_object(&source, "b", "a/b").await.unwrap();
        // `a` is now a directory; uploading plain `a` must replace it.
        driver.upload_object(&source, "b", "a").await.unwrap();

        assert!(driver.exists("b", "a").await.unwrap());
        assert!(!driver.exists("b", "a/b").await.unwrap());
    }

    #[tokio::test]
    async fn upload_replaces_file_blocking_a_directory_segment() {
        let root = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        let driver = driver_in(root.path());

        let source = write_source(scratch.path(), "src", b"payload").await;
        driver.upload_object(&source, "b", "a").await.unwrap();
        // `a` is a plain file; uploading `a/b` must turn it into a directory.
        driver.upload_object(&source, "b", "a/b").await.unwrap();

        assert!(driver.exists("b", "a/b").await.unwrap());
        let dest = scratch.path().join("out");
        driver.download_object("b", "a/b", &dest).await.unwrap();
        assert_eq!(fs::read(&dest).await.unwrap(), b"payload");
    }

    #[tokio::test]
    async fn iterate_empty_bucket_yields_nothing() {
        let root = tempdir().unwrap();
        let driver = driver_in(root.path());
        fs::create_dir(root.path().join("empty")).await.unwrap();

        assert!(collect_names(&driver, "empty").await.is_empty());
    }

    #[tokio::test]
    async fn iterate_missing_bucket_fails() {
        let root = tempdir().unwrap();
        let driver = driver_in(root.path());

        let err = match driver.iterate_objects("nope", None).await {
            Ok(_) => panic!("expected iterate_objects to fail for missing bucket"),
            Err(e) => e,
        };
        assert!(matches!(err, StorageError::ContainerNotFound(ref b) if b == "nope"));
    }

    #[tokio::test]
    async fn iterate_walks_nested_objects_and_filters_by_prefix() {
        let root = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        let driver = driver_in(root.path());

        let source = write_source(scratch.path(), "src", b"x").await;
        for name in ["m/1.0", "m/1.1", "n/2.0", "top"] {
            driver.upload_object(&source, "b", name).await.unwrap();
        }

        assert_eq!(collect_names(&driver, "b").await, vec!["m/1.0", "m/1.1", "n/2.0", "top"]);

        let mut filtered: Vec<String> = driver
            .iterate_objects("b", Some("m/"))
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        filtered.sort();
        assert_eq!(filtered, vec!["m/1.0", "m/1.1"]);
    }

    #[tokio::test]
    async fn download_absent_object_fails_with_object_not_found() {
        let root = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        let driver = driver_in(root.path());
        fs::create_dir(root.path().join("b")).await.unwrap();

        let err = driver
            .download_object("b", "missing", &scratch.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ObjectNotFound { .. }));
    }

    #[tokio::test]
    async fn delete_absent_object_is_a_no_op() {
        let root = tempdir().unwrap();
        let driver = driver_in(root.path());

        driver.delete_object("b", "never-there").await.unwrap();
    }

    #[tokio::test]
    async fn delete_then_exists() {
        let root = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        let driver = driver_in(root.path());

        let source = write_source(scratch.path(), "src", b"x").await;
        driver.upload_object(&source, "b", "obj").await.unwrap();
        driver.delete_object("b", "obj").await.unwrap();

        assert!(!driver.exists("b", "obj").await.unwrap());
    }

    #[tokio::test]
    async fn traversal_names_are_rejected() {
        let root = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        let driver = driver_in(root.path());
        let source = write_source(scratch.path(), "src", b"x").await;

        let err = driver
            .upload_object(&source, "b", "../escape")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));

        let err = driver.exists("b", "/etc/passwd").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn missing_root_is_a_configuration_error() {
        let err = LocalStorageDriver::new(LocalDriverSettings {
            root: PathBuf::from("/definitely/not/a/dir"),
            bucket: "assets".to_string(),
        })
        .unwrap_err();
        assert!(matches!(err, StorageError::ConfigError(_)));
    }
}
