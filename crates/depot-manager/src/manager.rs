//! The assets manager: reference in, local path out.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use depot_core::constants::{DEFAULT_ASSETS_PREFIX, DEFAULT_TIMEOUT_S};
use depot_core::{AssetSpec, AssetsConfig};
use depot_storage::{create_driver, DriverSettings, StorageDriver, StorageError};
use futures::TryStreamExt;
use tokio::fs;
use uuid::Uuid;

use crate::error::AssetError;
use crate::version::{numeric, AssetVersion};

/// Manager-level settings: where to cache, how long a resolution may block,
/// and the namespacing prefix scoping this installation's assets.
#[derive(Debug, Clone)]
pub struct AssetsManagerSettings {
    pub working_dir: PathBuf,
    pub timeout: Duration,
    pub assets_prefix: String,
}

impl AssetsManagerSettings {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        AssetsManagerSettings {
            working_dir: working_dir.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_S),
            assets_prefix: DEFAULT_ASSETS_PREFIX.to_string(),
        }
    }

    pub fn from_config(config: &AssetsConfig) -> Result<Self, AssetError> {
        let working_dir = config
            .working_dir
            .clone()
            .ok_or_else(|| AssetError::Config("WORKING_DIR not configured".to_string()))?;
        Ok(AssetsManagerSettings {
            working_dir,
            timeout: Duration::from_secs(config.timeout_s),
            assets_prefix: config.assets_prefix.clone(),
        })
    }
}

/// A resolved asset: the concrete local path plus the identity it resolved
/// to and whether the cache already held it.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FetchedAsset {
    pub name: String,
    pub version: AssetVersion,
    pub path: PathBuf,
    pub from_cache: bool,
}

/// Resolves asset references into local filesystem paths.
///
/// Combines spec parsing, version resolution against the remote store, and a
/// local cache directory. Remote objects live at
/// `{prefix}/{name}/{major}.{minor}` (single object) or below
/// `{prefix}/{name}/{major}.{minor}/` (multi-file asset); cache entries
/// mirror that layout under the working directory.
pub struct AssetsManager {
    driver: Arc<dyn StorageDriver>,
    bucket: String,
    working_dir: PathBuf,
    timeout: Duration,
    assets_prefix: String,
}

impl AssetsManager {
    pub fn new(
        driver: Arc<dyn StorageDriver>,
        bucket: impl Into<String>,
        settings: AssetsManagerSettings,
    ) -> Result<Self, AssetError> {
        if !settings.working_dir.is_dir() {
            return Err(AssetError::Config(format!(
                "Working directory {} is not an existing directory",
                settings.working_dir.display()
            )));
        }
        Ok(AssetsManager {
            driver,
            bucket: bucket.into(),
            working_dir: settings.working_dir,
            timeout: settings.timeout,
            assets_prefix: settings.assets_prefix,
        })
    }

    /// Wire a manager from raw configuration: dispatch the driver settings,
    /// create the driver, and take the bucket from the chosen backend.
    pub fn from_config(config: &AssetsConfig) -> Result<Self, AssetError> {
        let driver_settings = DriverSettings::from_config(config)?;
        let driver = create_driver(&driver_settings)?;
        let bucket = driver_settings.bucket().to_string();
        Self::new(driver, bucket, AssetsManagerSettings::from_config(config)?)
    }

    pub fn provider(&self) -> depot_core::StorageProvider {
        self.driver.provider()
    }

    /// Resolve a reference string into a local path, downloading and caching
    /// on demand. The whole resolution is bounded by the configured timeout;
    /// on expiry any half-staged download is abandoned, never renamed into
    /// the cache.
    pub async fn fetch(&self, reference: &str) -> Result<FetchedAsset, AssetError> {
        let spec = AssetSpec::parse(reference)?;
        match tokio::time::timeout(self.timeout, self.fetch_spec(&spec)).await {
            Ok(result) => result,
            Err(_) => Err(AssetError::Timeout {
                reference: reference.to_string(),
                timeout_s: self.timeout.as_secs(),
            }),
        }
    }

    /// `fetch`, for an already-parsed spec. Not timeout-bounded.
    pub async fn fetch_spec(&self, spec: &AssetSpec) -> Result<FetchedAsset, AssetError> {
        let version = self.resolve_version(spec).await?;
        let cache_path = self.cache_path(spec.name(), &version);

        let from_cache = fs::metadata(&cache_path).await.is_ok();
        if !from_cache {
            match self.download_into_cache(spec.name(), &version, &cache_path).await {
                Ok(()) => {}
                // A fully specified version has no further candidate to try.
                Err(AssetError::Storage(StorageError::ObjectNotFound { .. })) => {
                    return Err(AssetError::NoVersionFound {
                        name: spec.name().to_string(),
                        requested: version.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        let path = match spec.sub_part() {
            Some(sub_part) => {
                let nested = join_key(cache_path.clone(), sub_part);
                if fs::metadata(&nested).await.is_err() {
                    return Err(AssetError::SubPartNotFound {
                        name: spec.name().to_string(),
                        sub_part: sub_part.to_string(),
                    });
                }
                nested
            }
            None => cache_path,
        };

        tracing::info!(
            name = %spec.name(),
            version = %version,
            path = %path.display(),
            from_cache,
            "Asset resolved"
        );

        Ok(FetchedAsset {
            name: spec.name().to_string(),
            version,
            path,
            from_cache,
        })
    }

    /// Pin the spec to a concrete version. A fully specified spec resolves
    /// to itself; otherwise the remote store is listed and the highest
    /// matching version wins.
    pub async fn resolve_version(&self, spec: &AssetSpec) -> Result<AssetVersion, AssetError> {
        if let (Some(major), Some(minor)) = (spec.major_version(), spec.minor_version()) {
            // Digits were validated when the spec was constructed.
            return AssetVersion::new(major, minor).ok_or_else(|| AssetError::Config(format!(
                "Spec carried a malformed version `{major}.{minor}`"
            )));
        }

        let mut candidates = self.list_versions(spec.name()).await?;
        if let Some(major) = spec.major_version() {
            let wanted = numeric(major);
            candidates.retain(|v| v.major_value() == wanted);
        }

        candidates
            .into_iter()
            .next()
            .ok_or_else(|| AssetError::NoVersionFound {
                name: spec.name().to_string(),
                requested: match spec.major_version() {
                    Some(major) => format!("{major}.*"),
                    None => "*".to_string(),
                },
            })
    }

    /// All remote versions of an asset, highest first.
    pub async fn list_versions(&self, name: &str) -> Result<Vec<AssetVersion>, AssetError> {
        let prefix = format!("{}/{}/", self.assets_prefix, name);
        let names: Vec<String> = self
            .driver
            .iterate_objects(&self.bucket, Some(&prefix))
            .await?
            .try_collect()
            .await?;

        let mut versions: Vec<AssetVersion> = names
            .iter()
            .filter_map(|object_name| object_name.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .filter_map(|segment| segment.parse::<AssetVersion>().ok())
            .collect();
        versions.sort_unstable();
        versions.dedup();
        versions.reverse();
        Ok(versions)
    }

    /// Upload a new single-object asset version. Returns the object key.
    pub async fn push(
        &self,
        local_path: &Path,
        name: &str,
        version: &AssetVersion,
    ) -> Result<String, AssetError> {
        // Runs the full name validation even though no reference string is
        // involved.
        let spec = AssetSpec::new(
            name,
            Some(version.major().to_string()),
            Some(version.minor().to_string()),
            None,
        )?;
        let key = self.object_key(spec.name(), version);
        self.driver
            .upload_object(local_path, &self.bucket, &key)
            .await?;
        Ok(key)
    }

    /// Whether the exact version is present remotely.
    pub async fn exists(&self, name: &str, version: &AssetVersion) -> Result<bool, AssetError> {
        let key = self.object_key(name, version);
        Ok(self.driver.exists(&self.bucket, &key).await?)
    }

    /// Remove a remote single-object version. Absent versions are a no-op.
    pub async fn delete(&self, name: &str, version: &AssetVersion) -> Result<(), AssetError> {
        let key = self.object_key(name, version);
        self.driver.delete_object(&self.bucket, &key).await?;
        Ok(())
    }

    fn object_key(&self, name: &str, version: &AssetVersion) -> String {
        format!("{}/{}/{}", self.assets_prefix, name, version)
    }

    fn cache_path(&self, name: &str, version: &AssetVersion) -> PathBuf {
        join_key(
            self.working_dir.clone(),
            &self.object_key(name, version),
        )
    }

    async fn download_into_cache(
        &self,
        name: &str,
        version: &AssetVersion,
        cache_path: &Path,
    ) -> Result<(), AssetError> {
        let parent = cache_path
            .parent()
            .ok_or_else(|| AssetError::Config("Cache path has no parent".to_string()))?
            .to_path_buf();
        fs::create_dir_all(&parent).await?;

        // Stage under a temporary name, then rename into the final cache
        // path so no caller ever sees a partial entry.
        let staging = parent.join(format!(".{}.tmp", Uuid::new_v4()));
        let staged = self.stage_download(name, version, &staging).await;
        if let Err(e) = staged {
            let _ = fs::remove_file(&staging).await;
            let _ = fs::remove_dir_all(&staging).await;
            return Err(e);
        }

        if let Err(rename_err) = fs::rename(&staging, cache_path).await {
            // A concurrent resolution may have populated the entry first.
            let _ = fs::remove_file(&staging).await;
            let _ = fs::remove_dir_all(&staging).await;
            if fs::metadata(cache_path).await.is_err() {
                return Err(rename_err.into());
            }
        }
        Ok(())
    }

    async fn stage_download(
        &self,
        name: &str,
        version: &AssetVersion,
        staging: &Path,
    ) -> Result<(), AssetError> {
        let key = self.object_key(name, version);

        if self.driver.exists(&self.bucket, &key).await? {
            self.driver
                .download_object(&self.bucket, &key, staging)
                .await?;
            return Ok(());
        }

        // Not a single object; treat the key as a directory asset.
        let dir_prefix = format!("{key}/");
        let objects: Vec<String> = self
            .driver
            .iterate_objects(&self.bucket, Some(&dir_prefix))
            .await?
            .try_collect()
            .await?;
        if objects.is_empty() {
            return Err(StorageError::ObjectNotFound {
                bucket: self.bucket.clone(),
                object_name: key,
            }
            .into());
        }

        for object_name in &objects {
            let Some(rest) = object_name.strip_prefix(&dir_prefix) else {
                continue;
            };
            let destination = join_key(staging.to_path_buf(), rest);
            self.driver
                .download_object(&self.bucket, object_name, &destination)
                .await?;
        }
        Ok(())
    }
}

/// Append a slash-separated key to a host path segment by segment.
fn join_key(mut path: PathBuf, key: &str) -> PathBuf {
    for segment in key.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path
}
