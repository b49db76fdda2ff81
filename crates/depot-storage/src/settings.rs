//! Per-backend driver settings and their dispatch.
//!
//! `DriverSettings` is a closed tagged union: the provider tag and the
//! validated settings payload always agree by construction. Dispatch
//! instantiates exactly one payload; each payload validates its own fields.

use std::path::PathBuf;

use depot_core::{AssetsConfig, StorageProvider};

use crate::traits::{StorageError, StorageResult};

/// Settings for the local filesystem backend. The root directory must
/// already exist; buckets are subdirectories of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDriverSettings {
    pub root: PathBuf,
    pub bucket: String,
}

impl LocalDriverSettings {
    pub fn from_config(config: &AssetsConfig) -> StorageResult<Self> {
        let root = config
            .local_root
            .clone()
            .ok_or_else(|| StorageError::ConfigError("ASSETS_LOCAL_DIR not configured".to_string()))?;
        if !root.is_dir() {
            return Err(StorageError::ConfigError(format!(
                "Local storage root {} is not an existing directory",
                root.display()
            )));
        }
        let bucket = require_bucket(config)?;
        Ok(LocalDriverSettings { root, bucket })
    }
}

/// Settings for S3 and S3-compatible backends. Credentials come from the
/// ambient environment; `endpoint_url` targets MinIO and friends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3DriverSettings {
    pub bucket: String,
    pub region: String,
    pub endpoint_url: Option<String>,
}

impl S3DriverSettings {
    pub fn from_config(config: &AssetsConfig) -> StorageResult<Self> {
        let bucket = require_bucket(config)?;
        let region = config
            .s3_region
            .clone()
            .or_else(|| config.aws_region.clone())
            .ok_or_else(|| {
                StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
            })?;
        Ok(S3DriverSettings {
            bucket,
            region,
            endpoint_url: config.s3_endpoint.clone(),
        })
    }
}

/// Settings for Google Cloud Storage. Credentials are application default
/// credentials from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcsDriverSettings {
    pub bucket: String,
}

impl GcsDriverSettings {
    pub fn from_config(config: &AssetsConfig) -> StorageResult<Self> {
        Ok(GcsDriverSettings {
            bucket: require_bucket(config)?,
        })
    }
}

/// One backend kind plus its validated settings payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverSettings {
    Local(LocalDriverSettings),
    S3(S3DriverSettings),
    S3Ssm(S3DriverSettings),
    Gcs(GcsDriverSettings),
}

impl DriverSettings {
    /// Dispatch the raw configuration to exactly one backend's settings.
    ///
    /// The provider comes from the configuration when declared, else falls
    /// back to the default (`gcs`). Unknown provider strings never reach
    /// this point; they are rejected when the raw value is parsed into
    /// `StorageProvider`.
    pub fn from_config(config: &AssetsConfig) -> StorageResult<Self> {
        let provider = config.storage_provider.unwrap_or_default();
        match provider {
            StorageProvider::Local => {
                LocalDriverSettings::from_config(config).map(DriverSettings::Local)
            }
            StorageProvider::S3 => S3DriverSettings::from_config(config).map(DriverSettings::S3),
            StorageProvider::S3Ssm => {
                S3DriverSettings::from_config(config).map(DriverSettings::S3Ssm)
            }
            StorageProvider::Gcs => GcsDriverSettings::from_config(config).map(DriverSettings::Gcs),
        }
    }

    pub fn provider(&self) -> StorageProvider {
        match self {
            DriverSettings::Local(_) => StorageProvider::Local,
            DriverSettings::S3(_) => StorageProvider::S3,
            DriverSettings::S3Ssm(_) => StorageProvider::S3Ssm,
            DriverSettings::Gcs(_) => StorageProvider::Gcs,
        }
    }

    /// The configured bucket/container name.
    pub fn bucket(&self) -> &str {
        match self {
            DriverSettings::Local(s) => &s.bucket,
            DriverSettings::S3(s) | DriverSettings::S3Ssm(s) => &s.bucket,
            DriverSettings::Gcs(s) => &s.bucket,
        }
    }
}

fn require_bucket(config: &AssetsConfig) -> StorageResult<String> {
    config
        .bucket
        .clone()
        .ok_or_else(|| StorageError::ConfigError("ASSETS_BUCKET_NAME not configured".to_string()))
}
