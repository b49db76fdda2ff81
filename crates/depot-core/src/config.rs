//! Configuration module
//!
//! Environment-driven settings for driver selection and the assets manager.
//! Reading the process environment happens here, at the outermost layer;
//! everything below takes explicit values.

use std::env;
use std::path::PathBuf;

use anyhow::Context;

use crate::constants::{DEFAULT_ASSETS_PREFIX, DEFAULT_TIMEOUT_S};
use crate::provider::StorageProvider;

/// Raw configuration for driver selection and the assets manager.
///
/// Which fields are required depends on the selected provider; the driver
/// settings dispatch performs that validation.
#[derive(Clone, Debug)]
pub struct AssetsConfig {
    /// Storage provider selector. `None` falls back to the default (`gcs`).
    pub storage_provider: Option<StorageProvider>,
    /// Bucket/container name holding the assets.
    pub bucket: Option<String>,
    /// Root directory for the `local` provider. Must already exist.
    pub local_root: Option<PathBuf>,
    pub s3_region: Option<String>,
    pub aws_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, etc.).
    pub s3_endpoint: Option<String>,
    /// Local cache directory for the assets manager. Must already exist.
    pub working_dir: Option<PathBuf>,
    /// End-to-end resolution timeout in seconds.
    pub timeout_s: u64,
    /// Namespacing prefix scoping all assets of one installation.
    pub assets_prefix: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        AssetsConfig {
            storage_provider: None,
            bucket: None,
            local_root: None,
            s3_region: None,
            aws_region: None,
            s3_endpoint: None,
            working_dir: None,
            timeout_s: DEFAULT_TIMEOUT_S,
            assets_prefix: DEFAULT_ASSETS_PREFIX.to_string(),
        }
    }
}

impl AssetsConfig {
    /// Build the configuration from the process environment.
    ///
    /// Recognized variables: `STORAGE_PROVIDER`, `ASSETS_BUCKET_NAME`,
    /// `ASSETS_LOCAL_DIR`, `S3_REGION`, `AWS_REGION`, `S3_ENDPOINT`,
    /// `WORKING_DIR`, `ASSETSMANAGER_TIMEOUT_S`, `ASSETS_PREFIX`.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let storage_provider = env_opt("STORAGE_PROVIDER")
            .map(|s| s.parse::<StorageProvider>())
            .transpose()?;

        let timeout_s = match env_opt("ASSETSMANAGER_TIMEOUT_S") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("Invalid ASSETSMANAGER_TIMEOUT_S `{raw}`"))?,
            None => DEFAULT_TIMEOUT_S,
        };

        Ok(AssetsConfig {
            storage_provider,
            bucket: env_opt("ASSETS_BUCKET_NAME"),
            local_root: env_opt("ASSETS_LOCAL_DIR").map(PathBuf::from),
            s3_region: env_opt("S3_REGION"),
            aws_region: env_opt("AWS_REGION"),
            s3_endpoint: env_opt("S3_ENDPOINT"),
            working_dir: env_opt("WORKING_DIR").map(PathBuf::from),
            timeout_s,
            assets_prefix: env_opt("ASSETS_PREFIX")
                .unwrap_or_else(|| DEFAULT_ASSETS_PREFIX.to_string()),
        })
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_provider_and_standard_timeout() {
        let config = AssetsConfig::default();
        assert_eq!(config.storage_provider, None);
        assert_eq!(config.timeout_s, DEFAULT_TIMEOUT_S);
        assert_eq!(config.assets_prefix, DEFAULT_ASSETS_PREFIX);
    }
}
