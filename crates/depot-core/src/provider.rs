use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage provider kinds
///
/// This enum defines the closed set of supported storage backends.
/// It's defined in core because it's used in configuration and by the
/// driver settings dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    Local,
    S3,
    /// S3 with session parameters provisioned out-of-band (SSM). Same
    /// settings shape as `S3`; only credential plumbing differs.
    S3Ssm,
    Gcs,
}

impl Default for StorageProvider {
    fn default() -> Self {
        StorageProvider::Gcs
    }
}

impl FromStr for StorageProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageProvider::Local),
            "s3" => Ok(StorageProvider::S3),
            "s3ssm" => Ok(StorageProvider::S3Ssm),
            "gcs" => Ok(StorageProvider::Gcs),
            _ => Err(anyhow::anyhow!(
                "Unknown storage provider `{}` (expected one of: local, s3, s3ssm, gcs)",
                s
            )),
        }
    }
}

impl Display for StorageProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageProvider::Local => write!(f, "local"),
            StorageProvider::S3 => write!(f, "s3"),
            StorageProvider::S3Ssm => write!(f, "s3ssm"),
            StorageProvider::Gcs => write!(f, "gcs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_providers() {
        assert_eq!("local".parse::<StorageProvider>().unwrap(), StorageProvider::Local);
        assert_eq!("s3".parse::<StorageProvider>().unwrap(), StorageProvider::S3);
        assert_eq!("s3ssm".parse::<StorageProvider>().unwrap(), StorageProvider::S3Ssm);
        assert_eq!("GCS".parse::<StorageProvider>().unwrap(), StorageProvider::Gcs);
    }

    #[test]
    fn rejects_unknown_provider() {
        let err = "azure".parse::<StorageProvider>().unwrap_err();
        assert!(err.to_string().contains("azure"));
    }

    #[test]
    fn default_is_gcs() {
        assert_eq!(StorageProvider::default(), StorageProvider::Gcs);
    }

    #[test]
    fn display_round_trips() {
        for p in [
            StorageProvider::Local,
            StorageProvider::S3,
            StorageProvider::S3Ssm,
            StorageProvider::Gcs,
        ] {
            assert_eq!(p.to_string().parse::<StorageProvider>().unwrap(), p);
        }
    }
}
