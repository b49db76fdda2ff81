use depot_core::InvalidAssetSpec;
use depot_storage::StorageError;

/// Errors from asset resolution.
///
/// `Storage(ObjectNotFound)` never escapes a resolution: the manager treats
/// it as control flow while probing candidates and converts exhaustion into
/// `NoVersionFound`. Everything else is terminal for the attempt.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error(transparent)]
    InvalidSpec(#[from] InvalidAssetSpec),

    #[error("No version of asset `{name}` matches `{requested}`")]
    NoVersionFound { name: String, requested: String },

    #[error("Resolution of `{reference}` timed out after {timeout_s}s")]
    Timeout { reference: String, timeout_s: u64 },

    #[error("Sub-part `{sub_part}` does not exist in asset `{name}`")]
    SubPartNotFound { name: String, sub_part: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
