//! Shared constants.

/// Default namespacing prefix under which all assets of one installation live.
pub const DEFAULT_ASSETS_PREFIX: &str = "assets-v3";

/// Default end-to-end resolution timeout, in seconds.
pub const DEFAULT_TIMEOUT_S: u64 = 5 * 60;
