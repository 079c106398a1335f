//! Configuration types deserialized from `lumen.toml`.

use serde::Deserialize;
use std::path::PathBuf;

/// The top-level configuration parsed from `lumen.toml`.
///
/// Every section is optional; an empty file yields [`LumenConfig::default`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LumenConfig {
    /// Artifact cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Encoder settings.
    #[serde(default)]
    pub serialize: SerializeConfig,
}

/// Where and how serialized programs are cached.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Cache directory, relative to the directory holding `lumen.toml`.
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    /// Compress artifact payloads with zlib.
    #[serde(default)]
    pub compress: bool,
    /// Decode every program after encoding it and refuse to cache it unless
    /// the result is structurally equivalent.
    #[serde(default)]
    pub verify_on_store: bool,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".lumen-cache")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            compress: false,
            verify_on_store: false,
        }
    }
}

/// Encoder settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SerializeConfig {
    /// Drop names from serialized programs.
    #[serde(default)]
    pub strip: bool,
}
