//! The cache index: which programs are cached and what they contain.
//!
//! The index is stored as `index.json` in the cache directory. It is the
//! source of truth for which artifacts are live; artifacts it does not list
//! are removed by garbage collection.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Name of the index file within the cache directory.
pub const INDEX_FILE: &str = "index.json";

/// Every cached program, keyed by its cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheIndex {
    /// Lumen version that produced this cache. Invalidate on version change.
    pub lumen_version: String,

    /// Cached programs by key.
    pub entries: BTreeMap<String, IndexEntry>,
}

/// Summary of one cached program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Program name, if the program has one and names were kept.
    pub program_name: Option<String>,
    /// Stored payload size in bytes.
    pub payload_size: u64,
    /// Identity table size recorded in the payload header.
    pub object_count: u64,
    /// Number of functions in the program.
    pub function_count: usize,
}

impl CacheIndex {
    /// Creates an empty index for the given Lumen version.
    pub fn new(lumen_version: &str) -> Self {
        Self {
            lumen_version: lumen_version.to_string(),
            entries: BTreeMap::new(),
        }
    }

    /// Loads the index from the cache directory, returning `None` if the
    /// file doesn't exist or can't be parsed.
    pub fn load(cache_dir: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(cache_dir.join(INDEX_FILE)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Saves the index to the cache directory, creating it if needed.
    pub fn save(&self, cache_dir: &Path) -> Result<(), CacheError> {
        std::fs::create_dir_all(cache_dir).map_err(|e| CacheError::Io {
            path: cache_dir.to_path_buf(),
            source: e,
        })?;
        let path = cache_dir.join(INDEX_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| CacheError::Io { path, source: e })
    }

    /// Returns `true` if this index was produced by a compatible Lumen version.
    pub fn is_compatible(&self, current_version: &str) -> bool {
        self.lumen_version == current_version
    }

    /// Total stored payload bytes.
    pub fn payload_bytes(&self) -> u64 {
        self.entries.values().map(|e| e.payload_size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> IndexEntry {
        IndexEntry {
            program_name: Some(name.to_string()),
            payload_size: 120,
            object_count: 9,
            function_count: 2,
        }
    }

    #[test]
    fn new_index_is_empty() {
        let index = CacheIndex::new("0.1.0");
        assert_eq!(index.lumen_version, "0.1.0");
        assert!(index.entries.is_empty());
        assert_eq!(index.payload_bytes(), 0);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = CacheIndex::new("0.1.0");
        index.entries.insert("abc123".to_string(), entry("blur"));
        index.save(dir.path()).unwrap();

        let loaded = CacheIndex::load(dir.path()).unwrap();
        assert_eq!(loaded, index);
        assert_eq!(loaded.entries["abc123"].program_name.as_deref(), Some("blur"));
    }

    #[test]
    fn load_nonexistent_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CacheIndex::load(dir.path()).is_none());
    }

    #[test]
    fn load_corrupt_json_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), "not valid json {{{").unwrap();
        assert!(CacheIndex::load(dir.path()).is_none());
    }

    #[test]
    fn compatibility_is_exact_version_match() {
        let index = CacheIndex::new("0.1.0");
        assert!(index.is_compatible("0.1.0"));
        assert!(!index.is_compatible("0.2.0"));
    }

    #[test]
    fn payload_bytes_sums_entries() {
        let mut index = CacheIndex::new("0.1.0");
        index.entries.insert("a".to_string(), entry("a"));
        index.entries.insert("b".to_string(), entry("b"));
        assert_eq!(index.payload_bytes(), 240);
    }

    #[test]
    fn save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("deeply").join("nested");
        CacheIndex::new("0.1.0").save(&nested).unwrap();
        assert!(nested.join(INDEX_FILE).exists());
    }
}
