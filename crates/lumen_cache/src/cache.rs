//! High-level IR cache.
//!
//! [`IrCache`] ties the index and the artifact store together: it encodes
//! programs on the way in, decodes them on the way out, and treats every
//! decode failure as a miss.

use std::path::{Path, PathBuf};

use lumen_common::{ContentHash, ContentHasher};
use lumen_config::CacheConfig;
use lumen_ir::{equivalent, Program};
use lumen_serialize::{deserialize, serialize_with, SerializeOptions, TypeTable};

use crate::artifact::ArtifactStore;
use crate::error::CacheError;
use crate::index::{CacheIndex, IndexEntry};

/// Subdirectory name for cached IR artifacts.
const IR_SUBDIR: &str = "ir";

/// File extension for cached IR artifacts.
const IR_EXT: &str = "lir";

/// Totals reported by [`IrCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached programs.
    pub entries: usize,
    /// Stored payload bytes across all entries.
    pub payload_bytes: u64,
    /// Identity-table objects across all entries.
    pub objects: u64,
    /// Functions across all entries.
    pub functions: usize,
}

/// Cache of serialized programs.
///
/// All reads are fail-safe: corruption or version mismatches result in
/// cache misses rather than errors.
#[derive(Debug)]
pub struct IrCache {
    /// Root directory for all cache files.
    cache_dir: PathBuf,

    /// The index of live entries.
    index: CacheIndex,

    /// Content-addressed binary artifact store.
    store: ArtifactStore,

    /// Lumen version string for compatibility checks.
    lumen_version: String,

    compress: bool,
    verify_on_store: bool,
    options: SerializeOptions,
}

impl IrCache {
    /// Loads an existing cache or creates a fresh one.
    ///
    /// An index written by a different Lumen version, or one that cannot be
    /// read, is discarded and the cache starts empty.
    pub fn open(cache_dir: &Path, config: &CacheConfig, lumen_version: &str) -> Self {
        let index = CacheIndex::load(cache_dir)
            .filter(|index| index.is_compatible(lumen_version))
            .unwrap_or_else(|| CacheIndex::new(lumen_version));

        Self {
            cache_dir: cache_dir.to_path_buf(),
            index,
            store: ArtifactStore::new(cache_dir),
            lumen_version: lumen_version.to_string(),
            compress: config.compress,
            verify_on_store: config.verify_on_store,
            options: SerializeOptions::default(),
        }
    }

    /// Sets the encoder options used by [`store`](Self::store).
    pub fn with_serialize_options(mut self, options: SerializeOptions) -> Self {
        self.options = options;
        self
    }

    /// Derives the cache key for a program compiled from `source`.
    ///
    /// The key also covers the Lumen version and the encoder options, so
    /// changing either never returns a stale program.
    pub fn key_for(&self, source: &[u8]) -> ContentHash {
        ContentHasher::new()
            .update(self.lumen_version.as_bytes())
            .update(&[u8::from(self.options.strip)])
            .update(source)
            .finish()
    }

    /// Encodes `program` and stores it under `key`.
    ///
    /// With verify-on-store enabled the encoded bytes are decoded again
    /// first, and nothing is written unless the result re-encodes to the
    /// same bytes and, when names are kept, is structurally equivalent.
    pub fn store<T: TypeTable + Clone>(
        &mut self,
        key: &ContentHash,
        program: &Program,
        types: &T,
    ) -> Result<(), CacheError> {
        let key = key.to_string();
        let encoded = serialize_with(program, types, &self.options)?;
        if self.verify_on_store {
            self.verify(&key, program, types, &encoded.bytes)?;
        }

        let payload_size = self.store.write_artifact(
            IR_SUBDIR,
            IR_EXT,
            &key,
            &encoded.bytes,
            &self.lumen_version,
            self.compress,
        )?;
        log::debug!(
            "cached program {key}: {} bytes encoded, {payload_size} stored",
            encoded.bytes.len()
        );
        self.index.entries.insert(
            key,
            IndexEntry {
                program_name: if self.options.strip {
                    None
                } else {
                    program.name.clone()
                },
                payload_size: payload_size as u64,
                object_count: encoded.object_count,
                function_count: program.function_order.len(),
            },
        );
        Ok(())
    }

    fn verify<T: TypeTable + Clone>(
        &self,
        key: &str,
        program: &Program,
        types: &T,
        bytes: &[u8],
    ) -> Result<(), CacheError> {
        let rejected = |reason: String| CacheError::Verification {
            key: key.to_string(),
            reason,
        };
        // Decode into a scratch table so verification never grows the caller's.
        let mut scratch = types.clone();
        let decoded = deserialize(bytes, &mut scratch).map_err(|e| rejected(e.to_string()))?;
        if !self.options.strip {
            equivalent(program, &decoded).map_err(|d| rejected(d.to_string()))?;
        }
        let again = serialize_with(&decoded, &scratch, &self.options)?;
        if again.bytes != bytes {
            return Err(rejected("re-encoding changed the bytes".to_string()));
        }
        Ok(())
    }

    /// Loads the program stored under `key`.
    ///
    /// Returns `None` if the key is not indexed, the artifact is missing or
    /// corrupt, or the payload does not decode. Types are re-interned into
    /// `types`; a miss leaves it unchanged.
    pub fn load<T: TypeTable>(&self, key: &ContentHash, types: &mut T) -> Option<Program> {
        let key = key.to_string();
        if !self.index.entries.contains_key(&key) {
            return None;
        }
        let Some(bytes) = self.store.read_artifact(IR_SUBDIR, &key, IR_EXT) else {
            log::warn!("cached program {key} is missing or corrupt");
            return None;
        };
        match deserialize(&bytes, types) {
            Ok(program) => Some(program),
            Err(e) => {
                log::warn!("discarding cached program {key}: {e}");
                None
            }
        }
    }

    /// Removes `key` from the cache. Returns `false` if it was not cached.
    pub fn evict(&mut self, key: &ContentHash) -> Result<bool, CacheError> {
        let key = key.to_string();
        let indexed = self.index.entries.remove(&key).is_some();
        let removed = self.store.remove(IR_SUBDIR, &key, IR_EXT)?;
        Ok(indexed || removed)
    }

    /// Persists the index to disk.
    pub fn save(&self) -> Result<(), CacheError> {
        self.index.save(&self.cache_dir)
    }

    /// Returns the current index.
    pub fn index(&self) -> &CacheIndex {
        &self.index
    }

    /// Returns the path of the artifact stored under `key`.
    pub fn artifact_path(&self, key: &ContentHash) -> PathBuf {
        self.store.artifact_path(IR_SUBDIR, &key.to_string(), IR_EXT)
    }

    /// Removes artifact files the index does not list. Returns the number
    /// of files removed.
    pub fn gc(&self) -> Result<usize, CacheError> {
        let live_keys: Vec<&str> = self.index.entries.keys().map(String::as_str).collect();
        self.store.gc(IR_SUBDIR, IR_EXT, &live_keys)
    }

    /// Summarizes the index.
    pub fn stats(&self) -> CacheStats {
        let entries = self.index.entries.values();
        CacheStats {
            entries: self.index.entries.len(),
            payload_bytes: self.index.payload_bytes(),
            objects: entries.clone().map(|e| e.object_count).sum(),
            functions: entries.map(|e| e.function_count).sum(),
        }
    }
}
