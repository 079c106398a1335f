//! Content-addressed binary artifact storage.
//!
//! Serialized programs are stored as binary files in subdirectories of the
//! cache. Each artifact has a header containing magic bytes, format version,
//! a checksum for integrity validation, and whether the payload is
//! zlib-compressed.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lumen_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Magic bytes identifying a Lumen cache artifact.
const ARTIFACT_MAGIC: [u8; 4] = *b"LUMN";

/// Current artifact format version. Increment on breaking changes to
/// the header layout.
const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Header prepended to every cached artifact for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactHeader {
    /// Magic bytes: must be `b"LUMN"`.
    pub magic: [u8; 4],

    /// Artifact format version.
    pub format_version: u32,

    /// Lumen version that produced this artifact.
    pub lumen_version: String,

    /// Content hash of the stored payload bytes (after compression).
    pub checksum: ContentHash,

    /// The payload is zlib-compressed.
    pub compressed: bool,
}

/// Validates an artifact file's contents and returns the decompressed
/// payload.
///
/// Returns `None` if the header is invalid, the format version doesn't
/// match, the checksum doesn't verify, or the payload doesn't decompress.
pub fn decode_artifact(raw: &[u8]) -> Option<Vec<u8>> {
    // Need at least 4 bytes for the header length
    let len_bytes: [u8; 4] = raw.get(..4)?.try_into().ok()?;
    let header_len = u32::from_le_bytes(len_bytes) as usize;
    let header_bytes = raw.get(4..4usize.checked_add(header_len)?)?;

    let header: ArtifactHeader =
        bincode::serde::decode_from_slice(header_bytes, bincode::config::standard())
            .ok()?
            .0;

    if header.magic != ARTIFACT_MAGIC || header.format_version != ARTIFACT_FORMAT_VERSION {
        return None;
    }

    let payload = &raw[4 + header_len..];
    if ContentHash::from_bytes(payload) != header.checksum {
        return None;
    }

    if !header.compressed {
        return Some(payload.to_vec());
    }
    let mut out = Vec::new();
    ZlibDecoder::new(payload).read_to_end(&mut out).ok()?;
    Some(out)
}

fn compress_zlib(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Content-addressed store for binary artifacts.
///
/// Each artifact is stored at `<cache_dir>/<subdir>/<key>.<ext>` with a
/// validated binary header.
#[derive(Debug)]
pub struct ArtifactStore {
    /// Root cache directory.
    cache_dir: PathBuf,
}

impl ArtifactStore {
    /// Creates a new artifact store rooted at the given cache directory.
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    /// Ensures that the subdirectory for the given artifact type exists.
    pub fn ensure_dirs(&self, subdir: &str) -> Result<(), CacheError> {
        let dir = self.cache_dir.join(subdir);
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::Io {
            path: dir,
            source: e,
        })
    }

    /// Returns the file path for an artifact with the given key.
    pub fn artifact_path(&self, subdir: &str, key: &str, ext: &str) -> PathBuf {
        self.cache_dir.join(subdir).join(format!("{key}.{ext}"))
    }

    /// Writes an artifact under `key` and returns the number of payload
    /// bytes stored.
    pub fn write_artifact(
        &self,
        subdir: &str,
        ext: &str,
        key: &str,
        data: &[u8],
        lumen_version: &str,
        compress: bool,
    ) -> Result<usize, CacheError> {
        self.ensure_dirs(subdir)?;
        let path = self.artifact_path(subdir, key, ext);

        let payload = if compress {
            compress_zlib(data).map_err(|e| CacheError::Io {
                path: path.clone(),
                source: e,
            })?
        } else {
            data.to_vec()
        };

        let header = ArtifactHeader {
            magic: ARTIFACT_MAGIC,
            format_version: ARTIFACT_FORMAT_VERSION,
            lumen_version: lumen_version.to_string(),
            checksum: ContentHash::from_bytes(&payload),
            compressed: compress,
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        // 4-byte header length (little-endian) + header + payload
        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(&payload);

        std::fs::write(&path, &output).map_err(|e| CacheError::Io { path, source: e })?;
        Ok(payload.len())
    }

    /// Reads an artifact from the store, validating its header.
    ///
    /// This is fail-safe: a missing or corrupt file is a cache miss.
    pub fn read_artifact(&self, subdir: &str, key: &str, ext: &str) -> Option<Vec<u8>> {
        let raw = std::fs::read(self.artifact_path(subdir, key, ext)).ok()?;
        decode_artifact(&raw)
    }

    /// Deletes one artifact. Returns `false` if it did not exist.
    pub fn remove(&self, subdir: &str, key: &str, ext: &str) -> Result<bool, CacheError> {
        let path = self.artifact_path(subdir, key, ext);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::Io { path, source: e }),
        }
    }

    /// Removes artifacts that are not in the set of live keys.
    ///
    /// Returns the number of files removed.
    pub fn gc(&self, subdir: &str, ext: &str, live_keys: &[&str]) -> Result<usize, CacheError> {
        let dir = self.cache_dir.join(subdir);
        if !dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        let entries = std::fs::read_dir(&dir).map_err(|e| CacheError::Io {
            path: dir.clone(),
            source: e,
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| CacheError::Io {
                path: dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ext) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !live_keys.contains(&stem) {
                    std::fs::remove_file(&path).map_err(|e| CacheError::Io {
                        path: path.clone(),
                        source: e,
                    })?;
                    removed += 1;
                }
            }
        }

        Ok(removed)
    }
}
