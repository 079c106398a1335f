//! Error types for cache operations.

use lumen_serialize::SerializeError;
use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// Reads never produce these: a bad artifact is a cache miss. They come from
/// writing artifacts and the index, and from encoding the program to store.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An artifact header or the index could not be encoded.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// The program could not be encoded.
    #[error("failed to encode program: {0}")]
    Encode(#[from] SerializeError),

    /// A freshly encoded program did not survive a decode.
    #[error("cached program {key} failed verification: {reason}")]
    Verification {
        /// Cache key of the rejected entry.
        key: String,
        /// What went wrong.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_common::InternalError;

    #[test]
    fn io_error_display() {
        let err = CacheError::Io {
            path: PathBuf::from("/tmp/cache/index.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("cache I/O error"));
        assert!(msg.contains("index.json"));
    }

    #[test]
    fn serialization_error_display() {
        let err = CacheError::Serialization {
            reason: "invalid bincode data".to_string(),
        };
        assert!(err.to_string().contains("invalid bincode data"));
    }

    #[test]
    fn encode_error_display() {
        let err = CacheError::from(SerializeError::Internal(InternalError::new("fn0 is dangling")));
        let msg = err.to_string();
        assert!(msg.starts_with("failed to encode program"));
        assert!(msg.contains("fn0 is dangling"));
    }

    #[test]
    fn verification_error_display() {
        let err = CacheError::Verification {
            key: "abcd".to_string(),
            reason: "fn0: names differ".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cached program abcd failed verification: fn0: names differ"
        );
    }
}
