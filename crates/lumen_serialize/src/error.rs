//! Error types for encoding and decoding.

use lumen_common::InternalError;

/// Errors produced while encoding a program.
///
/// Every variant describes a problem with the caller's graph or with the
/// process, never with data: the encoder reads no external input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerializeError {
    /// The graph violates an IR invariant, or the traversal is out of sync
    /// with itself.
    #[error(transparent)]
    Internal(#[from] InternalError),

    /// The output buffer could not grow.
    #[error("out of memory while growing the output buffer to {requested} bytes")]
    OutOfMemory {
        /// Buffer size that could not be reserved.
        requested: usize,
    },
}

/// Errors produced while decoding a buffer.
///
/// Decoding never panics on bad input; every defect in the bytes ends up
/// as one of these variants and no partial program is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The buffer ended before the program did.
    #[error("buffer truncated at offset {offset}")]
    Truncated {
        /// Offset of the first read that ran past the end.
        offset: usize,
    },

    /// The bytes do not describe a valid program.
    #[error("malformed IR buffer: {0}")]
    Malformed(String),

    /// The header's object count disagrees with the objects actually read.
    #[error("object count mismatch: header says {expected}, decoded {found}")]
    ObjectCountMismatch {
        /// Count stored in the header.
        expected: u64,
        /// Number of objects registered while decoding.
        found: u64,
    },
}

impl DecodeError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        DecodeError::Malformed(reason.into())
    }
}

/// Errors produced by [`round_trip`](crate::round_trip).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoundTripError {
    /// Encoding failed.
    #[error("encode failed: {0}")]
    Serialize(#[from] SerializeError),

    /// Decoding the freshly encoded buffer failed.
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_error_is_transparent() {
        let err: SerializeError = InternalError::new("%4 is not registered").into();
        assert_eq!(
            err.to_string(),
            "internal compiler error: %4 is not registered"
        );
    }

    #[test]
    fn truncated_display() {
        let err = DecodeError::Truncated { offset: 17 };
        assert_eq!(err.to_string(), "buffer truncated at offset 17");
    }

    #[test]
    fn round_trip_wraps_both_sides() {
        let err: RoundTripError = DecodeError::malformed("unknown cf tag 9").into();
        assert!(matches!(err, RoundTripError::Decode(DecodeError::Malformed(_))));
        assert!(err.to_string().contains("unknown cf tag 9"));
    }
}
