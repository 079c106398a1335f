//! Content-addressed caching of serialized IR programs.
//!
//! Programs are stored under a key derived from whatever produced them (the
//! shader source and the encoder settings). Every read is fail-safe: a
//! missing, corrupt or undecodable artifact is a cache miss, never an error.

#![warn(missing_docs)]

pub mod artifact;
pub mod cache;
pub mod error;
pub mod index;

pub use artifact::{decode_artifact, ArtifactHeader, ArtifactStore};
pub use cache::{CacheStats, IrCache};
pub use error::CacheError;
pub use index::{CacheIndex, IndexEntry};
