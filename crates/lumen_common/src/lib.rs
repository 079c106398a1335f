//! Shared foundational types used across the Lumen shader IR workspace.
//!
//! This crate provides content hashing for cache keys and the internal error
//! type used to report compiler bugs (as opposed to malformed input).

#![warn(missing_docs)]

pub mod hash;
pub mod result;

pub use hash::{ContentHash, ContentHasher, ParseHashError};
pub use result::{InternalError, LumenResult};
