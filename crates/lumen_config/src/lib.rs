//! Parsing and validation of `lumen.toml` configuration files.
//!
//! This crate reads the workspace configuration file and produces a
//! strongly-typed [`LumenConfig`] controlling where IR artifacts are cached
//! and how they are encoded.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
