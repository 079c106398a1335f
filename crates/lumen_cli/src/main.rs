//! Lumen CLI: inspect and verify serialized shader IR, and maintain the IR
//! cache.
//!
//! `lumen inspect` decodes a raw buffer or cache artifact and prints the
//! program, `lumen verify` checks that a buffer survives a decode/encode
//! cycle unchanged, and `lumen cache` reports on and cleans the artifact
//! cache of the current project.

#![warn(missing_docs)]

mod cache;
mod inspect;
mod logger;
mod project;
mod verify;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

/// Version recorded in cache artifacts and the cache index.
pub const LUMEN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lumen shader IR tools.
#[derive(Parser, Debug)]
#[command(name = "lumen", version, about = "Lumen shader IR tools")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `lumen.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a serialized program and print it.
    Inspect(InspectArgs),
    /// Check that a serialized program re-encodes to the same bytes.
    Verify(VerifyArgs),
    /// Inspect or clean the IR cache.
    Cache {
        /// The cache operation to run.
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Arguments for the `lumen inspect` subcommand.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Raw IR buffer or cache artifact.
    pub file: PathBuf,

    /// Print only counts instead of the whole program.
    #[arg(short, long)]
    pub summary: bool,
}

/// Arguments for the `lumen verify` subcommand.
#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Raw IR buffer or cache artifact.
    pub file: PathBuf,
}

/// Cache operations.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Print entry and size totals.
    Stats,
    /// Delete artifacts the index no longer lists.
    Gc,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    logger::init(logger::level_for(cli.quiet, cli.verbose));

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Inspect(ref args) => inspect::run(args, &global),
        Command::Verify(ref args) => verify::run(args, &global),
        Command::Cache { action } => cache::run(action, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_inspect() {
        let cli = Cli::parse_from(["lumen", "inspect", "shader.lir"]);
        match cli.command {
            Command::Inspect(ref args) => {
                assert_eq!(args.file, PathBuf::from("shader.lir"));
                assert!(!args.summary);
            }
            _ => panic!("expected Inspect command"),
        }
    }

    #[test]
    fn parse_inspect_summary() {
        let cli = Cli::parse_from(["lumen", "inspect", "-s", "shader.lir"]);
        match cli.command {
            Command::Inspect(ref args) => assert!(args.summary),
            _ => panic!("expected Inspect command"),
        }
    }

    #[test]
    fn parse_verify() {
        let cli = Cli::parse_from(["lumen", "verify", "out/blur.bin"]);
        match cli.command {
            Command::Verify(ref args) => assert_eq!(args.file, PathBuf::from("out/blur.bin")),
            _ => panic!("expected Verify command"),
        }
    }

    #[test]
    fn parse_cache_actions() {
        let cli = Cli::parse_from(["lumen", "cache", "stats"]);
        assert!(matches!(
            cli.command,
            Command::Cache {
                action: CacheAction::Stats
            }
        ));
        let cli = Cli::parse_from(["lumen", "cache", "gc"]);
        assert!(matches!(
            cli.command,
            Command::Cache {
                action: CacheAction::Gc
            }
        ));
    }

    #[test]
    fn cache_requires_an_action() {
        assert!(Cli::try_parse_from(["lumen", "cache"]).is_err());
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["lumen", "--quiet", "cache", "stats"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["lumen", "verify", "a.bin", "--verbose"]);
        assert!(cli.verbose);
    }

    #[test]
    fn parse_config_path() {
        let cli = Cli::parse_from(["lumen", "--config", "/path/to/lumen.toml", "cache", "gc"]);
        assert_eq!(cli.config.as_deref(), Some("/path/to/lumen.toml"));
    }

    #[test]
    fn missing_file_is_a_usage_error() {
        assert!(Cli::try_parse_from(["lumen", "inspect"]).is_err());
    }
}
