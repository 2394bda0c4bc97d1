//! Command-line interface definition.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Resolve typed package dependencies from OCI registries.
#[derive(Debug, Parser)]
#[command(name = "depot", version, about)]
pub struct Cli {
    /// Override the package cache directory.
    #[arg(long, env = "DEPOT_CACHE_DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Bound each registry call by a deadline, in seconds.
    #[arg(long, env = "DEPOT_CALL_TIMEOUT", global = true)]
    pub call_timeout: Option<u64>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve one dependency and its transitive closure.
    Resolve {
        /// Dependency spec as `package[@constraint]`,
        /// e.g. `registry.example.com/acme/db@^1.0`.
        spec: String,
    },
    /// Resolve several roots and print the merged validator view.
    Snapshot {
        /// Dependency specs as `package[@constraint]`.
        #[arg(required = true)]
        specs: Vec<String>,
    },
}
