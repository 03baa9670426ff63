//! Defines the standard command-line arguments shared across the trader binaries.
//!
//! Binaries flatten `CommonArgs` into their own `clap` parser so every tool
//! locates its configuration and data directory the same way.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Holds the standard configuration parameters parsed from the command line.
#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommonArgs {
    /// Path to a TOML configuration file (optional; defaults and environment apply otherwise)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override for the data directory (ledger, snapshots, reports)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

impl CommonArgs {
    /// Parses command-line arguments into a `CommonArgs` struct.
    ///
    /// This function automatically handles `--help` and `--version` flags via `clap`.
    pub fn parse_args(args: Vec<String>) -> Self {
        CommonArgs::parse_from(args)
    }

    /// Returns the configuration file path, if one was given.
    pub fn get_config_file(&self) -> Option<PathBuf> {
        self.config.clone()
    }

    /// Returns the data directory override, if one was given.
    ///
    /// When present it wins over the `data_dir` from the configuration layers.
    pub fn get_data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone()
    }
}
