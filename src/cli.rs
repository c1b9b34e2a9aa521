// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `ecovoyage`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ecovoyage",
    version,
    about = "EcoVoyage - Planning eco-friendly travel",
    long_about = None
)]
pub struct CliArgs {
    /// Download and update GTFS and OSM feeds.
    #[arg(long)]
    pub download: bool,

    /// Number of concurrent downloads.
    ///
    /// If omitted, `[download].workers` from the feed list is used (3 for the
    /// built-in list).
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Feed list (TOML). Defaults to the built-in Austrian feeds.
    #[arg(long, value_name = "PATH")]
    pub feeds: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ECOVOYAGE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Build and validate the download graph, print it, but don't download.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
