// src/logging.rs

//! `tracing` subscriber setup.
//!
//! The level comes from `--log-level`, then `ECOVOYAGE_LOG`, then `info`.
//! Output goes to stderr; stdout is reserved for the usage banner, the
//! dry-run listing and the results line.

use anyhow::{Result, anyhow};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "ECOVOYAGE_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV_VAR).ok();
    let level = resolve_level(cli_level, env_value.as_deref());

    // Quiet the HTTP stack unless explicitly tracing.
    let mut filter = EnvFilter::new(level.as_str().to_lowercase());
    if level < Level::TRACE {
        for noisy in ["reqwest=warn", "hyper=warn", "hyper_util=warn"] {
            filter = filter.add_directive(
                noisy
                    .parse()
                    .map_err(|e| anyhow!("bad log directive {noisy:?}: {e}"))?,
            );
        }
    }

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(level >= Level::DEBUG)
        .try_init()
        .map_err(|e| anyhow!("installing tracing subscriber: {e}"))
}

/// Effective level: CLI flag first, then the environment value, then `info`.
///
/// Unrecognised environment values fall back to `info`.
pub fn resolve_level(cli_level: Option<LogLevel>, env_value: Option<&str>) -> Level {
    if let Some(level) = cli_level {
        return level.into();
    }

    env_value
        .map(|raw| raw.trim().to_ascii_lowercase())
        .and_then(|raw| match raw.as_str() {
            "error" => Some(Level::ERROR),
            "warn" | "warning" => Some(Level::WARN),
            "info" => Some(Level::INFO),
            "debug" => Some(Level::DEBUG),
            "trace" => Some(Level::TRACE),
            _ => None,
        })
        .unwrap_or(Level::INFO)
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}
