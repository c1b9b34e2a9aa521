// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{FeedsFile, RawFeedsFile};
use crate::errors::Result;

/// Load a feed list from a given path and return the raw `RawFeedsFile`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for the
/// semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawFeedsFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let raw: RawFeedsFile = toml::from_str(&contents)?;

    Ok(raw)
}

/// Load a feed list from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<FeedsFile> {
    let raw = load_from_path(&path)?;
    let feeds = FeedsFile::try_from(raw)?;
    debug!(
        path = %path.as_ref().display(),
        feeds = feeds.feeds().len(),
        "feed list loaded"
    );
    Ok(feeds)
}

/// Load the feed list at `path`, or fall back to [`FeedsFile::builtin`].
pub fn load_or_builtin(path: Option<&Path>) -> Result<FeedsFile> {
    match path {
        Some(path) => load_and_validate(path),
        None => {
            debug!("no feed list given; using built-in feeds");
            Ok(FeedsFile::builtin())
        }
    }
}
