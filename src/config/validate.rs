// src/config/validate.rs

use crate::config::model::{FeedsFile, RawFeedsFile};
use crate::errors::{EcovoyageError, Result};

impl TryFrom<RawFeedsFile> for FeedsFile {
    type Error = EcovoyageError;

    fn try_from(raw: RawFeedsFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_feeds(&raw)?;
        Ok(FeedsFile::new_unchecked(raw.download, raw.feeds))
    }
}

fn validate_raw_feeds(raw: &RawFeedsFile) -> Result<()> {
    ensure_has_feeds(raw)?;
    validate_download_section(raw)?;
    validate_feeds(raw)?;
    Ok(())
}

fn ensure_has_feeds(raw: &RawFeedsFile) -> Result<()> {
    if raw.feeds.is_empty() {
        return Err(EcovoyageError::ConfigError(
            "feed list must contain at least one [[feed]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_download_section(raw: &RawFeedsFile) -> Result<()> {
    if raw.download.workers == 0 {
        return Err(EcovoyageError::ConfigError(
            "[download].workers must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_feeds(raw: &RawFeedsFile) -> Result<()> {
    for (i, feed) in raw.feeds.iter().enumerate() {
        let url = feed.url.trim();
        if url.is_empty() {
            return Err(EcovoyageError::ConfigError(format!(
                "feed #{i} has an empty `url`"
            )));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(EcovoyageError::ConfigError(format!(
                "feed #{i} has unsupported url '{url}' (expected http:// or https://)"
            )));
        }
        if feed.local_path.file_name().is_none() {
            return Err(EcovoyageError::ConfigError(format!(
                "feed #{i} has `local_path` '{}' without a file name",
                feed.local_path.display()
            )));
        }
    }
    Ok(())
}
