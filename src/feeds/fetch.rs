// src/feeds/fetch.rs

//! Blocking HTTP helpers used as task work in the download graph.
//!
//! These run on the scheduler's blocking workers, so they use
//! `reqwest::blocking` and plain `std::fs`. Downloads are staged in a
//! temporary file and only replace the local feed once complete.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_LENGTH, LAST_MODIFIED};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

const HEAD_TIMEOUT: Duration = Duration::from_secs(10);
const GET_TIMEOUT: Duration = Duration::from_secs(30);
const CHUNK_SIZE: usize = 8192;

/// Ensure `dir` exists, creating it (and its parents) if needed.
pub fn validate_directory(dir: &Path) -> Result<bool> {
    if !dir.exists() {
        fs::create_dir_all(dir).with_context(|| format!("creating directory {:?}", dir))?;
        info!(dir = %dir.display(), "created directory");
    }
    Ok(true)
}

/// Parse an HTTP `Last-Modified` value (RFC 2822 / IMF-fixdate).
pub fn parse_last_modified(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Decide whether a feed has to be downloaded.
///
/// Missing remote timestamp or missing local copy always mean "download".
pub fn update_needed(remote: Option<DateTime<Utc>>, local: Option<SystemTime>) -> bool {
    match (remote, local) {
        (Some(remote), Some(local)) => remote > DateTime::<Utc>::from(local),
        _ => true,
    }
}

fn local_mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Check whether the remote feed is newer than the local copy.
///
/// Network errors are logged and reported as "no update needed".
pub fn check_feed_update(url: &str, local_path: &Path) -> bool {
    let name = display_name(local_path);

    let remote = match head_last_modified(url) {
        Ok(remote) => remote,
        Err(err) => {
            error!(url, error = %format!("{err:#}"), "error checking feed");
            return false;
        }
    };

    if remote.is_none() {
        warn!(feed = %name, "no Last-Modified header; will download");
        return true;
    }

    let local = local_mtime(local_path);
    if local.is_none() {
        info!(feed = %name, "new feed");
        return true;
    }

    let needed = update_needed(remote, local);
    if needed {
        info!(
            feed = %name,
            remote = ?remote.map(|t| t.date_naive()),
            local = ?local.map(|t| DateTime::<Utc>::from(t).date_naive()),
            "update available"
        );
    } else {
        info!(feed = %name, "feed is up-to-date");
    }
    needed
}

fn head_last_modified(url: &str) -> Result<Option<DateTime<Utc>>> {
    let client = Client::builder()
        .timeout(HEAD_TIMEOUT)
        .build()
        .context("building HTTP client")?;

    let response = client
        .head(url)
        .send()
        .with_context(|| format!("HEAD {url}"))?
        .error_for_status()
        .with_context(|| format!("HEAD {url}"))?;

    Ok(response
        .headers()
        .get(LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_last_modified))
}

/// Download `url` to `local_path` when `needs_update` is set.
///
/// Returns `true` if the download succeeded or was not needed. Failures are
/// logged and reported as `false`.
pub fn download_feed(url: &str, local_path: &Path, needs_update: bool) -> bool {
    if !needs_update {
        return true;
    }

    info!(feed = %display_name(local_path), "downloading");

    match download_inner(url, local_path) {
        Ok(bytes) => {
            info!(
                feed = %display_name(local_path),
                kib = bytes / 1024,
                "saved feed"
            );
            true
        }
        Err(err) => {
            error!(url, error = %format!("{err:#}"), "failed to download feed");
            false
        }
    }
}

fn download_inner(url: &str, local_path: &Path) -> Result<u64> {
    let client = Client::builder()
        .timeout(GET_TIMEOUT)
        .build()
        .context("building HTTP client")?;

    let mut response = client
        .get(url)
        .send()
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .with_context(|| format!("GET {url}"))?;

    // Read the server timestamp before the body is consumed.
    let remote_time = response
        .headers()
        .get(LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_last_modified);

    let total: u64 = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    // Stage the body next to the target so a failed download leaves the
    // existing feed untouched.
    let dir = match local_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temporary file in {:?}", dir))?;

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut downloaded: u64 = 0;
    let mut last_decile = 0;

    loop {
        let n = response
            .read(&mut buf)
            .with_context(|| format!("reading body of {url}"))?;
        if n == 0 {
            break;
        }
        staged
            .write_all(&buf[..n])
            .with_context(|| format!("writing to {:?}", staged.path()))?;
        downloaded += n as u64;

        if total > 0 {
            let decile = downloaded * 10 / total;
            if decile > last_decile {
                last_decile = decile;
                debug!(
                    feed = %display_name(local_path),
                    percent = decile * 10,
                    "download progress"
                );
            }
        }
    }

    if total > 0 && downloaded < total {
        bail!("body of {url} ended after {downloaded} of {total} bytes");
    }

    staged
        .flush()
        .with_context(|| format!("flushing {:?}", staged.path()))?;

    // Preserve the server timestamp if available.
    if let Some(remote) = remote_time {
        staged
            .as_file()
            .set_modified(SystemTime::from(remote))
            .with_context(|| format!("setting mtime of {:?}", staged.path()))?;
    }

    staged
        .persist(local_path)
        .with_context(|| format!("replacing {:?}", local_path))?;

    Ok(downloaded)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
