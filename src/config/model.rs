// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Feed list as read from a TOML file, before validation.
///
/// ```toml
/// [download]
/// workers = 3
///
/// [[feed]]
/// url = "https://api.transitous.org/gtfs/at_Linz-AG-2025.gtfs.zip"
/// local_path = "data/austria/gtfs/at_linz.gtfs.zip"
/// ```
///
/// All sections are optional at this stage; [`FeedsFile::try_from`] rejects
/// files without any feed.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFeedsFile {
    #[serde(default)]
    pub download: DownloadSection,

    /// All `[[feed]]` entries, in file order.
    #[serde(default, rename = "feed")]
    pub feeds: Vec<FeedConfig>,
}

/// `[download]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadSection {
    /// Number of concurrent workers used for the download graph.
    ///
    /// `--workers` on the command line takes precedence.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_workers() -> usize {
    3
}

impl Default for DownloadSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

/// One `[[feed]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedConfig {
    /// Remote location of the feed (`http` or `https`).
    pub url: String,

    /// Where the feed is stored locally. Its parent directory is created on
    /// demand.
    pub local_path: PathBuf,
}

impl FeedConfig {
    pub fn new(url: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            local_path: local_path.into(),
        }
    }

    /// Directory the feed lives in (`"."` for a bare file name).
    pub fn directory(&self) -> &Path {
        match self.local_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

/// Validated feed list.
///
/// Only constructed through `TryFrom<RawFeedsFile>` (see `validate.rs`) or
/// [`FeedsFile::builtin`].
#[derive(Debug, Clone)]
pub struct FeedsFile {
    download: DownloadSection,
    feeds: Vec<FeedConfig>,
}

impl FeedsFile {
    pub(crate) fn new_unchecked(download: DownloadSection, feeds: Vec<FeedConfig>) -> Self {
        Self { download, feeds }
    }

    pub fn download(&self) -> &DownloadSection {
        &self.download
    }

    pub fn feeds(&self) -> &[FeedConfig] {
        &self.feeds
    }

    /// Austrian GTFS feeds plus the Austria OSM extract.
    pub fn builtin() -> Self {
        const GTFS: &[(&str, &str)] = &[
            ("at_Linz-AG-2025", "at_linz"),
            ("at_PTA-Carinthia-2025", "at_carinthia"),
            ("at_PTA-Eastern-Region-2025", "at_vor"),
            ("at_PTA-Salzburg-2025", "at_salzburg"),
            ("at_PTA-Styria-2025", "at_styria"),
            ("at_PTA-Tyrol-2025", "at_tyrol"),
            ("at_PTA-Upper-Austria-2025", "at_upperaustria"),
            ("at_PTA-Vorarlberg-2025", "at_vorarlberg"),
            ("at_Railway-Current-Reference-Data-2025", "at_railway"),
        ];

        let mut feeds: Vec<FeedConfig> = GTFS
            .iter()
            .map(|(remote, local)| {
                FeedConfig::new(
                    format!("https://api.transitous.org/gtfs/{remote}.gtfs.zip"),
                    format!("/workspace/data/austria/gtfs/{local}.gtfs.zip"),
                )
            })
            .collect();

        feeds.push(FeedConfig::new(
            "https://download.geofabrik.de/europe/austria-latest.osm.pbf",
            "/workspace/data/austria/osm/austria.osm.pbf",
        ));

        Self::new_unchecked(DownloadSection::default(), feeds)
    }
}
