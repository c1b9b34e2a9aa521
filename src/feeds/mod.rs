// src/feeds/mod.rs

//! Transit feed downloads expressed as a dependency graph.
//!
//! - [`fetch`] holds the blocking HTTP / filesystem work units.
//! - [`dag`] wires them into a [`DependencyGraph`](crate::dag::DependencyGraph)
//!   and runs it.

pub mod dag;
pub mod fetch;

pub use dag::{DownloadReport, DownloadSummary, create_download_dag, run_download_dag};
pub use fetch::{check_feed_update, download_feed, update_needed, validate_directory};
