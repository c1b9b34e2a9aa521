// src/feeds/dag.rs

//! Download graph construction.
//!
//! For every feed `i` the graph contains:
//! - `validate_dir_<dir>`: creates the target directory (shared by all feeds
//!   in the same directory)
//! - `check_<i>`: freshness check, after the directory task
//! - `download_<i>`: download, with `needs_update` bound to the result of
//!   `check_<i>`

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use serde_json::Value;
use tracing::info;

use crate::config::FeedConfig;
use crate::dag::{DependencyGraph, Params, PassResults, Scheduler, TaskNode};
use crate::errors::{DagResult, Result};
use crate::feeds::fetch::{check_feed_update, download_feed, validate_directory};

pub const GRAPH_NAME: &str = "feed_download";

pub fn dir_task_name(dir: &Path) -> String {
    format!("validate_dir_{}", dir.display())
}

pub fn check_task_name(index: usize) -> String {
    format!("check_{index}")
}

pub fn download_task_name(index: usize) -> String {
    format!("download_{index}")
}

/// Build the download graph for `feeds`.
pub fn create_download_dag(feeds: &[FeedConfig]) -> DagResult<DependencyGraph> {
    let mut dag = DependencyGraph::new(GRAPH_NAME);
    let mut dir_tasks: HashMap<PathBuf, String> = HashMap::new();

    for (i, feed) in feeds.iter().enumerate() {
        let dir = feed.directory().to_path_buf();
        let local_path = feed.local_path.display().to_string();

        // Reuse the directory task if another feed already created it.
        let dir_task = match dir_tasks.get(&dir) {
            Some(name) => name.clone(),
            None => {
                let name = dir_task_name(&dir);
                dag.add_task(
                    TaskNode::from_fn(name.clone(), validate_directory_work)?
                        .with_param("dir_path", dir.display().to_string()),
                )?;
                dir_tasks.insert(dir, name.clone());
                name
            }
        };

        dag.add_task(
            TaskNode::from_fn(check_task_name(i), check_work)?
                .with_param("url", feed.url.clone())
                .with_param("local_path", local_path.clone())
                .depends_on(dir_task),
        )?;

        dag.add_task(
            TaskNode::from_fn(download_task_name(i), download_work)?
                .with_param("url", feed.url.clone())
                .with_param("local_path", local_path)
                .with_upstream("needs_update", check_task_name(i)),
        )?;
    }

    Ok(dag)
}

/// Counts reported after a download pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    /// Check reported an update and the download succeeded.
    pub updated: usize,
    /// Check reported no update; nothing was downloaded.
    pub current: usize,
    /// Download task failed, was skipped, or reported failure.
    pub errors: usize,
}

impl DownloadSummary {
    pub fn from_results(feed_count: usize, results: &PassResults) -> Self {
        let as_bool = |name: String| {
            results
                .get(&name)
                .and_then(Option::as_ref)
                .and_then(Value::as_bool)
        };

        let mut summary = Self::default();
        for i in 0..feed_count {
            let checked = as_bool(check_task_name(i));
            let downloaded = as_bool(download_task_name(i));

            match (checked, downloaded) {
                (Some(true), Some(true)) => summary.updated += 1,
                (_, Some(true)) => summary.current += 1,
                _ => summary.errors += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone)]
pub struct DownloadReport {
    pub summary: DownloadSummary,
    pub results: PassResults,
}

/// Build and run the download graph in a single pass.
pub async fn run_download_dag(feeds: &[FeedConfig], max_workers: usize) -> Result<DownloadReport> {
    let mut dag = create_download_dag(feeds)?;

    info!(
        feeds = feeds.len(),
        workers = max_workers,
        "running download DAG"
    );

    let scheduler = Scheduler::new(max_workers);
    let results = scheduler.run(&mut dag).await?;
    let summary = DownloadSummary::from_results(feeds.len(), &results);

    info!(
        updated = summary.updated,
        current = summary.current,
        errors = summary.errors,
        "download results"
    );

    Ok(DownloadReport { summary, results })
}

fn str_param<'a>(params: &'a Params, key: &str) -> anyhow::Result<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("missing string parameter '{key}'"))
}

fn validate_directory_work(params: &Params) -> anyhow::Result<Value> {
    let dir = str_param(params, "dir_path")?;
    Ok(Value::Bool(validate_directory(Path::new(dir))?))
}

fn check_work(params: &Params) -> anyhow::Result<Value> {
    let url = str_param(params, "url")?;
    let local_path = str_param(params, "local_path")?;
    Ok(Value::Bool(check_feed_update(url, Path::new(local_path))))
}

fn download_work(params: &Params) -> anyhow::Result<Value> {
    let url = str_param(params, "url")?;
    let local_path = str_param(params, "local_path")?;
    let needs_update = params
        .get("needs_update")
        .and_then(Value::as_bool)
        .ok_or_else(|| anyhow!("missing boolean parameter 'needs_update'"))?;
    Ok(Value::Bool(download_feed(url, Path::new(local_path), needs_update)))
}
