// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod feeds;
pub mod logging;

use anyhow::Result;
use tracing::debug;

use crate::cli::CliArgs;
use crate::config::{FeedsFile, load_or_builtin};
use crate::feeds::{create_download_dag, run_download_dag};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - feed list loading (file or built-in)
/// - download graph construction
/// - the scheduler pass
pub async fn run(args: CliArgs) -> Result<()> {
    if !args.download && !args.dry_run {
        print_usage();
        return Ok(());
    }

    let feeds = load_or_builtin(args.feeds.as_deref())?;
    let workers = args.workers.unwrap_or(feeds.download().workers);

    if args.dry_run {
        print_dry_run(&feeds, workers)?;
        return Ok(());
    }

    let report = run_download_dag(feeds.feeds(), workers).await?;
    println!(
        "Results: {} updated, {} current, {} errors",
        report.summary.updated, report.summary.current, report.summary.errors
    );

    Ok(())
}

fn print_usage() {
    println!("EcoVoyage - Planning eco-friendly travel");
    println!("Use --download to update GTFS and OSM feeds");
    println!("Use --workers to set number of concurrent downloads");
}

/// Dry-run output: the download graph in execution order.
fn print_dry_run(feeds: &FeedsFile, workers: usize) -> Result<()> {
    let dag = create_download_dag(feeds.feeds())?;
    let order = dag.topological_order()?;

    println!("ecovoyage dry-run");
    println!("  workers = {workers}");
    println!("  feeds = {}", feeds.feeds().len());
    println!();

    println!("tasks ({}):", dag.len());
    for name in &order {
        let task = dag.get_task(name)?;
        println!("  - {name}");
        if !task.dependencies().is_empty() {
            println!("      after: {:?}", task.dependencies());
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
