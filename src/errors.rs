// src/errors.rs

//! Crate-wide error types.
//!
//! - [`DagError`] is the taxonomy of the graph core (nodes, graph, scheduler).
//!   It is `Clone` so a failed node can keep its error and hand out copies.
//! - [`EcovoyageError`] is the application-level error used by config
//!   loading and the CLI.

use std::sync::Arc;

use thiserror::Error;

/// Shared, cloneable error raised by caller-supplied work.
pub type WorkSource = Arc<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug, Clone)]
pub enum DagError {
    #[error("Invalid task name: {0:?}")]
    InvalidName(String),

    #[error("Task with name '{0}' already exists in DAG")]
    DuplicateTaskName(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected including task '{0}'")]
    CycleDetected(String),

    #[error("Dependency '{dependency}' failed for task '{task}'")]
    DependencyFailed { task: String, dependency: String },

    #[error("Task '{task}' failed: {source}")]
    WorkError {
        task: String,
        #[source]
        source: WorkSource,
    },
}

impl DagError {
    /// Wrap an error raised by a task's work.
    pub fn work(task: impl Into<String>, err: anyhow::Error) -> Self {
        let boxed: Box<dyn std::error::Error + Send + Sync + 'static> = err.into();
        DagError::WorkError {
            task: task.into(),
            source: Arc::from(boxed),
        }
    }
}

#[derive(Error, Debug)]
pub enum EcovoyageError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Dag(#[from] DagError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type DagResult<T> = std::result::Result<T, DagError>;
pub type Result<T> = std::result::Result<T, EcovoyageError>;
