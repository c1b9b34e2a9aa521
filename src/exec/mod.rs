// src/exec/mod.rs

//! Execution layer.
//!
//! - [`worker_pool`] owns the fixed set of Tokio workers that run task work
//!   on the blocking pool and report completions back over a channel.

pub mod worker_pool;

pub use worker_pool::{Completion, Job, WorkerPool};
