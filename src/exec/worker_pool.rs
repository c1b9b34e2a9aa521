// src/exec/worker_pool.rs

//! Fixed-size worker pool used by the scheduler.
//!
//! The coordinator pushes [`Job`]s into a bounded channel shared by all
//! workers and receives a [`Completion`] per job on a second channel. Each
//! worker runs one job at a time on Tokio's blocking pool, so the number of
//! workers is the upper bound on concurrently executing work.

use std::sync::Arc;

use anyhow::anyhow;
use serde_json::Value;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::dag::node::{Invocation, TaskName};

/// A node submitted for execution.
#[derive(Debug)]
pub struct Job {
    /// Position of the node inside its graph.
    pub position: usize,
    pub invocation: Invocation,
}

/// Outcome of one job, sent back to the coordinator.
#[derive(Debug)]
pub struct Completion {
    pub position: usize,
    pub task: TaskName,
    pub outcome: anyhow::Result<Value>,
}

pub struct WorkerPool {
    jobs: mpsc::Sender<Job>,
    completions: mpsc::Receiver<Completion>,
    handles: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.handles.len())
            .finish_non_exhaustive()
    }
}

impl WorkerPool {
    /// Spawn `workers` worker tasks (at least one) on the current runtime.
    pub fn spawn(workers: usize) -> Self {
        let workers = workers.max(1);
        let (job_tx, job_rx) = mpsc::channel::<Job>(workers);
        let (done_tx, done_rx) = mpsc::channel::<Completion>(workers);
        let job_rx = Arc::new(Mutex::new(job_rx));

        let handles = (0..workers)
            .map(|id| tokio::spawn(worker_loop(id, Arc::clone(&job_rx), done_tx.clone())))
            .collect();

        debug!(workers, "worker pool started");

        Self {
            jobs: job_tx,
            completions: done_rx,
            handles,
        }
    }

    /// Hand a job to the next free worker.
    ///
    /// On failure (every worker has exited) the job is returned.
    pub async fn submit(&self, job: Job) -> Result<(), Job> {
        self.jobs.send(job).await.map_err(|err| err.0)
    }

    /// Wait for the next finished job. `None` once every worker has exited.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.completions.recv().await
    }

    /// Close the job channel and wait for the workers to drain out.
    pub async fn shutdown(self) {
        let Self {
            jobs,
            completions,
            handles,
        } = self;
        drop(jobs);
        drop(completions);

        for handle in handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "worker task ended abnormally");
            }
        }

        debug!("worker pool stopped");
    }
}

async fn worker_loop(
    id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<Job>>>,
    completions: mpsc::Sender<Completion>,
) {
    loop {
        // Release the lock before running the job so idle workers can pick up
        // the next one.
        let job = {
            let mut rx = jobs.lock().await;
            rx.recv().await
        };

        let Some(Job { position, invocation }) = job else {
            break;
        };

        let task = invocation.task.clone();
        debug!(worker = id, task = %task, "worker running task");

        let outcome = match tokio::task::spawn_blocking(move || invocation.invoke()).await {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => Err(anyhow!("task '{task}' panicked")),
            Err(err) => Err(anyhow!("task '{task}' was aborted: {err}")),
        };

        let completion = Completion {
            position,
            task,
            outcome,
        };

        if completions.send(completion).await.is_err() {
            debug!(worker = id, "completion channel closed; worker exiting");
            break;
        }
    }
}
