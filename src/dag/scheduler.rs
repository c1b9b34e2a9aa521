// src/dag/scheduler.rs

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::anyhow;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::dag::graph::DependencyGraph;
use crate::dag::node::TaskName;
use crate::dag::pass_state::PassState;
use crate::errors::{DagError, DagResult};
use crate::exec::{Completion, Job, WorkerPool};

/// Name → result of one pass. Failed and skipped tasks map to `None`.
pub type PassResults = BTreeMap<TaskName, Option<Value>>;

/// Executes every node of a [`DependencyGraph`] with bounded parallelism.
///
/// It is responsible for:
/// - validating the graph before anything runs
/// - resetting node state at the start of every pass
/// - submitting a node only after all its dependencies are done
/// - skipping (failing without running) nodes whose dependency failed
/// - keeping at most `max_workers` nodes in flight
#[derive(Debug)]
pub struct Scheduler {
    max_workers: usize,
    /// Monotonically increasing pass counter, for logs.
    passes: AtomicU64,
}

impl Default for Scheduler {
    /// One worker per available CPU.
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self::new(workers)
    }
}

impl Scheduler {
    pub fn new(max_workers: usize) -> Self {
        if max_workers == 0 {
            warn!("max_workers = 0 is not usable; running with a single worker");
        }

        Self {
            max_workers: max_workers.max(1),
            passes: AtomicU64::new(0),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Number of passes started so far.
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    /// Run one pass over `graph`.
    ///
    /// Fails only if validation fails ([`DagError::CycleDetected`] or
    /// [`DagError::TaskNotFound`]), in which case no work runs. Task failures
    /// are recorded on the nodes and show up as `None` in the returned map.
    pub async fn run(&self, graph: &mut DependencyGraph) -> DagResult<PassResults> {
        graph.validate()?;
        let deps = graph.dependency_indices()?;
        graph.reset();

        let pass = self.passes.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            dag = %graph.name(),
            pass,
            tasks = graph.len(),
            max_workers = self.max_workers,
            "starting DAG pass"
        );

        let mut state = PassState::new(deps, self.max_workers);
        let mut results = PassResults::new();
        let mut pool = WorkerPool::spawn(self.max_workers.min(graph.len()));

        loop {
            for position in state.settle(graph) {
                results.insert(graph.node(position).name().to_string(), None);
            }

            while let Some(position) = state.next_submission() {
                self.submit(graph, &pool, &mut state, &mut results, position)
                    .await;
            }

            if state.is_finished() {
                break;
            }

            if state.in_flight_len() == 0 {
                if state.is_stalled() {
                    // Not reachable for a validated graph; bail out instead
                    // of waiting forever.
                    let stuck: Vec<_> = state
                        .pending()
                        .map(|p| graph.node(p).name().to_string())
                        .collect();
                    error!(?stuck, pass, "no task can make progress; ending pass");
                    break;
                }
                // A submission failed immediately; settle again.
                continue;
            }

            match pool.next_completion().await {
                Some(Completion {
                    position,
                    task,
                    outcome,
                }) => {
                    state.complete(position);
                    let value = graph.node_mut(position).complete(outcome).ok();
                    debug!(task = %task, pass, success = value.is_some(), "task finished");
                    results.insert(task, value);
                }
                None => {
                    error!(pass, "worker pool exited with tasks still in flight");
                    for position in state.drain_in_flight() {
                        let node = graph.node_mut(position);
                        let err = DagError::work(node.name(), anyhow!("worker pool exited"));
                        node.fail(err);
                        results.insert(node.name().to_string(), None);
                    }
                }
            }
        }

        pool.shutdown().await;

        let succeeded = results.values().filter(|v| v.is_some()).count();
        info!(
            dag = %graph.name(),
            pass,
            succeeded,
            failed = results.len() - succeeded,
            peak_in_flight = state.high_water(),
            "DAG pass finished"
        );

        Ok(results)
    }

    /// Resolve a ready node's parameters and hand it to the pool.
    async fn submit(
        &self,
        graph: &mut DependencyGraph,
        pool: &WorkerPool,
        state: &mut PassState,
        results: &mut PassResults,
        position: usize,
    ) {
        let prepared = {
            let graph_ref: &DependencyGraph = graph;
            graph_ref
                .node(position)
                .prepare(|dep| graph_ref.get_task(dep).ok().and_then(|n| n.result()))
        };

        let failure = match prepared {
            Ok(invocation) => {
                debug!(task = %invocation.task, "submitting task");
                match pool.submit(Job { position, invocation }).await {
                    Ok(()) => return,
                    Err(job) => DagError::work(job.invocation.task, anyhow!("worker pool closed")),
                }
            }
            Err(err) => err,
        };

        state.complete(position);
        let node = graph.node_mut(position);
        node.fail(failure);
        results.insert(node.name().to_string(), None);
    }
}
