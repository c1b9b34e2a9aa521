// src/dag/pass_state.rs

//! Per-pass bookkeeping for the scheduler.
//!
//! Tracks which nodes are still pending, which are ready to be submitted and
//! which are in flight. It never runs work itself and is only touched by the
//! coordinating loop in [`Scheduler::run`](crate::dag::Scheduler::run).

use std::collections::{BTreeSet, HashSet, VecDeque};

use tracing::debug;

use crate::dag::graph::DependencyGraph;
use crate::dag::node::TaskState;

#[derive(Debug)]
pub(crate) struct PassState {
    /// Dependency positions per node.
    deps: Vec<Vec<usize>>,
    /// Not yet ready, skipped or submitted.
    pending: BTreeSet<usize>,
    /// All dependencies succeeded; waiting for a free worker.
    ready: VecDeque<usize>,
    in_flight: HashSet<usize>,
    max_in_flight: usize,
    /// Largest in-flight count seen during this pass.
    high_water: usize,
}

impl PassState {
    pub(crate) fn new(deps: Vec<Vec<usize>>, max_in_flight: usize) -> Self {
        let pending = (0..deps.len()).collect();
        Self {
            deps,
            pending,
            ready: VecDeque::new(),
            in_flight: HashSet::new(),
            max_in_flight: max_in_flight.max(1),
            high_water: 0,
        }
    }

    /// Move every pending node whose dependencies are all done out of the
    /// pending set: into `ready` if they all succeeded, otherwise mark the node
    /// as skipped on the graph.
    ///
    /// Repeats until nothing changes, so a skip cascades through the whole
    /// downstream subgraph in one call. Returns the skipped positions.
    pub(crate) fn settle(&mut self, graph: &mut DependencyGraph) -> Vec<usize> {
        let mut skipped = Vec::new();

        loop {
            let mut changed = false;
            let candidates: Vec<usize> = self.pending.iter().copied().collect();

            for position in candidates {
                let deps = &self.deps[position];
                if !deps.iter().all(|&d| graph.node(d).state().is_done()) {
                    continue;
                }

                self.pending.remove(&position);
                changed = true;

                let failed = deps
                    .iter()
                    .copied()
                    .find(|&d| graph.node(d).state() == TaskState::DoneFailed);

                match failed {
                    Some(dep) => {
                        let dependency = graph.node(dep).name().to_string();
                        graph.node_mut(position).skip(&dependency);
                        skipped.push(position);
                    }
                    None => {
                        debug!(task = %graph.node(position).name(), "dependencies satisfied; task ready");
                        self.ready.push_back(position);
                    }
                }
            }

            if !changed {
                break;
            }
        }

        skipped
    }

    /// Take the next ready node if a worker slot is free, marking it in flight.
    pub(crate) fn next_submission(&mut self) -> Option<usize> {
        if self.in_flight.len() >= self.max_in_flight {
            return None;
        }

        let position = self.ready.pop_front()?;
        self.in_flight.insert(position);
        self.high_water = self.high_water.max(self.in_flight.len());
        Some(position)
    }

    /// Forget an in-flight node once its outcome has been recorded.
    pub(crate) fn complete(&mut self, position: usize) -> bool {
        self.in_flight.remove(&position)
    }

    pub(crate) fn drain_in_flight(&mut self) -> Vec<usize> {
        self.in_flight.drain().collect()
    }

    pub(crate) fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub(crate) fn high_water(&self) -> usize {
        self.high_water
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.pending.is_empty() && self.ready.is_empty() && self.in_flight.is_empty()
    }

    /// Nodes remain but none can make progress.
    pub(crate) fn is_stalled(&self) -> bool {
        !self.is_finished() && self.ready.is_empty() && self.in_flight.is_empty()
    }

    pub(crate) fn pending(&self) -> impl Iterator<Item = usize> + '_ {
        self.pending.iter().copied()
    }
}
