// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use serde_json::Value;
use tracing::debug;

use crate::dag::node::{TaskName, TaskNode, TaskState};
use crate::errors::{DagError, DagResult};

/// Visit marks for the cycle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Not reached yet.
    White,
    /// On the current DFS path.
    Grey,
    /// Fully explored; no cycle reachable through it.
    Black,
}

/// Named collection of [`TaskNode`]s keyed by task name.
///
/// Nodes keep their insertion order for diagnostics; lookups go through a
/// name → position index. The graph is built up front and then executed any
/// number of times by a [`Scheduler`](crate::dag::Scheduler), which only ever
/// touches node state.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    name: String,
    nodes: Vec<TaskNode>,
    index: HashMap<TaskName, usize>,
}

impl DependencyGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a node, failing with [`DagError::DuplicateTaskName`] if the name is
    /// already taken.
    pub fn add_task(&mut self, node: TaskNode) -> DagResult<&mut TaskNode> {
        if self.contains(node.name()) {
            return Err(DagError::DuplicateTaskName(node.name().to_string()));
        }

        let position = self.nodes.len();
        self.index.insert(node.name().to_string(), position);
        self.nodes.push(node);
        debug!(dag = %self.name, task = %self.nodes[position].name(), "task added");

        Ok(&mut self.nodes[position])
    }

    pub fn get_task(&self, name: &str) -> DagResult<&TaskNode> {
        self.index
            .get(name)
            .map(|&i| &self.nodes[i])
            .ok_or_else(|| DagError::TaskNotFound(name.to_string()))
    }

    pub fn get_task_mut(&mut self, name: &str) -> DagResult<&mut TaskNode> {
        match self.index.get(name) {
            Some(&i) => Ok(&mut self.nodes[i]),
            None => Err(DagError::TaskNotFound(name.to_string())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Make `task` depend on `dependency`.
    ///
    /// Only `task` has to exist already; unknown dependencies are reported by
    /// [`validate`](Self::validate).
    pub fn add_dependency(&mut self, task: &str, dependency: &str) -> DagResult<()> {
        self.get_task_mut(task)?.add_dependency(dependency);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Task names in insertion order.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.name())
    }

    /// Immediate dependents of a task (tasks that list it as a dependency).
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| n.dependencies().iter().any(|d| d == name))
            .map(|n| n.name())
            .collect()
    }

    pub fn state_of(&self, name: &str) -> DagResult<TaskState> {
        Ok(self.get_task(name)?.state())
    }

    pub fn result_of(&self, name: &str) -> DagResult<Option<&Value>> {
        Ok(self.get_task(name)?.result())
    }

    pub fn error_of(&self, name: &str) -> DagResult<Option<&DagError>> {
        Ok(self.get_task(name)?.error())
    }

    /// Put every node back into `Pending`.
    pub fn reset(&mut self) {
        for node in self.nodes.iter_mut() {
            node.reset();
        }
    }

    /// Check that every dependency names a node of this graph and that the
    /// dependency relation is acyclic.
    ///
    /// Uses an iterative three-color DFS; the first dependency found on the
    /// current path is reported in [`DagError::CycleDetected`].
    pub fn validate(&self) -> DagResult<bool> {
        let deps = self.dependency_indices()?;
        let mut color = vec![Color::White; self.nodes.len()];

        for start in 0..self.nodes.len() {
            if color[start] != Color::White {
                continue;
            }

            color[start] = Color::Grey;
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];

            while let Some(frame) = stack.last_mut() {
                let (node, cursor) = *frame;

                match deps[node].get(cursor) {
                    Some(&dep) => {
                        frame.1 += 1;
                        match color[dep] {
                            Color::White => {
                                color[dep] = Color::Grey;
                                stack.push((dep, 0));
                            }
                            Color::Grey => {
                                let witness = self.nodes[dep].name().to_string();
                                debug!(dag = %self.name, task = %witness, "cycle detected");
                                return Err(DagError::CycleDetected(witness));
                            }
                            Color::Black => {}
                        }
                    }
                    None => {
                        color[node] = Color::Black;
                        stack.pop();
                    }
                }
            }
        }

        Ok(true)
    }

    /// Task names ordered so that every task comes after all of its
    /// dependencies.
    pub fn topological_order(&self) -> DagResult<Vec<TaskName>> {
        self.validate()?;

        // Edge direction: dependency -> task.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for node in &self.nodes {
            graph.add_node(node.name());
        }
        for node in &self.nodes {
            for dep in node.dependencies() {
                graph.add_edge(dep.as_str(), node.name(), ());
            }
        }

        toposort(&graph, None)
            .map(|order| order.into_iter().map(str::to_string).collect())
            .map_err(|cycle| DagError::CycleDetected(cycle.node_id().to_string()))
    }

    /// Dependency positions for every node, in node order.
    pub(crate) fn dependency_indices(&self) -> DagResult<Vec<Vec<usize>>> {
        self.nodes
            .iter()
            .map(|node| {
                node.dependencies()
                    .iter()
                    .map(|dep| {
                        self.index
                            .get(dep)
                            .copied()
                            .ok_or_else(|| DagError::TaskNotFound(dep.clone()))
                    })
                    .collect()
            })
            .collect()
    }

    pub(crate) fn node(&self, position: usize) -> &TaskNode {
        &self.nodes[position]
    }

    pub(crate) fn node_mut(&mut self, position: usize) -> &mut TaskNode {
        &mut self.nodes[position]
    }
}
