// src/dag/node.rs

//! A single named unit of work inside a [`DependencyGraph`].
//!
//! [`DependencyGraph`]: crate::dag::DependencyGraph

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{DagError, DagResult};

/// Canonical task name type used throughout the graph core.
pub type TaskName = String;

/// Concrete parameter values handed to a task's work.
pub type Params = BTreeMap<String, Value>;

type WorkFn = dyn Fn(&Params) -> anyhow::Result<Value> + Send + Sync;

/// Caller-supplied callable, shared so a worker can run it without borrowing
/// the graph.
#[derive(Clone)]
pub struct Work(Arc<WorkFn>);

impl Work {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Params) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, params: &Params) -> anyhow::Result<Value> {
        (self.0)(params)
    }
}

impl fmt::Debug for Work {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Work(..)")
    }
}

/// How a parameter gets its value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Fixed value bound by the caller.
    Literal(Value),
    /// Successful result of the named dependency, resolved when the node is
    /// submitted for execution.
    Upstream(TaskName),
}

/// Public view of a node's execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    DoneSuccess,
    DoneFailed,
}

impl TaskState {
    pub fn is_done(self) -> bool {
        !matches!(self, TaskState::Pending)
    }
}

/// Internal status. Carrying the result/error inside the variant means a
/// finished node can never have both or neither.
#[derive(Debug, Clone)]
enum Status {
    Pending,
    Succeeded(Value),
    Failed(DagError),
}

/// Everything a worker needs to run one node, detached from the graph.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub task: TaskName,
    pub params: Params,
    work: Work,
}

impl Invocation {
    pub fn invoke(&self) -> anyhow::Result<Value> {
        self.work.call(&self.params)
    }
}

#[derive(Debug, Clone)]
pub struct TaskNode {
    name: TaskName,
    work: Work,
    params: BTreeMap<String, ParamValue>,
    dependencies: Vec<TaskName>,
    status: Status,
}

impl TaskNode {
    /// Create a node. Fails with [`DagError::InvalidName`] on an empty name.
    pub fn new(name: impl Into<TaskName>, work: Work) -> DagResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DagError::InvalidName(name));
        }

        Ok(Self {
            name,
            work,
            params: BTreeMap::new(),
            dependencies: Vec::new(),
            status: Status::Pending,
        })
    }

    /// Shorthand for `TaskNode::new(name, Work::new(f))`.
    pub fn from_fn<F>(name: impl Into<TaskName>, f: F) -> DagResult<Self>
    where
        F: Fn(&Params) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self::new(name, Work::new(f))
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_param(key, value);
        self
    }

    pub fn with_upstream(mut self, key: impl Into<String>, task: impl Into<TaskName>) -> Self {
        self.bind_upstream(key, task);
        self
    }

    pub fn depends_on(mut self, task: impl Into<TaskName>) -> Self {
        self.add_dependency(task);
        self
    }

    /// Append a dependency. Cycles are only detected by
    /// [`DependencyGraph::validate`](crate::dag::DependencyGraph::validate).
    pub fn add_dependency(&mut self, task: impl Into<TaskName>) -> &mut Self {
        self.dependencies.push(task.into());
        self
    }

    /// Bind (or rebind) a parameter to a literal value.
    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.params
            .insert(key.into(), ParamValue::Literal(value.into()));
        self
    }

    /// Bind a parameter to the result of `task`, recording `task` as a
    /// dependency if it is not one already.
    pub fn bind_upstream(&mut self, key: impl Into<String>, task: impl Into<TaskName>) -> &mut Self {
        let task = task.into();
        if !self.dependencies.contains(&task) {
            self.dependencies.push(task.clone());
        }
        self.params.insert(key.into(), ParamValue::Upstream(task));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[TaskName] {
        &self.dependencies
    }

    pub fn params(&self) -> &BTreeMap<String, ParamValue> {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    pub fn state(&self) -> TaskState {
        match self.status {
            Status::Pending => TaskState::Pending,
            Status::Succeeded(_) => TaskState::DoneSuccess,
            Status::Failed(_) => TaskState::DoneFailed,
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.status {
            Status::Succeeded(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&DagError> {
        match &self.status {
            Status::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Forget the outcome of any previous pass.
    pub fn reset(&mut self) {
        self.status = Status::Pending;
    }

    /// Run the node's work directly, outside of a scheduler.
    ///
    /// - A node that already succeeded returns its cached result without
    ///   invoking the work again.
    /// - A node that already failed returns its stored error again.
    /// - Upstream-bound parameters cannot be resolved here, so they fail the
    ///   node with a [`DagError::WorkError`].
    pub fn execute(&mut self) -> DagResult<Value> {
        match &self.status {
            Status::Succeeded(value) => return Ok(value.clone()),
            Status::Failed(err) => return Err(err.clone()),
            Status::Pending => {}
        }

        let invocation = match self.prepare(|_| None) {
            Ok(invocation) => invocation,
            Err(err) => {
                self.status = Status::Failed(err.clone());
                return Err(err);
            }
        };

        let outcome = invocation.invoke();
        self.complete(outcome)
    }

    /// Resolve parameters and detach the work for execution elsewhere.
    ///
    /// `upstream` looks up the successful result of a dependency by name.
    pub(crate) fn prepare<'a, F>(&self, upstream: F) -> DagResult<Invocation>
    where
        F: Fn(&str) -> Option<&'a Value>,
    {
        let mut params = Params::new();

        for (key, binding) in &self.params {
            let value = match binding {
                ParamValue::Literal(value) => value.clone(),
                ParamValue::Upstream(task) => match upstream(task) {
                    Some(value) => value.clone(),
                    None => {
                        return Err(DagError::work(
                            &self.name,
                            anyhow!(
                                "parameter '{key}' is bound to task '{task}' which has no result"
                            ),
                        ));
                    }
                },
            };
            params.insert(key.clone(), value);
        }

        Ok(Invocation {
            task: self.name.clone(),
            params,
            work: self.work.clone(),
        })
    }

    /// Record the outcome of an invocation of this node's work.
    pub(crate) fn complete(&mut self, outcome: anyhow::Result<Value>) -> DagResult<Value> {
        match outcome {
            Ok(value) => {
                debug!(task = %self.name, "task completed successfully");
                self.status = Status::Succeeded(value.clone());
                Ok(value)
            }
            Err(err) => {
                let err = DagError::work(&self.name, err);
                warn!(task = %self.name, error = %err, "task failed");
                self.status = Status::Failed(err.clone());
                Err(err)
            }
        }
    }

    /// Mark the node failed because `dependency` did not succeed.
    pub(crate) fn skip(&mut self, dependency: &str) {
        debug!(
            task = %self.name,
            dependency = %dependency,
            "skipping task because a dependency failed"
        );
        self.status = Status::Failed(DagError::DependencyFailed {
            task: self.name.clone(),
            dependency: dependency.to_string(),
        });
    }

    /// Record a failure that happened outside the work itself (e.g. a panic
    /// or an unresolvable parameter).
    pub(crate) fn fail(&mut self, err: DagError) {
        warn!(task = %self.name, error = %err, "task failed");
        self.status = Status::Failed(err);
    }
}
