// src/dag/mod.rs

//! Dependency graph representation and scheduling.
//!
//! - [`node`] holds a single named unit of work and its per-pass state.
//! - [`graph`] owns the uniquely-named nodes and checks acyclicity.
//! - [`scheduler`] drives a pass over a graph with bounded parallelism.
//! - `pass_state` tracks pending / ready / in-flight nodes during a pass.

pub mod graph;
pub mod node;
mod pass_state;
pub mod scheduler;

pub use graph::DependencyGraph;
pub use node::{Invocation, ParamValue, Params, TaskName, TaskNode, TaskState, Work};
pub use scheduler::{PassResults, Scheduler};
