use serde_json::Value;
use ecovoyage::dag::{DependencyGraph, TaskNode, Work};

/// Builder for `DependencyGraph` to simplify test setup.
///
/// Panics on invalid names or duplicates; tests that want to observe those
/// errors should call `DependencyGraph` directly.
pub struct GraphBuilder {
    graph: DependencyGraph,
}

impl GraphBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            graph: DependencyGraph::new(name),
        }
    }

    /// Add a task whose work returns `value`.
    pub fn constant(self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.task(
            TaskNode::from_fn(name, move |_| Ok(value.clone()))
                .expect("valid task name"),
        )
    }

    /// Add a task running the given work.
    pub fn work(self, name: &str, work: Work) -> Self {
        self.task(TaskNode::new(name, work).expect("valid task name"))
    }

    pub fn task(mut self, node: TaskNode) -> Self {
        self.graph.add_task(node).expect("unique task name");
        self
    }

    /// `task` depends on `dep`.
    pub fn after(mut self, task: &str, dep: &str) -> Self {
        self.graph
            .add_dependency(task, dep)
            .expect("task exists before adding edges");
        self
    }

    pub fn build(self) -> DependencyGraph {
        self.graph
    }
}

/// Chain `n0 <- n1 <- ... <- n{len-1}`, each returning its index.
pub fn chain(len: usize) -> DependencyGraph {
    let mut builder = GraphBuilder::new("chain");
    for i in 0..len {
        builder = builder.constant(&format!("n{i}"), i as u64);
        if i > 0 {
            builder = builder.after(&format!("n{i}"), &format!("n{}", i - 1));
        }
    }
    builder.build()
}
