// tests/graph_validation.rs

use serde_json::json;

use ecovoyage::dag::{DependencyGraph, TaskNode};
use ecovoyage::errors::DagError;
use ecovoyage_test_utils::builders::{GraphBuilder, chain};

#[test]
fn new_graph_is_empty() {
    let dag = DependencyGraph::new("test_dag");

    assert_eq!(dag.name(), "test_dag");
    assert!(dag.is_empty());
    assert_eq!(dag.len(), 0);
    assert_eq!(dag.validate().unwrap(), true);
}

#[test]
fn add_and_get_tasks() {
    let dag = GraphBuilder::new("test_dag")
        .constant("task1", "result1")
        .constant("task2", "result2")
        .build();

    assert_eq!(dag.len(), 2);
    assert_eq!(dag.get_task("task1").unwrap().name(), "task1");
    assert_eq!(dag.get_task("task2").unwrap().name(), "task2");
    assert_eq!(dag.task_names().collect::<Vec<_>>(), ["task1", "task2"]);
}

#[test]
fn duplicate_name_is_rejected_and_count_unchanged() {
    let mut dag = GraphBuilder::new("test_dag").constant("task1", 1).build();

    let duplicate = TaskNode::from_fn("task1", |_| Ok(json!(2))).unwrap();
    let err = dag.add_task(duplicate).unwrap_err();

    assert!(matches!(err, DagError::DuplicateTaskName(ref name) if name == "task1"));
    assert_eq!(dag.len(), 1);
    // The original task is untouched.
    let mut original = dag.get_task("task1").unwrap().clone();
    assert_eq!(original.execute().unwrap(), json!(1));
}

#[test]
fn unknown_task_lookup_fails() {
    let mut dag = DependencyGraph::new("test_dag");

    assert!(matches!(dag.get_task("missing"), Err(DagError::TaskNotFound(ref n)) if n == "missing"));
    assert!(matches!(dag.get_task_mut("missing"), Err(DagError::TaskNotFound(_))));
    assert!(matches!(
        dag.add_dependency("missing", "other"),
        Err(DagError::TaskNotFound(_))
    ));
    assert!(matches!(dag.state_of("missing"), Err(DagError::TaskNotFound(_))));
}

#[test]
fn validate_accepts_dag() {
    let dag = GraphBuilder::new("test_dag")
        .constant("task1", 1)
        .constant("task2", 2)
        .after("task2", "task1")
        .build();

    assert!(dag.validate().unwrap());
}

#[test]
fn validate_accepts_diamond() {
    // a <- b, a <- c, {b, c} <- d
    let dag = GraphBuilder::new("diamond")
        .constant("a", 1)
        .constant("b", 2)
        .constant("c", 3)
        .constant("d", 4)
        .after("b", "a")
        .after("c", "a")
        .after("d", "b")
        .after("d", "c")
        .build();

    assert!(dag.validate().unwrap());
}

#[test]
fn validate_accepts_long_chain() {
    let dag = chain(5_000);
    assert!(dag.validate().unwrap());
}

#[test]
fn validate_detects_two_node_cycle() {
    let dag = GraphBuilder::new("test_dag")
        .constant("task1", 1)
        .constant("task2", 2)
        .after("task2", "task1")
        .after("task1", "task2")
        .build();

    match dag.validate() {
        Err(DagError::CycleDetected(name)) => {
            assert!(name == "task1" || name == "task2", "unexpected witness {name}");
        }
        other => panic!("expected CycleDetected, got {other:?}"),
    }
}

#[test]
fn validate_names_a_node_on_the_cycle() {
    // entry -> x -> y -> z -> x, plus an unrelated tail.
    let dag = GraphBuilder::new("cycle")
        .constant("entry", 0)
        .constant("x", 1)
        .constant("y", 2)
        .constant("z", 3)
        .constant("tail", 4)
        .after("entry", "x")
        .after("x", "y")
        .after("y", "z")
        .after("z", "x")
        .after("tail", "entry")
        .build();

    match dag.validate() {
        Err(DagError::CycleDetected(name)) => {
            assert!(["x", "y", "z"].contains(&name.as_str()), "witness {name} not on cycle");
        }
        other => panic!("expected CycleDetected, got {other:?}"),
    }
}

#[test]
fn validate_detects_self_dependency() {
    let dag = GraphBuilder::new("self")
        .constant("loop", 1)
        .after("loop", "loop")
        .build();

    assert!(matches!(dag.validate(), Err(DagError::CycleDetected(ref n)) if n == "loop"));
}

#[test]
fn validate_rejects_unknown_dependency() {
    let dag = GraphBuilder::new("dangling")
        .constant("a", 1)
        .after("a", "ghost")
        .build();

    assert!(matches!(dag.validate(), Err(DagError::TaskNotFound(ref n)) if n == "ghost"));
}

#[test]
fn topological_order_puts_dependencies_first() {
    let dag = GraphBuilder::new("order")
        .constant("c", 3)
        .constant("b", 2)
        .constant("a", 1)
        .after("c", "b")
        .after("b", "a")
        .build();

    let order = dag.topological_order().unwrap();
    let pos = |name: &str| order.iter().position(|n| n == name).unwrap();

    assert_eq!(order.len(), 3);
    assert!(pos("a") < pos("b"));
    assert!(pos("b") < pos("c"));
}

#[test]
fn topological_order_fails_on_cycle() {
    let dag = GraphBuilder::new("cycle")
        .constant("a", 1)
        .constant("b", 2)
        .after("a", "b")
        .after("b", "a")
        .build();

    assert!(matches!(dag.topological_order(), Err(DagError::CycleDetected(_))));
}

#[test]
fn dependents_of_lists_direct_dependents() {
    let dag = GraphBuilder::new("fan_out")
        .constant("root", 0)
        .constant("left", 1)
        .constant("right", 2)
        .constant("leaf", 3)
        .after("left", "root")
        .after("right", "root")
        .after("leaf", "left")
        .build();

    assert_eq!(dag.dependents_of("root"), ["left", "right"]);
    assert_eq!(dag.dependents_of("left"), ["leaf"]);
    assert!(dag.dependents_of("leaf").is_empty());
}
