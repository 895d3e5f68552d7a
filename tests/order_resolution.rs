// tests/order_resolution.rs

mod common;

use common::*;
use dockhand::errors::ConfigError;
use dockhand::graph::resolve_execution_order;

fn task_with_prereqs(container: &str, prereqs: &[&str]) -> dockhand::config::TaskConfig {
    let mut task = task_running(container);
    task.prerequisites = prereqs.iter().map(|p| p.to_string()).collect();
    task
}

#[test]
fn a_task_without_prerequisites_runs_alone() {
    let cfg = config(
        "p",
        vec![("svc", pulled_container("alpine"))],
        vec![("t", task_running("svc"))],
    );

    assert_eq!(resolve_execution_order(&cfg, "t").unwrap(), vec!["t"]);
}

#[test]
fn prerequisites_run_before_the_target_depth_first() {
    let cfg = config(
        "p",
        vec![("svc", pulled_container("alpine"))],
        vec![
            ("build", task_running("svc")),
            ("test", task_with_prereqs("svc", &["build"])),
            ("deploy", task_with_prereqs("svc", &["test", "smoke"])),
            ("smoke", task_with_prereqs("svc", &["build"])),
        ],
    );

    assert_eq!(
        resolve_execution_order(&cfg, "deploy").unwrap(),
        vec!["build", "test", "smoke", "deploy"]
    );
}

#[test]
fn shared_prerequisites_run_once_on_first_encounter() {
    let cfg = config(
        "p",
        vec![("svc", pulled_container("alpine"))],
        vec![
            ("a", task_running("svc")),
            ("b", task_with_prereqs("svc", &["a"])),
            ("c", task_with_prereqs("svc", &["a"])),
            ("d", task_with_prereqs("svc", &["b", "c"])),
        ],
    );

    assert_eq!(
        resolve_execution_order(&cfg, "d").unwrap(),
        vec!["a", "b", "c", "d"]
    );
}

#[test]
fn an_unknown_target_is_rejected() {
    let cfg = config("p", vec![], vec![]);

    let err = resolve_execution_order(&cfg, "ghost").unwrap_err();
    assert!(matches!(err, ConfigError::UnknownTask { task } if task == "ghost"));
}

#[test]
fn a_prerequisite_cycle_is_named() {
    let cfg = config(
        "p",
        vec![("svc", pulled_container("alpine"))],
        vec![
            ("a", task_with_prereqs("svc", &["b"])),
            ("b", task_with_prereqs("svc", &["a"])),
        ],
    );

    let err = resolve_execution_order(&cfg, "a").unwrap_err();

    match err {
        ConfigError::PrerequisiteCycle { cycle } => assert_eq!(cycle, "a -> b -> a"),
        other => panic!("expected a cycle error, got {other:?}"),
    }
}
