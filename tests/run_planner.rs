// tests/run_planner.rs

//! The run-stage planner is a pure function over the event log, so these
//! tests feed it hand-written logs and assert on the ready set and the
//! terminal signal. They never assert on inter-sibling ordering.

mod common;

use common::*;
use dockhand::config::ConfigFile;
use dockhand::docker::{ContainerHandle, ImageId, NetworkHandle};
use dockhand::engine::planner::run;
use dockhand::engine::planner::Terminal;
use dockhand::engine::{TaskEvent, TaskStep};
use dockhand::graph::ContainerGraph;

fn graph_for(cfg: &ConfigFile, task: &str) -> ContainerGraph {
    ContainerGraph::resolve(cfg, task, &cfg.tasks[task]).expect("graph should resolve")
}

fn single_container() -> ContainerGraph {
    let cfg = config(
        "p",
        vec![("svc", pulled_container("alpine"))],
        vec![("t", task_running("svc"))],
    );

    graph_for(&cfg, "t")
}

fn with_dependency() -> ContainerGraph {
    let mut task = task_running("svc");
    task.dependencies = vec!["db".to_string()];

    let cfg = config(
        "p",
        vec![
            ("svc", pulled_container("alpine")),
            ("db", pulled_container("postgres:16")),
        ],
        vec![("t", task)],
    );

    graph_for(&cfg, "t")
}

fn network() -> NetworkHandle {
    NetworkHandle("net-1".to_string())
}

fn pulled(reference: &str) -> TaskEvent {
    TaskEvent::ImagePulled {
        reference: reference.to_string(),
        image: ImageId(format!("img-{reference}")),
    }
}

fn created(container: &str) -> TaskEvent {
    TaskEvent::ContainerCreated {
        container: container.to_string(),
        handle: ContainerHandle(format!("ctr-{container}")),
    }
}

#[test]
fn an_empty_log_asks_only_to_begin_the_task() {
    let plan = run::plan(&single_container(), &[]);

    assert_eq!(plan.ready, vec![TaskStep::BeginTask]);
    assert_eq!(plan.terminal, Terminal::None);
}

#[test]
fn once_started_the_network_and_images_proceed_in_parallel() {
    let plan = run::plan(&single_container(), &[TaskEvent::TaskStarted]);

    assert!(plan.ready.contains(&TaskStep::CreateTaskNetwork));
    assert!(plan.ready.contains(&TaskStep::PullImage {
        reference: "alpine".to_string()
    }));
    assert_eq!(plan.terminal, Terminal::None);
}

#[test]
fn identical_pull_references_collapse_to_one_step() {
    let mut task = task_running("svc");
    task.dependencies = vec!["other".to_string()];

    let cfg = config(
        "p",
        vec![
            ("svc", pulled_container("alpine")),
            ("other", pulled_container("alpine")),
        ],
        vec![("t", task)],
    );

    let graph = graph_for(&cfg, "t");
    let plan = run::plan(&graph, &[TaskEvent::TaskStarted]);

    let pulls: Vec<_> = plan
        .ready
        .iter()
        .filter(|s| matches!(s, TaskStep::PullImage { .. }))
        .collect();

    assert_eq!(pulls.len(), 1);
}

#[test]
fn a_container_is_created_once_its_image_and_the_network_are_ready() {
    let graph = single_container();

    let not_yet = run::plan(&graph, &[TaskEvent::TaskStarted, pulled("alpine")]);
    assert!(!not_yet
        .ready
        .iter()
        .any(|s| matches!(s, TaskStep::CreateContainer { .. })));

    let events = vec![
        TaskEvent::TaskStarted,
        pulled("alpine"),
        TaskEvent::TaskNetworkCreated { network: network() },
    ];

    let plan = run::plan(&graph, &events);

    assert!(plan
        .ready
        .iter()
        .any(|s| matches!(s, TaskStep::CreateContainer { container, .. } if container == "svc")));
}

#[test]
fn the_task_container_waits_for_dependencies_to_be_healthy() {
    let graph = with_dependency();

    let mut events = vec![
        TaskEvent::TaskStarted,
        TaskEvent::TaskNetworkCreated { network: network() },
        pulled("alpine"),
        pulled("postgres:16"),
        created("db"),
        TaskEvent::ContainerStarted {
            container: "db".to_string(),
        },
    ];

    let plan = run::plan(&graph, &events);

    // db is started but not yet healthy: wait for it, do not create svc.
    assert!(plan.ready.iter().any(|s| matches!(
        s,
        TaskStep::WaitForContainerToBecomeHealthy { container, .. } if container == "db"
    )));
    assert!(!plan
        .ready
        .iter()
        .any(|s| matches!(s, TaskStep::CreateContainer { container, .. } if container == "svc")));

    events.push(TaskEvent::ContainerBecameHealthy {
        container: "db".to_string(),
    });

    let plan = run::plan(&graph, &events);

    assert!(plan
        .ready
        .iter()
        .any(|s| matches!(s, TaskStep::CreateContainer { container, .. } if container == "svc")));

    events.push(created("svc"));

    let plan = run::plan(&graph, &events);

    assert!(plan
        .ready
        .iter()
        .any(|s| matches!(s, TaskStep::RunContainer { container, .. } if container == "svc")));
}

#[test]
fn a_dependency_container_is_started_not_run() {
    let graph = with_dependency();

    let events = vec![
        TaskEvent::TaskStarted,
        TaskEvent::TaskNetworkCreated { network: network() },
        pulled("postgres:16"),
        created("db"),
    ];

    let plan = run::plan(&graph, &events);

    assert!(plan
        .ready
        .iter()
        .any(|s| matches!(s, TaskStep::StartContainer { container, .. } if container == "db")));
    assert!(!plan
        .ready
        .iter()
        .any(|s| matches!(s, TaskStep::RunContainer { container, .. } if container == "db")));
}

#[test]
fn any_failure_event_is_terminal() {
    let graph = single_container();

    let events = vec![
        TaskEvent::TaskStarted,
        TaskEvent::ImagePullFailed {
            reference: "alpine".to_string(),
            message: "no such image".to_string(),
        },
    ];

    let plan = run::plan(&graph, &events);

    match plan.terminal {
        Terminal::Failure(reason) => assert!(reason.contains("alpine"), "got: {reason}"),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn an_unhealthy_dependency_is_terminal() {
    let graph = with_dependency();

    let events = vec![
        TaskEvent::TaskStarted,
        TaskEvent::TaskNetworkCreated { network: network() },
        pulled("postgres:16"),
        created("db"),
        TaskEvent::ContainerStarted {
            container: "db".to_string(),
        },
        TaskEvent::ContainerDidNotBecomeHealthy {
            container: "db".to_string(),
            message: "the health check reported unhealthy".to_string(),
        },
    ];

    let plan = run::plan(&graph, &events);

    assert!(matches!(plan.terminal, Terminal::Failure(_)));

    // No further work may be planned against the failed container.
    assert!(!plan
        .ready
        .iter()
        .any(|s| matches!(s, TaskStep::WaitForContainerToBecomeHealthy { container, .. } if container == "db")));
}

#[test]
fn the_task_container_exiting_is_success() {
    let graph = single_container();

    let events = vec![
        TaskEvent::TaskStarted,
        TaskEvent::TaskNetworkCreated { network: network() },
        pulled("alpine"),
        created("svc"),
        TaskEvent::RunningContainerExited {
            container: "svc".to_string(),
            exit_code: 3,
        },
    ];

    let plan = run::plan(&graph, &events);

    assert_eq!(plan.terminal, Terminal::Success);
}
