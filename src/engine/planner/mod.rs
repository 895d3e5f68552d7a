// src/engine/planner/mod.rs

//! Stage planners.
//!
//! A planner is a pure function from `(graph, events)` to the set of steps
//! that are ready right now plus a terminal signal. Planners hold no state
//! and are called repeatedly as events accumulate; the execution manager's
//! in-flight and completed sets are what stop a re-emitted step from being
//! dispatched twice.

pub mod cleanup;
pub mod run;

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::docker::{ContainerHandle, ImageId, NetworkHandle};
use crate::engine::events::TaskEvent;
use crate::engine::steps::TaskStep;

/// What a planner decided.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanResult {
    /// Steps that may execute now. Emitted as a set: the manager may
    /// dispatch them in any order.
    pub ready: Vec<TaskStep>,
    pub terminal: Terminal,
}

/// Terminal signal of a stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    None,
    Success,
    Failure(String),
}

/// Everything the planners derive from one pass over the event log.
#[derive(Debug, Default)]
pub(crate) struct EventFacts<'a> {
    pub task_started: bool,
    pub network: Option<&'a NetworkHandle>,
    pub network_creation_attempted: bool,
    pub network_deleted: bool,
    pub network_deletion_failed: bool,
    /// Built images by container name.
    pub built: HashMap<&'a str, &'a ImageId>,
    pub build_failed: HashSet<&'a str>,
    /// Pulled images by image reference.
    pub pulled: HashMap<&'a str, &'a ImageId>,
    pub pull_failed: HashSet<&'a str>,
    /// Created containers by name, ordered for deterministic cleanup output.
    pub created: BTreeMap<&'a str, &'a ContainerHandle>,
    pub started: HashSet<&'a str>,
    pub healthy: HashSet<&'a str>,
    pub exited: HashMap<&'a str, i64>,
    pub stopped: HashSet<&'a str>,
    pub stop_failed: HashSet<&'a str>,
    pub removed: HashSet<&'a str>,
    pub removal_failed: HashSet<&'a str>,
    /// Containers a failure event concerns; no further non-cleanup step may
    /// be dispatched against them.
    pub failed_containers: HashSet<&'a str>,
    /// Rendering of the first failure event observed.
    pub first_failure: Option<String>,
}

impl<'a> EventFacts<'a> {
    pub fn scan(events: &'a [TaskEvent]) -> Self {
        let mut facts = EventFacts::default();

        for event in events {
            if event.is_failure() {
                if let Some(container) = event.container() {
                    facts.failed_containers.insert(container);
                }
                if facts.first_failure.is_none() {
                    facts.first_failure = Some(event.to_string());
                }
            }

            match event {
                TaskEvent::TaskStarted => facts.task_started = true,
                TaskEvent::TaskNetworkCreated { network } => {
                    facts.network = Some(network);
                    facts.network_creation_attempted = true;
                }
                TaskEvent::TaskNetworkCreationFailed { .. } => {
                    facts.network_creation_attempted = true;
                }
                TaskEvent::ImageBuilt { container, image } => {
                    facts.built.insert(container.as_str(), image);
                }
                TaskEvent::ImageBuildFailed { container, .. } => {
                    facts.build_failed.insert(container.as_str());
                }
                TaskEvent::ImagePulled { reference, image } => {
                    facts.pulled.insert(reference.as_str(), image);
                }
                TaskEvent::ImagePullFailed { reference, .. } => {
                    facts.pull_failed.insert(reference.as_str());
                }
                TaskEvent::ContainerCreated { container, handle } => {
                    facts.created.insert(container.as_str(), handle);
                }
                TaskEvent::ContainerStarted { container } => {
                    facts.started.insert(container.as_str());
                }
                TaskEvent::ContainerBecameHealthy { container } => {
                    facts.healthy.insert(container.as_str());
                }
                TaskEvent::RunningContainerExited {
                    container,
                    exit_code,
                } => {
                    facts.exited.insert(container.as_str(), *exit_code);
                }
                TaskEvent::ContainerStopped { container } => {
                    facts.stopped.insert(container.as_str());
                }
                TaskEvent::ContainerStopFailed { container, .. } => {
                    facts.stop_failed.insert(container.as_str());
                }
                TaskEvent::ContainerRemoved { container } => {
                    facts.removed.insert(container.as_str());
                }
                TaskEvent::ContainerRemovalFailed { container, .. } => {
                    facts.removal_failed.insert(container.as_str());
                }
                TaskEvent::TaskNetworkDeleted => facts.network_deleted = true,
                TaskEvent::TaskNetworkDeletionFailed { .. } => {
                    facts.network_deletion_failed = true;
                }
                TaskEvent::ImageBuildProgress { .. }
                | TaskEvent::ContainerCreationFailed { .. }
                | TaskEvent::ContainerStartFailed { .. }
                | TaskEvent::ContainerDidNotBecomeHealthy { .. } => {}
            }
        }

        facts
    }
}
