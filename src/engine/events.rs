// src/engine/events.rs

use std::fmt;
use std::sync::Mutex;

use crate::docker::{ContainerHandle, ImageId, NetworkHandle};

/// One observed outcome of a step (or an intermediate signal like image
/// build progress). Events are immutable once posted.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    TaskStarted,
    TaskNetworkCreated {
        network: NetworkHandle,
    },
    TaskNetworkCreationFailed {
        message: String,
    },
    ImageBuildProgress {
        container: String,
        progress: String,
    },
    ImageBuilt {
        container: String,
        image: ImageId,
    },
    ImageBuildFailed {
        container: String,
        message: String,
    },
    ImagePulled {
        reference: String,
        image: ImageId,
    },
    ImagePullFailed {
        reference: String,
        message: String,
    },
    ContainerCreated {
        container: String,
        handle: ContainerHandle,
    },
    ContainerCreationFailed {
        container: String,
        message: String,
    },
    ContainerStarted {
        container: String,
    },
    ContainerStartFailed {
        container: String,
        message: String,
    },
    ContainerBecameHealthy {
        container: String,
    },
    ContainerDidNotBecomeHealthy {
        container: String,
        message: String,
    },
    RunningContainerExited {
        container: String,
        exit_code: i64,
    },
    ContainerStopped {
        container: String,
    },
    ContainerStopFailed {
        container: String,
        message: String,
    },
    ContainerRemoved {
        container: String,
    },
    ContainerRemovalFailed {
        container: String,
        message: String,
    },
    TaskNetworkDeleted,
    TaskNetworkDeletionFailed {
        message: String,
    },
}

impl TaskEvent {
    /// True for events that fail the run stage: every `*Failed` variant
    /// plus a container that did not become healthy.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TaskEvent::TaskNetworkCreationFailed { .. }
                | TaskEvent::ImageBuildFailed { .. }
                | TaskEvent::ImagePullFailed { .. }
                | TaskEvent::ContainerCreationFailed { .. }
                | TaskEvent::ContainerStartFailed { .. }
                | TaskEvent::ContainerDidNotBecomeHealthy { .. }
                | TaskEvent::ContainerStopFailed { .. }
                | TaskEvent::ContainerRemovalFailed { .. }
                | TaskEvent::TaskNetworkDeletionFailed { .. }
        )
    }

    /// The container this event concerns, if any.
    pub fn container(&self) -> Option<&str> {
        match self {
            TaskEvent::ImageBuildProgress { container, .. }
            | TaskEvent::ImageBuilt { container, .. }
            | TaskEvent::ImageBuildFailed { container, .. }
            | TaskEvent::ContainerCreated { container, .. }
            | TaskEvent::ContainerCreationFailed { container, .. }
            | TaskEvent::ContainerStarted { container }
            | TaskEvent::ContainerStartFailed { container, .. }
            | TaskEvent::ContainerBecameHealthy { container }
            | TaskEvent::ContainerDidNotBecomeHealthy { container, .. }
            | TaskEvent::RunningContainerExited { container, .. }
            | TaskEvent::ContainerStopped { container }
            | TaskEvent::ContainerStopFailed { container, .. }
            | TaskEvent::ContainerRemoved { container }
            | TaskEvent::ContainerRemovalFailed { container, .. } => Some(container),
            _ => None,
        }
    }

    /// The failure message, for failure events.
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            TaskEvent::TaskNetworkCreationFailed { message }
            | TaskEvent::ImageBuildFailed { message, .. }
            | TaskEvent::ImagePullFailed { message, .. }
            | TaskEvent::ContainerCreationFailed { message, .. }
            | TaskEvent::ContainerStartFailed { message, .. }
            | TaskEvent::ContainerDidNotBecomeHealthy { message, .. }
            | TaskEvent::ContainerStopFailed { message, .. }
            | TaskEvent::ContainerRemovalFailed { message, .. }
            | TaskEvent::TaskNetworkDeletionFailed { message } => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for TaskEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskEvent::TaskStarted => write!(f, "task started"),
            TaskEvent::TaskNetworkCreated { network } => {
                write!(f, "task network {network} created")
            }
            TaskEvent::TaskNetworkCreationFailed { message } => {
                write!(f, "could not create task network: {message}")
            }
            TaskEvent::ImageBuildProgress {
                container,
                progress,
            } => write!(f, "{container}: {progress}"),
            TaskEvent::ImageBuilt { container, image } => {
                write!(f, "built image {image} for container '{container}'")
            }
            TaskEvent::ImageBuildFailed { container, message } => {
                write!(f, "could not build image for container '{container}': {message}")
            }
            TaskEvent::ImagePulled { reference, .. } => write!(f, "pulled image '{reference}'"),
            TaskEvent::ImagePullFailed { reference, message } => {
                write!(f, "could not pull image '{reference}': {message}")
            }
            TaskEvent::ContainerCreated { container, .. } => {
                write!(f, "created container '{container}'")
            }
            TaskEvent::ContainerCreationFailed { container, message } => {
                write!(f, "could not create container '{container}': {message}")
            }
            TaskEvent::ContainerStarted { container } => {
                write!(f, "started container '{container}'")
            }
            TaskEvent::ContainerStartFailed { container, message } => {
                write!(f, "could not start container '{container}': {message}")
            }
            TaskEvent::ContainerBecameHealthy { container } => {
                write!(f, "container '{container}' became healthy")
            }
            TaskEvent::ContainerDidNotBecomeHealthy { container, message } => {
                write!(f, "container '{container}' did not become healthy: {message}")
            }
            TaskEvent::RunningContainerExited {
                container,
                exit_code,
            } => write!(f, "container '{container}' exited with code {exit_code}"),
            TaskEvent::ContainerStopped { container } => {
                write!(f, "stopped container '{container}'")
            }
            TaskEvent::ContainerStopFailed { container, message } => {
                write!(f, "could not stop container '{container}': {message}")
            }
            TaskEvent::ContainerRemoved { container } => {
                write!(f, "removed container '{container}'")
            }
            TaskEvent::ContainerRemovalFailed { container, message } => {
                write!(f, "could not remove container '{container}': {message}")
            }
            TaskEvent::TaskNetworkDeleted => write!(f, "task network deleted"),
            TaskEvent::TaskNetworkDeletionFailed { message } => {
                write!(f, "could not delete task network: {message}")
            }
        }
    }
}

/// Append-only, totally-ordered log of the events one task run produces.
///
/// Appends and snapshots are guarded by a single mutex; consumers observe
/// events in posting order. There is no eviction and no replay.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<TaskEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&self, event: TaskEvent) {
        self.events
            .lock()
            .expect("event log mutex poisoned")
            .push(event);
    }

    /// An ordered copy of everything posted so far.
    pub fn snapshot(&self) -> Vec<TaskEvent> {
        self.events
            .lock()
            .expect("event log mutex poisoned")
            .clone()
    }

    /// The events matching `predicate`, in posting order.
    pub fn filter<F>(&self, predicate: F) -> Vec<TaskEvent>
    where
        F: Fn(&TaskEvent) -> bool,
    {
        self.events
            .lock()
            .expect("event log mutex poisoned")
            .iter()
            .filter(|&event| predicate(event))
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events
            .lock()
            .expect("event log mutex poisoned")
            .is_empty()
    }
}
