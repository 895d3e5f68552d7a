// src/engine/steps.rs

use std::fmt;

use crate::docker::{ContainerHandle, ImageId, NetworkHandle};

/// One atomic unit of work the engine can dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStep {
    BeginTask,
    BuildImage {
        container: String,
    },
    PullImage {
        reference: String,
    },
    CreateTaskNetwork,
    CreateContainer {
        container: String,
        command: Option<Vec<String>>,
        image: ImageId,
        network: NetworkHandle,
    },
    /// Run the task container itself: start it, stream its I/O and wait
    /// for it to exit.
    RunContainer {
        container: String,
        handle: ContainerHandle,
    },
    /// Start a dependency container without attaching to it.
    StartContainer {
        container: String,
        handle: ContainerHandle,
    },
    WaitForContainerToBecomeHealthy {
        container: String,
        handle: ContainerHandle,
    },
    StopContainer {
        container: String,
        handle: ContainerHandle,
    },
    RemoveContainer {
        container: String,
        handle: ContainerHandle,
    },
    /// Forcible removal, tolerant of the container already being gone.
    CleanUpContainer {
        container: String,
        handle: ContainerHandle,
    },
    DeleteTaskNetwork {
        network: NetworkHandle,
    },
    DisplayTaskFailure {
        instructions: String,
    },
    FinishTask,
}

impl TaskStep {
    /// The identity the manager uses for at-most-once dispatch. Two steps
    /// with equal identities are the same logical step even if their
    /// payloads differ.
    pub fn identity(&self) -> StepIdentity {
        match self {
            TaskStep::BeginTask => StepIdentity::BeginTask,
            TaskStep::BuildImage { container } => StepIdentity::BuildImage(container.clone()),
            TaskStep::PullImage { reference } => StepIdentity::PullImage(reference.clone()),
            TaskStep::CreateTaskNetwork => StepIdentity::CreateTaskNetwork,
            TaskStep::CreateContainer { container, .. } => {
                StepIdentity::CreateContainer(container.clone())
            }
            TaskStep::RunContainer { container, .. } => {
                StepIdentity::RunContainer(container.clone())
            }
            TaskStep::StartContainer { container, .. } => {
                StepIdentity::StartContainer(container.clone())
            }
            TaskStep::WaitForContainerToBecomeHealthy { container, .. } => {
                StepIdentity::WaitForContainerToBecomeHealthy(container.clone())
            }
            TaskStep::StopContainer { container, .. } => {
                StepIdentity::StopContainer(container.clone())
            }
            TaskStep::RemoveContainer { container, .. } => {
                StepIdentity::RemoveContainer(container.clone())
            }
            TaskStep::CleanUpContainer { container, .. } => {
                StepIdentity::CleanUpContainer(container.clone())
            }
            TaskStep::DeleteTaskNetwork { .. } => StepIdentity::DeleteTaskNetwork,
            TaskStep::DisplayTaskFailure { .. } => StepIdentity::DisplayTaskFailure,
            TaskStep::FinishTask => StepIdentity::FinishTask,
        }
    }

    /// Steps the manager executes inline rather than handing to the step
    /// runner; they produce no events.
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            TaskStep::DisplayTaskFailure { .. } | TaskStep::FinishTask
        )
    }
}

impl fmt::Display for TaskStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStep::BeginTask => write!(f, "begin task"),
            TaskStep::BuildImage { container } => {
                write!(f, "build image for container '{container}'")
            }
            TaskStep::PullImage { reference } => write!(f, "pull image '{reference}'"),
            TaskStep::CreateTaskNetwork => write!(f, "create task network"),
            TaskStep::CreateContainer { container, .. } => {
                write!(f, "create container '{container}'")
            }
            TaskStep::RunContainer { container, .. } => write!(f, "run container '{container}'"),
            TaskStep::StartContainer { container, .. } => {
                write!(f, "start container '{container}'")
            }
            TaskStep::WaitForContainerToBecomeHealthy { container, .. } => {
                write!(f, "wait for container '{container}' to become healthy")
            }
            TaskStep::StopContainer { container, .. } => {
                write!(f, "stop container '{container}'")
            }
            TaskStep::RemoveContainer { container, .. } => {
                write!(f, "remove container '{container}'")
            }
            TaskStep::CleanUpContainer { container, .. } => {
                write!(f, "clean up container '{container}'")
            }
            TaskStep::DeleteTaskNetwork { .. } => write!(f, "delete task network"),
            TaskStep::DisplayTaskFailure { .. } => write!(f, "display task failure"),
            TaskStep::FinishTask => write!(f, "finish task"),
        }
    }
}

/// Key for duplicate suppression: container + step kind, or network + step
/// kind. Pulls for identical references share an identity, which is what
/// coalesces them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StepIdentity {
    BeginTask,
    BuildImage(String),
    PullImage(String),
    CreateTaskNetwork,
    CreateContainer(String),
    RunContainer(String),
    StartContainer(String),
    WaitForContainerToBecomeHealthy(String),
    StopContainer(String),
    RemoveContainer(String),
    CleanUpContainer(String),
    DeleteTaskNetwork,
    DisplayTaskFailure,
    FinishTask,
}
