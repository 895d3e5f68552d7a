// src/engine/runner.rs

//! The step runner: executes one step against the daemon and posts exactly
//! the success or failure event that step's contract promises (plus
//! zero-or-more progress events for image builds).
//!
//! Errors never propagate out of a step; every daemon failure becomes the
//! step's failure event. The manager guarantees at-most-once dispatch per
//! step identity, so steps never need to be re-entrant.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::docker::{ContainerDaemon, DockerError, HealthStatus};
use crate::engine::events::TaskEvent;
use crate::engine::steps::{StepIdentity, TaskStep};
use crate::graph::ContainerGraph;

/// Events travel back to the manager tagged with the identity of the step
/// that produced them.
pub type EventSender = mpsc::Sender<(StepIdentity, TaskEvent)>;

pub struct StepRunner {
    daemon: Arc<dyn ContainerDaemon>,
    graph: Arc<ContainerGraph>,
    project_name: String,
    network_name: String,
}

impl StepRunner {
    pub fn new(
        daemon: Arc<dyn ContainerDaemon>,
        graph: Arc<ContainerGraph>,
        project_name: &str,
        network_name: &str,
    ) -> Self {
        Self {
            daemon,
            graph,
            project_name: project_name.to_string(),
            network_name: network_name.to_string(),
        }
    }

    /// Execute `step` and post its terminal event.
    pub async fn run(&self, step: TaskStep, identity: StepIdentity, events: EventSender) {
        debug!(step = %step, "running step");

        let event = match step {
            TaskStep::BeginTask => TaskEvent::TaskStarted,

            TaskStep::BuildImage { container } => self.build_image(container, &identity, &events).await,

            TaskStep::PullImage { reference } => match self.daemon.pull_image(&reference).await {
                Ok(image) => TaskEvent::ImagePulled { reference, image },
                Err(e) => TaskEvent::ImagePullFailed {
                    reference,
                    message: e.to_string(),
                },
            },

            TaskStep::CreateTaskNetwork => {
                match self.daemon.create_network(&self.network_name).await {
                    Ok(network) => TaskEvent::TaskNetworkCreated { network },
                    Err(e) => TaskEvent::TaskNetworkCreationFailed {
                        message: e.to_string(),
                    },
                }
            }

            TaskStep::CreateContainer {
                container,
                command,
                image,
                network,
            } => {
                let node = match self.graph.node(&container) {
                    Some(node) => node,
                    None => {
                        error!(container = %container, "step refers to a container outside the graph");
                        return;
                    }
                };

                match self
                    .daemon
                    .create_container(node, command.as_deref(), &image, &network)
                    .await
                {
                    Ok(handle) => TaskEvent::ContainerCreated { container, handle },
                    Err(e) => TaskEvent::ContainerCreationFailed {
                        container,
                        message: e.to_string(),
                    },
                }
            }

            TaskStep::StartContainer { container, handle } => {
                match self.daemon.start_container(&handle).await {
                    Ok(()) => TaskEvent::ContainerStarted { container },
                    Err(e) => TaskEvent::ContainerStartFailed {
                        container,
                        message: e.to_string(),
                    },
                }
            }

            TaskStep::RunContainer { container, handle } => {
                match self.daemon.run_container(&handle).await {
                    Ok(exit_code) => TaskEvent::RunningContainerExited {
                        container,
                        exit_code,
                    },
                    Err(e) => TaskEvent::ContainerStartFailed {
                        container,
                        message: e.to_string(),
                    },
                }
            }

            TaskStep::WaitForContainerToBecomeHealthy { container, handle } => {
                match self.daemon.wait_for_health(&handle).await {
                    Ok(HealthStatus::NoHealthCheck) | Ok(HealthStatus::BecameHealthy) => {
                        TaskEvent::ContainerBecameHealthy { container }
                    }
                    Ok(HealthStatus::BecameUnhealthy) => TaskEvent::ContainerDidNotBecomeHealthy {
                        container,
                        message: "the health check reported unhealthy".to_string(),
                    },
                    Ok(HealthStatus::Exited) => TaskEvent::ContainerDidNotBecomeHealthy {
                        container,
                        message: "the container exited before becoming healthy".to_string(),
                    },
                    Err(e) => TaskEvent::ContainerDidNotBecomeHealthy {
                        container,
                        message: e.to_string(),
                    },
                }
            }

            TaskStep::StopContainer { container, handle } => {
                match self.daemon.stop_container(&handle).await {
                    Ok(()) => TaskEvent::ContainerStopped { container },
                    Err(e) => TaskEvent::ContainerStopFailed {
                        container,
                        message: e.to_string(),
                    },
                }
            }

            TaskStep::RemoveContainer { container, handle } => {
                match self.daemon.remove_container(&handle).await {
                    Ok(()) => TaskEvent::ContainerRemoved { container },
                    Err(e) => TaskEvent::ContainerRemovalFailed {
                        container,
                        message: e.to_string(),
                    },
                }
            }

            TaskStep::CleanUpContainer { container, handle } => {
                match self.daemon.forcibly_remove_container(&handle).await {
                    // Already gone counts as removed.
                    Ok(()) | Err(DockerError::ContainerDoesNotExist) => {
                        TaskEvent::ContainerRemoved { container }
                    }
                    Err(e) => TaskEvent::ContainerRemovalFailed {
                        container,
                        message: e.to_string(),
                    },
                }
            }

            TaskStep::DeleteTaskNetwork { network } => {
                match self.daemon.delete_network(&network).await {
                    Ok(()) => TaskEvent::TaskNetworkDeleted,
                    Err(e) => TaskEvent::TaskNetworkDeletionFailed {
                        message: e.to_string(),
                    },
                }
            }

            // Inline steps are executed by the manager, never dispatched here.
            TaskStep::DisplayTaskFailure { .. } | TaskStep::FinishTask => {
                error!("inline step dispatched to the step runner");
                return;
            }
        };

        let _ = events.send((identity, event)).await;
    }

    async fn build_image(
        &self,
        container: String,
        identity: &StepIdentity,
        events: &EventSender,
    ) -> TaskEvent {
        let node = match self.graph.node(&container) {
            Some(node) => node.clone(),
            None => {
                return TaskEvent::ImageBuildFailed {
                    message: format!("container '{container}' is not part of this task"),
                    container,
                }
            }
        };

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();

        // Forward build output as progress events while the build runs.
        let forwarder = {
            let events = events.clone();
            let identity = identity.clone();
            let container = container.clone();

            tokio::spawn(async move {
                while let Some(line) = progress_rx.recv().await {
                    let event = TaskEvent::ImageBuildProgress {
                        container: container.clone(),
                        progress: line,
                    };

                    if events.send((identity.clone(), event)).await.is_err() {
                        return;
                    }
                }
            })
        };

        let result = self
            .daemon
            .build_image(&self.project_name, &node, progress_tx)
            .await;

        let _ = forwarder.await;

        match result {
            Ok(image) => TaskEvent::ImageBuilt { container, image },
            Err(e) => TaskEvent::ImageBuildFailed {
                container,
                message: e.to_string(),
            },
        }
    }
}
