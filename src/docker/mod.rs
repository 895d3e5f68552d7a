// src/docker/mod.rs

//! Container daemon abstraction.
//!
//! The engine only ever talks to the daemon through [`ContainerDaemon`];
//! [`client`] provides the real implementation on top of `bollard`, and the
//! integration tests substitute an in-memory fake. The engine never inspects
//! failure content beyond forwarding it as an event message, with one
//! exception: [`DockerError::ContainerDoesNotExist`] makes forcible removal
//! idempotent.

pub mod client;
pub mod types;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::graph::ContainerNode;

pub use client::DockerDaemon;
pub use types::{ContainerHandle, DockerError, HealthStatus, ImageId, NetworkHandle};

/// Sink for image build progress lines. Builds may report any number of
/// them before completing.
pub type BuildProgressSender = mpsc::UnboundedSender<String>;

/// The operations the engine requires of a container daemon.
#[async_trait]
pub trait ContainerDaemon: Send + Sync {
    /// Build the image for `node`, tagged for `project_name`.
    async fn build_image(
        &self,
        project_name: &str,
        node: &ContainerNode,
        progress: BuildProgressSender,
    ) -> Result<ImageId, DockerError>;

    /// Pull an image by reference.
    async fn pull_image(&self, reference: &str) -> Result<ImageId, DockerError>;

    /// Create a bridge network for the task.
    async fn create_network(&self, name: &str) -> Result<NetworkHandle, DockerError>;

    async fn delete_network(&self, network: &NetworkHandle) -> Result<(), DockerError>;

    /// Create a container for `node` attached to `network`.
    ///
    /// `command` is the effective argv; `None` keeps the image default.
    async fn create_container(
        &self,
        node: &ContainerNode,
        command: Option<&[String]>,
        image: &ImageId,
        network: &NetworkHandle,
    ) -> Result<ContainerHandle, DockerError>;

    async fn start_container(&self, handle: &ContainerHandle) -> Result<(), DockerError>;

    /// Start the container, stream its I/O to the terminal and block until
    /// it exits. Returns the exit code.
    async fn run_container(&self, handle: &ContainerHandle) -> Result<i64, DockerError>;

    /// Block until the container's health is known.
    async fn wait_for_health(&self, handle: &ContainerHandle) -> Result<HealthStatus, DockerError>;

    async fn stop_container(&self, handle: &ContainerHandle) -> Result<(), DockerError>;

    async fn remove_container(&self, handle: &ContainerHandle) -> Result<(), DockerError>;

    /// Remove the container even if it is still running.
    async fn forcibly_remove_container(&self, handle: &ContainerHandle)
        -> Result<(), DockerError>;
}
