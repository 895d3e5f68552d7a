// src/docker/types.rs

use std::fmt;

use thiserror::Error;

/// Daemon-assigned container id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerHandle(pub String);

impl fmt::Display for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Daemon-assigned network id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkHandle(pub String);

impl fmt::Display for NetworkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a built or pulled image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageId(pub String);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of waiting for a container's health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// The image defines no health check.
    NoHealthCheck,
    BecameHealthy,
    BecameUnhealthy,
    /// The container exited before its health was determined.
    Exited,
}

/// Failures raised by daemon operations.
#[derive(Debug, Clone, Error)]
pub enum DockerError {
    #[error("could not connect to the Docker daemon: {0}")]
    Connection(String),

    #[error("image build failed: {0}")]
    ImageBuild(String),

    #[error("image pull failed: {0}")]
    ImagePull(String),

    #[error("network operation failed: {0}")]
    Network(String),

    #[error("container creation failed: {0}")]
    ContainerCreation(String),

    #[error("container operation failed: {0}")]
    Container(String),

    /// The container is already gone. Cleanup treats this as success.
    #[error("container does not exist")]
    ContainerDoesNotExist,
}
