// src/docker/client.rs

//! The real daemon implementation on top of `bollard`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bollard::container::{
    AttachContainerOptions, Config, CreateContainerOptions, InspectContainerOptions, LogOutput,
    NetworkingConfig, RemoveContainerOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::{BuildImageOptions, CreateImageOptions};
use bollard::network::CreateNetworkOptions;
use bollard::secret::{
    ContainerStateStatusEnum, EndpointSettings, HealthStatusEnum, HostConfig, PortBinding,
};
use bollard::Docker;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::docker::types::{ContainerHandle, DockerError, HealthStatus, ImageId, NetworkHandle};
use crate::docker::{BuildProgressSender, ContainerDaemon};
use crate::graph::ContainerNode;

const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct DockerDaemon {
    client: Docker,
}

impl DockerDaemon {
    pub fn connect() -> Result<Self, DockerError> {
        let client = Docker::connect_with_unix_defaults()
            .map_err(|e| DockerError::Connection(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ContainerDaemon for DockerDaemon {
    async fn build_image(
        &self,
        project_name: &str,
        node: &ContainerNode,
        progress: BuildProgressSender,
    ) -> Result<ImageId, DockerError> {
        let directory = match &node.image_source {
            crate::graph::ImageSource::Build(directory) => directory.clone(),
            crate::graph::ImageSource::Pull(reference) => {
                return Err(DockerError::ImageBuild(format!(
                    "container '{}' pulls '{}' and has nothing to build",
                    node.name, reference
                )))
            }
        };

        let tag = format!("{}-{}", project_name, node.name);
        let context = build_context_tar(directory).await?;

        let options = BuildImageOptions {
            dockerfile: "Dockerfile".to_string(),
            t: tag.clone(),
            rm: true,
            ..Default::default()
        };

        let mut stream = self.client.build_image(options, None, Some(context.into()));

        while let Some(message) = stream.next().await {
            let info = message.map_err(|e| DockerError::ImageBuild(e.to_string()))?;

            if let Some(error) = info.error {
                return Err(DockerError::ImageBuild(error));
            }

            if let Some(line) = info.stream.or(info.status) {
                let line = line.trim_end();
                if !line.is_empty() {
                    let _ = progress.send(line.to_string());
                }
            }
        }

        Ok(ImageId(tag))
    }

    async fn pull_image(&self, reference: &str) -> Result<ImageId, DockerError> {
        let options = CreateImageOptions {
            from_image: reference.to_string(),
            ..Default::default()
        };

        let mut stream = self.client.create_image(Some(options), None, None);

        while let Some(message) = stream.next().await {
            let info = message.map_err(|e| DockerError::ImagePull(e.to_string()))?;
            if let Some(status) = info.status {
                debug!(image = %reference, "pull: {}", status);
            }
        }

        Ok(ImageId(reference.to_string()))
    }

    async fn create_network(&self, name: &str) -> Result<NetworkHandle, DockerError> {
        let options = CreateNetworkOptions {
            name: name.to_string(),
            driver: "bridge".to_string(),
            check_duplicate: true,
            ..Default::default()
        };

        self.client
            .create_network(options)
            .await
            .map_err(|e| DockerError::Network(e.to_string()))?;

        // The daemon accepts the name anywhere an id is accepted, and the
        // name is what a user would reach for to clean up by hand.
        Ok(NetworkHandle(name.to_string()))
    }

    async fn delete_network(&self, network: &NetworkHandle) -> Result<(), DockerError> {
        self.client
            .remove_network(&network.0)
            .await
            .map_err(|e| DockerError::Network(e.to_string()))
    }

    async fn create_container(
        &self,
        node: &ContainerNode,
        command: Option<&[String]>,
        image: &ImageId,
        network: &NetworkHandle,
    ) -> Result<ContainerHandle, DockerError> {
        let env: Vec<String> = node
            .environment
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();

        let binds: Vec<String> = node.volumes.iter().map(volume_bind).collect();

        let mut exposed_ports = HashMap::new();
        let mut port_bindings = HashMap::new();

        for port in node.ports.iter() {
            let container_port = format!("{}/tcp", port.container);
            exposed_ports.insert(container_port.clone(), HashMap::new());
            port_bindings.insert(
                container_port,
                Some(vec![PortBinding {
                    host_ip: None,
                    host_port: Some(port.local.to_string()),
                }]),
            );
        }

        let host_config = HostConfig {
            binds: if binds.is_empty() { None } else { Some(binds) },
            port_bindings: if port_bindings.is_empty() {
                None
            } else {
                Some(port_bindings)
            },
            ..Default::default()
        };

        // Attach to the task network with the container name as alias so
        // dependencies can reach each other by name.
        let mut endpoints = HashMap::new();
        endpoints.insert(
            network.0.clone(),
            EndpointSettings {
                aliases: Some(vec![node.name.clone()]),
                ..Default::default()
            },
        );

        let config = Config {
            image: Some(image.0.clone()),
            cmd: command.map(|argv| argv.to_vec()),
            env: Some(env),
            working_dir: node.working_directory.clone(),
            exposed_ports: if exposed_ports.is_empty() {
                None
            } else {
                Some(exposed_ports)
            },
            open_stdin: Some(true),
            host_config: Some(host_config),
            networking_config: Some(NetworkingConfig {
                endpoints_config: endpoints,
            }),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: unique_container_name(&node.name),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(Some(options), config)
            .await
            .map_err(|e| DockerError::ContainerCreation(e.to_string()))?;

        Ok(ContainerHandle(response.id))
    }

    async fn start_container(&self, handle: &ContainerHandle) -> Result<(), DockerError> {
        self.client
            .start_container(&handle.0, None::<StartContainerOptions<String>>)
            .await
            .map_err(container_error)
    }

    async fn run_container(&self, handle: &ContainerHandle) -> Result<i64, DockerError> {
        // Attach before starting so no output is missed.
        let attach_options = AttachContainerOptions::<String> {
            stdin: Some(true),
            stdout: Some(true),
            stderr: Some(true),
            stream: Some(true),
            logs: Some(true),
            ..Default::default()
        };

        let results = self
            .client
            .attach_container(&handle.0, Some(attach_options))
            .await
            .map_err(container_error)?;

        let mut output = results.output;
        let mut input = results.input;

        tokio::spawn(async move {
            let mut stdin = tokio::io::stdin();
            let _ = tokio::io::copy(&mut stdin, &mut input).await;
        });

        let forward = tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            let mut stderr = tokio::io::stderr();

            while let Some(Ok(chunk)) = output.next().await {
                let result = match chunk {
                    LogOutput::StdErr { message } => stderr.write_all(&message).await,
                    LogOutput::StdOut { message }
                    | LogOutput::Console { message }
                    | LogOutput::StdIn { message } => stdout.write_all(&message).await,
                };

                if result.is_err() {
                    break;
                }
            }

            let _ = stdout.flush().await;
            let _ = stderr.flush().await;
        });

        self.client
            .start_container(&handle.0, None::<StartContainerOptions<String>>)
            .await
            .map_err(container_error)?;

        let mut wait = self
            .client
            .wait_container(&handle.0, None::<WaitContainerOptions<String>>);

        let exit_code = match wait.next().await {
            Some(Ok(response)) => response.status_code,
            // bollard reports a non-zero exit status as an error variant.
            Some(Err(BollardError::DockerContainerWaitError { code, .. })) => code,
            Some(Err(e)) => return Err(container_error(e)),
            None => {
                return Err(DockerError::Container(
                    "daemon closed the wait stream without reporting an exit status".to_string(),
                ))
            }
        };

        let _ = forward.await;

        Ok(exit_code)
    }

    async fn wait_for_health(&self, handle: &ContainerHandle) -> Result<HealthStatus, DockerError> {
        loop {
            let inspection = self
                .client
                .inspect_container(&handle.0, None::<InspectContainerOptions>)
                .await
                .map_err(container_error)?;

            let state = inspection.state.unwrap_or_default();

            if matches!(
                state.status,
                Some(ContainerStateStatusEnum::EXITED) | Some(ContainerStateStatusEnum::DEAD)
            ) {
                return Ok(HealthStatus::Exited);
            }

            let health_status = state.health.and_then(|h| h.status);

            match health_status {
                None | Some(HealthStatusEnum::NONE) | Some(HealthStatusEnum::EMPTY) => {
                    return Ok(HealthStatus::NoHealthCheck)
                }
                Some(HealthStatusEnum::HEALTHY) => return Ok(HealthStatus::BecameHealthy),
                Some(HealthStatusEnum::UNHEALTHY) => return Ok(HealthStatus::BecameUnhealthy),
                Some(HealthStatusEnum::STARTING) => {
                    tokio::time::sleep(HEALTH_POLL_INTERVAL).await;
                }
            }
        }
    }

    async fn stop_container(&self, handle: &ContainerHandle) -> Result<(), DockerError> {
        self.client
            .stop_container(&handle.0, None)
            .await
            .map_err(container_error)
    }

    async fn remove_container(&self, handle: &ContainerHandle) -> Result<(), DockerError> {
        let options = RemoveContainerOptions {
            v: true,
            ..Default::default()
        };

        self.client
            .remove_container(&handle.0, Some(options))
            .await
            .map_err(container_error)
    }

    async fn forcibly_remove_container(
        &self,
        handle: &ContainerHandle,
    ) -> Result<(), DockerError> {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };

        self.client
            .remove_container(&handle.0, Some(options))
            .await
            .map_err(container_error)
    }
}

/// Package a build directory as the tar archive the daemon expects.
async fn build_context_tar(directory: PathBuf) -> Result<Vec<u8>, DockerError> {
    tokio::task::spawn_blocking(move || {
        let mut builder = tar::Builder::new(Vec::new());
        builder
            .append_dir_all(".", &directory)
            .map_err(|e| context_error(&directory, e))?;
        builder.into_inner().map_err(|e| context_error(&directory, e))
    })
    .await
    .map_err(|e| DockerError::ImageBuild(e.to_string()))?
}

fn context_error(directory: &Path, e: std::io::Error) -> DockerError {
    DockerError::ImageBuild(format!(
        "packaging build context from {}: {}",
        directory.display(),
        e
    ))
}

fn volume_bind(mount: &crate::config::VolumeMount) -> String {
    match &mount.options {
        Some(options) => format!("{}:{}:{}", mount.local, mount.container, options),
        None => format!("{}:{}", mount.local, mount.container),
    }
}

fn unique_container_name(container: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", container, &suffix[..8])
}

fn container_error(e: BollardError) -> DockerError {
    if let BollardError::DockerResponseServerError {
        status_code: 404, ..
    } = e
    {
        return DockerError::ContainerDoesNotExist;
    }

    DockerError::Container(e.to_string())
}
