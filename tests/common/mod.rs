// tests/common/mod.rs

//! Shared test harness: an in-memory container daemon with scriptable
//! per-container behaviour, a recording event sink, and config builders.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use dockhand::config::{ConfigFile, ContainerConfig, TaskConfig, TaskRunConfig};
use dockhand::docker::{
    BuildProgressSender, ContainerDaemon, ContainerHandle, DockerError, HealthStatus, ImageId,
    NetworkHandle,
};
use dockhand::engine::{ExecutionManager, TaskEvent, TaskStep};
use dockhand::graph::{ContainerGraph, ContainerNode};
use dockhand::ui::EventSink;

#[derive(Debug, Clone)]
pub struct ContainerBehaviour {
    pub health: HealthStatus,
    pub health_delay: Option<Duration>,
    pub exit_code: i64,
    pub fail_create: bool,
    pub fail_start: bool,
    pub fail_stop: bool,
    pub fail_remove: bool,
}

impl Default for ContainerBehaviour {
    fn default() -> Self {
        Self {
            health: HealthStatus::NoHealthCheck,
            health_delay: None,
            exit_code: 0,
            fail_create: false,
            fail_start: false,
            fail_stop: false,
            fail_remove: false,
        }
    }
}

/// In-memory daemon. Handles encode the container name so later operations
/// can look their behaviour up again; every call is journalled.
#[derive(Default)]
pub struct FakeDaemon {
    journal: Mutex<Vec<String>>,
    behaviours: Mutex<HashMap<String, ContainerBehaviour>>,
    failing_pulls: Mutex<Vec<String>>,
}

impl FakeDaemon {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_behaviour(&self, container: &str, behaviour: ContainerBehaviour) {
        self.behaviours
            .lock()
            .unwrap()
            .insert(container.to_string(), behaviour);
    }

    pub fn fail_pulls_of(&self, reference: &str) {
        self.failing_pulls
            .lock()
            .unwrap()
            .push(reference.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    pub fn called(&self, entry: &str) -> bool {
        self.calls().iter().any(|c| c == entry)
    }

    fn log(&self, entry: String) {
        self.journal.lock().unwrap().push(entry);
    }

    fn behaviour(&self, container: &str) -> ContainerBehaviour {
        self.behaviours
            .lock()
            .unwrap()
            .get(container)
            .cloned()
            .unwrap_or_default()
    }

    fn container_of(handle: &ContainerHandle) -> String {
        handle
            .0
            .strip_prefix("ctr-")
            .unwrap_or(&handle.0)
            .to_string()
    }
}

#[async_trait]
impl ContainerDaemon for FakeDaemon {
    async fn build_image(
        &self,
        _project_name: &str,
        node: &ContainerNode,
        progress: BuildProgressSender,
    ) -> Result<ImageId, DockerError> {
        self.log(format!("build {}", node.name));
        let _ = progress.send("Step 1/1 : FROM scratch".to_string());
        Ok(ImageId(format!("img-{}", node.name)))
    }

    async fn pull_image(&self, reference: &str) -> Result<ImageId, DockerError> {
        self.log(format!("pull {reference}"));

        if self.failing_pulls.lock().unwrap().iter().any(|r| r == reference) {
            return Err(DockerError::ImagePull(format!(
                "no such image: {reference}"
            )));
        }

        Ok(ImageId(format!("img-{reference}")))
    }

    async fn create_network(&self, name: &str) -> Result<NetworkHandle, DockerError> {
        self.log(format!("create-network {name}"));
        Ok(NetworkHandle("net-1".to_string()))
    }

    async fn delete_network(&self, network: &NetworkHandle) -> Result<(), DockerError> {
        self.log(format!("delete-network {network}"));
        Ok(())
    }

    async fn create_container(
        &self,
        node: &ContainerNode,
        _command: Option<&[String]>,
        _image: &ImageId,
        _network: &NetworkHandle,
    ) -> Result<ContainerHandle, DockerError> {
        if self.behaviour(&node.name).fail_create {
            return Err(DockerError::ContainerCreation(format!(
                "cannot create '{}'",
                node.name
            )));
        }

        self.log(format!("create {}", node.name));
        Ok(ContainerHandle(format!("ctr-{}", node.name)))
    }

    async fn start_container(&self, handle: &ContainerHandle) -> Result<(), DockerError> {
        let container = Self::container_of(handle);

        if self.behaviour(&container).fail_start {
            return Err(DockerError::Container(format!(
                "cannot start '{container}'"
            )));
        }

        self.log(format!("start {container}"));
        Ok(())
    }

    async fn run_container(&self, handle: &ContainerHandle) -> Result<i64, DockerError> {
        let container = Self::container_of(handle);
        self.log(format!("run {container}"));
        Ok(self.behaviour(&container).exit_code)
    }

    async fn wait_for_health(&self, handle: &ContainerHandle) -> Result<HealthStatus, DockerError> {
        let container = Self::container_of(handle);
        let behaviour = self.behaviour(&container);

        if let Some(delay) = behaviour.health_delay {
            tokio::time::sleep(delay).await;
        }

        self.log(format!("wait-healthy {container}"));
        Ok(behaviour.health)
    }

    async fn stop_container(&self, handle: &ContainerHandle) -> Result<(), DockerError> {
        let container = Self::container_of(handle);

        if self.behaviour(&container).fail_stop {
            return Err(DockerError::Container(format!("cannot stop '{container}'")));
        }

        self.log(format!("stop {container}"));
        Ok(())
    }

    async fn remove_container(&self, handle: &ContainerHandle) -> Result<(), DockerError> {
        let container = Self::container_of(handle);

        if self.behaviour(&container).fail_remove {
            return Err(DockerError::Container(format!(
                "cannot remove '{container}'"
            )));
        }

        self.log(format!("remove {container}"));
        Ok(())
    }

    async fn forcibly_remove_container(
        &self,
        handle: &ContainerHandle,
    ) -> Result<(), DockerError> {
        let container = Self::container_of(handle);

        if self.behaviour(&container).fail_remove {
            return Err(DockerError::Container(format!(
                "cannot remove '{container}'"
            )));
        }

        self.log(format!("force-remove {container}"));
        Ok(())
    }
}

/// Captures everything the engine tells the UI.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<TaskEvent>>,
    pub steps: Mutex<Vec<String>>,
    pub failures: Mutex<Vec<String>>,
}

impl EventSink for RecordingSink {
    fn task_starting(&self, _task: &str) {}

    fn step_starting(&self, step: &TaskStep) {
        self.steps.lock().unwrap().push(step.to_string());
    }

    fn event_posted(&self, event: &TaskEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn task_failed(&self, _task: &str, details: &str) {
        self.failures.lock().unwrap().push(details.to_string());
    }
}

pub fn pulled_container(image: &str) -> ContainerConfig {
    ContainerConfig {
        image: Some(image.to_string()),
        ..Default::default()
    }
}

pub fn built_container(directory: &str) -> ContainerConfig {
    ContainerConfig {
        build_directory: Some(directory.into()),
        ..Default::default()
    }
}

pub fn task_running(container: &str) -> TaskConfig {
    TaskConfig {
        description: None,
        run: TaskRunConfig {
            container: container.to_string(),
            command: None,
            environment: BTreeMap::new(),
            ports: Vec::new(),
        },
        dependencies: Vec::new(),
        prerequisites: Vec::new(),
    }
}

pub fn config(
    project: &str,
    containers: Vec<(&str, ContainerConfig)>,
    tasks: Vec<(&str, TaskConfig)>,
) -> ConfigFile {
    ConfigFile {
        project_name: project.to_string(),
        containers: containers
            .into_iter()
            .map(|(name, c)| (name.to_string(), c))
            .collect(),
        tasks: tasks
            .into_iter()
            .map(|(name, t)| (name.to_string(), t))
            .collect(),
    }
}

/// Drive one task through the whole engine against the fake daemon.
///
/// Returns the exit code, the full event log and the recording sink.
pub async fn execute_single_task(
    cfg: &ConfigFile,
    task_name: &str,
    daemon: Arc<FakeDaemon>,
) -> (i64, Vec<TaskEvent>, Arc<RecordingSink>) {
    let task = cfg.tasks.get(task_name).expect("task not configured");
    let graph =
        Arc::new(ContainerGraph::resolve(cfg, task_name, task).expect("graph should resolve"));

    let sink = Arc::new(RecordingSink::default());
    let (_interrupt_tx, interrupt_rx) = watch::channel(0u32);

    let manager = ExecutionManager::new(
        graph,
        daemon,
        Arc::clone(&sink) as Arc<dyn EventSink>,
        &cfg.project_name,
        task_name,
        interrupt_rx,
    );

    let log = manager.event_log();
    let exit_code = manager.execute().await;

    (exit_code, log.snapshot(), sink)
}

/// Index of the first event matching `predicate`, or a panic naming the
/// expectation.
pub fn index_of(events: &[TaskEvent], description: &str, predicate: impl Fn(&TaskEvent) -> bool) -> usize {
    events
        .iter()
        .position(predicate)
        .unwrap_or_else(|| panic!("no event matching: {description}\nevents: {events:#?}"))
}
