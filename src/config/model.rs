// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration as read from a YAML file.
///
/// ```yaml
/// project_name: my-app
///
/// containers:
///   db:
///     image: postgres:16
///     environment:
///       POSTGRES_PASSWORD: secret
///
/// tasks:
///   test:
///     description: Run the test suite.
///     run:
///       container: build-env
///       command: ./gradlew test
///     dependencies: [db]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    /// Project name, used to prefix image tags, container names and the
    /// per-task network.
    pub project_name: String,

    /// All container definitions, keyed by container name.
    #[serde(default)]
    pub containers: BTreeMap<String, ContainerConfig>,

    /// All task definitions, keyed by task name.
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskConfig>,
}

/// A single entry under `containers`.
///
/// Exactly one of `image` and `build_directory` must be set; this is
/// enforced in `validate`, not at deserialization time, so the error can
/// name the offending container.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerConfig {
    /// Image reference to pull (e.g. `postgres:16`).
    #[serde(default)]
    pub image: Option<String>,

    /// Directory containing a Dockerfile to build instead of pulling.
    #[serde(default)]
    pub build_directory: Option<PathBuf>,

    /// Command to run, as a single shell-style string.
    ///
    /// If absent, the image's default command is used.
    #[serde(default)]
    pub command: Option<String>,

    /// Environment bindings. Values of the form `$NAME` or `${NAME}` are
    /// resolved from the host environment at task start.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    /// Working directory inside the container.
    #[serde(default)]
    pub working_directory: Option<String>,

    /// Volume mounts.
    #[serde(default)]
    pub volumes: Vec<VolumeMount>,

    /// Port mappings (host port -> container port).
    #[serde(default)]
    pub ports: Vec<PortMapping>,

    /// Containers that must be started and healthy before this one starts.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Deprecated alias of `dependencies`. When both keys are present, the
    /// effective set is the union and the loader emits a warning.
    #[serde(default)]
    pub start: Vec<String>,
}

impl ContainerConfig {
    /// The effective dependency set: `dependencies` unioned with the
    /// deprecated `start` key, preserving first-seen order.
    pub fn effective_dependencies(&self) -> Vec<String> {
        let mut deps = self.dependencies.clone();

        for name in &self.start {
            if !deps.contains(name) {
                deps.push(name.clone());
            }
        }

        deps
    }

    /// Returns true if the deprecated `start` key is in use alongside
    /// `dependencies`.
    pub fn uses_deprecated_start_alias(&self) -> bool {
        !self.start.is_empty()
    }
}

/// One entry under a container's `volumes` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VolumeMount {
    /// Path on the host.
    pub local: String,

    /// Path inside the container.
    pub container: String,

    /// Mount options (e.g. `ro`, `cached`).
    #[serde(default)]
    pub options: Option<String>,
}

/// One entry under a `ports` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PortMapping {
    /// Port on the host.
    pub local: u16,

    /// Port inside the container.
    pub container: u16,
}

/// A single entry under `tasks`.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Human-readable description, shown by the `tasks` subcommand.
    #[serde(default)]
    pub description: Option<String>,

    /// What to run.
    pub run: TaskRunConfig,

    /// Additional dependency containers beyond those declared on the run
    /// container itself.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Tasks to run to completion, in order, before this one.
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

/// The `run` section of a task.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRunConfig {
    /// The container this task runs in.
    pub container: String,

    /// Command override; takes precedence over the container's `command`.
    #[serde(default)]
    pub command: Option<String>,

    /// Additional environment bindings; win over the container's own
    /// bindings on conflict.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    /// Additional port mappings.
    #[serde(default)]
    pub ports: Vec<PortMapping>,
}
