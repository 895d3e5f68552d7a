// src/errors.rs

//! Crate-wide error types.
//!
//! Most application plumbing uses `anyhow` with context attached at I/O
//! boundaries; the configuration layer gets a structured error enum because
//! callers (and tests) need to distinguish the individual failure modes.

use std::path::PathBuf;

pub use anyhow::{Error, Result};
use thiserror::Error;

/// Everything that can be wrong with a configuration before any container
/// work starts. All of these surface with a non-zero exit and no cleanup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file at {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing YAML config from {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("`project_name` must not be empty")]
    EmptyProjectName,

    #[error("container '{container}' must specify exactly one of `image` or `build_directory`")]
    InvalidImageSource { container: String },

    #[error("container '{container}' has unknown dependency '{dependency}'")]
    UnknownContainerDependency {
        container: String,
        dependency: String,
    },

    #[error("container '{container}' cannot depend on itself")]
    SelfDependency { container: String },

    #[error("container dependency cycle: {cycle}")]
    DependencyCycle { cycle: String },

    #[error("task '{task}' runs unknown container '{container}'")]
    UnknownRunContainer { task: String, container: String },

    #[error("task '{task}' has unknown dependency container '{dependency}'")]
    UnknownTaskDependency { task: String, dependency: String },

    #[error("task '{task}' has unknown prerequisite '{prerequisite}'")]
    UnknownPrerequisite { task: String, prerequisite: String },

    #[error("prerequisite cycle: {cycle}")]
    PrerequisiteCycle { cycle: String },

    #[error("there is no task named '{task}'")]
    UnknownTask { task: String },

    #[error("invalid command `{command}` for {owner}: unbalanced quoting")]
    InvalidCommand { owner: String, command: String },

    #[error(
        "environment variable '{variable}' referenced by container '{container}' is not set on the host"
    )]
    MissingHostVariable { container: String, variable: String },
}
