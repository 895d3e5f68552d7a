// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the YAML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate references and structural invariants (`validate.rs`).
//! - Resolve host environment variable references (`environment.rs`).

pub mod environment;
pub mod loader;
pub mod model;
pub mod validate;

pub use environment::resolve_host_references;
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, ContainerConfig, PortMapping, TaskConfig, TaskRunConfig, VolumeMount,
};
pub use validate::validate_config;
