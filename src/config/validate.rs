// src/config/validate.rs

use tracing::warn;

use crate::config::model::{ConfigFile, ContainerConfig};
use crate::errors::ConfigError;

/// Run semantic validation against a loaded configuration.
///
/// This checks:
/// - `project_name` is non-empty
/// - every container declares exactly one of `image` / `build_directory`
/// - all container dependencies refer to existing containers and not to
///   the container itself
/// - every task's run container, dependencies and prerequisites resolve
///
/// It does **not** detect cycles; those are reported (with the full cycle
/// path) by graph construction and by the prerequisite order resolver.
pub fn validate_config(cfg: &ConfigFile) -> Result<(), ConfigError> {
    if cfg.project_name.trim().is_empty() {
        return Err(ConfigError::EmptyProjectName);
    }

    for (name, container) in cfg.containers.iter() {
        validate_image_source(name, container)?;
        validate_container_dependencies(cfg, name, container)?;
    }

    for (name, task) in cfg.tasks.iter() {
        if !cfg.containers.contains_key(&task.run.container) {
            return Err(ConfigError::UnknownRunContainer {
                task: name.clone(),
                container: task.run.container.clone(),
            });
        }

        for dep in task.dependencies.iter() {
            if !cfg.containers.contains_key(dep) {
                return Err(ConfigError::UnknownTaskDependency {
                    task: name.clone(),
                    dependency: dep.clone(),
                });
            }
        }

        for prereq in task.prerequisites.iter() {
            if !cfg.tasks.contains_key(prereq) {
                return Err(ConfigError::UnknownPrerequisite {
                    task: name.clone(),
                    prerequisite: prereq.clone(),
                });
            }
        }
    }

    Ok(())
}

fn validate_image_source(name: &str, container: &ContainerConfig) -> Result<(), ConfigError> {
    match (&container.image, &container.build_directory) {
        (Some(_), None) | (None, Some(_)) => Ok(()),
        _ => Err(ConfigError::InvalidImageSource {
            container: name.to_string(),
        }),
    }
}

fn validate_container_dependencies(
    cfg: &ConfigFile,
    name: &str,
    container: &ContainerConfig,
) -> Result<(), ConfigError> {
    if container.uses_deprecated_start_alias() {
        warn!(
            container = %name,
            "`start` is a deprecated alias of `dependencies`; the union of both lists is used"
        );
    }

    for dep in container.effective_dependencies() {
        if dep == name {
            return Err(ConfigError::SelfDependency {
                container: name.to_string(),
            });
        }

        if !cfg.containers.contains_key(&dep) {
            return Err(ConfigError::UnknownContainerDependency {
                container: name.to_string(),
                dependency: dep,
            });
        }
    }

    Ok(())
}
