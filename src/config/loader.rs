// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::ConfigFile;
use crate::config::validate::validate_config;
use crate::errors::ConfigError;

/// Load a configuration file from a given path and return the raw
/// `ConfigFile`.
///
/// This only performs YAML deserialization; it does **not** perform semantic
/// validation (reference resolution etc.). Use [`load_and_validate`] for
/// that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile, ConfigError> {
    let path = path.as_ref();
    let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: resolved.clone(),
        source,
    })?;

    let config: ConfigFile =
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: resolved,
            source,
        })?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads YAML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - a non-empty project name,
///   - exactly one image source per container,
///   - unknown container / dependency / prerequisite references,
///   - use of the deprecated `start` alias (warning only).
///
/// Cycle detection is deliberately **not** done here: the container graph
/// and the prerequisite resolver both report cycles with the full offending
/// path, which this layer cannot do container-by-container.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile, ConfigError> {
    let config = load_from_path(&path)?;
    validate_config(&config)?;
    Ok(config)
}

/// The default config file name looked for in the current directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("batect.yml")
}
