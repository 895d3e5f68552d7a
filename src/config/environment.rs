// src/config/environment.rs

//! Host environment variable references in `environment` values.
//!
//! A value that is exactly `$NAME` or `${NAME}` is substituted from the
//! host environment when the task starts. Any other value is taken
//! literally. A reference to an unset variable aborts the task before any
//! container work happens.

use std::collections::BTreeMap;

use crate::errors::ConfigError;

/// Resolve all host references in an environment map.
///
/// `container` is only used for error reporting.
pub fn resolve_host_references(
    env: &BTreeMap<String, String>,
    container: &str,
) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut resolved = BTreeMap::new();

    for (name, value) in env.iter() {
        let value = match host_reference(value) {
            Some(variable) => {
                std::env::var(variable).map_err(|_| ConfigError::MissingHostVariable {
                    container: container.to_string(),
                    variable: variable.to_string(),
                })?
            }
            None => value.clone(),
        };

        resolved.insert(name.clone(), value);
    }

    Ok(resolved)
}

/// If `value` is a host environment reference, return the referenced
/// variable name.
fn host_reference(value: &str) -> Option<&str> {
    let rest = value.strip_prefix('$')?;

    let name = match rest.strip_prefix('{') {
        Some(inner) => inner.strip_suffix('}')?,
        None => rest,
    };

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    Some(name)
}
