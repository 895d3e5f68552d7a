// src/graph/order.rs

use std::collections::HashSet;

use crate::config::model::ConfigFile;
use crate::errors::ConfigError;

/// Expand a task's prerequisites into the order the runner executes.
///
/// Returns `[p1, p2, ..., pn, target]` where the `p_i` are the recursive
/// expansion of `prerequisites` in left-to-right, depth-first order,
/// deduplicated on first encounter. A task that appears on its own
/// prerequisite path is a cycle and fails with the full path named.
pub fn resolve_execution_order(cfg: &ConfigFile, target: &str) -> Result<Vec<String>, ConfigError> {
    if !cfg.tasks.contains_key(target) {
        return Err(ConfigError::UnknownTask {
            task: target.to_string(),
        });
    }

    let mut order = Vec::new();
    let mut done = HashSet::new();
    let mut path = Vec::new();

    visit(cfg, target, &mut order, &mut done, &mut path)?;

    Ok(order)
}

fn visit(
    cfg: &ConfigFile,
    name: &str,
    order: &mut Vec<String>,
    done: &mut HashSet<String>,
    path: &mut Vec<String>,
) -> Result<(), ConfigError> {
    if done.contains(name) {
        return Ok(());
    }

    if let Some(start) = path.iter().position(|n| n == name) {
        let mut cycle: Vec<&str> = path[start..].iter().map(String::as_str).collect();
        cycle.push(name);

        return Err(ConfigError::PrerequisiteCycle {
            cycle: cycle.join(" -> "),
        });
    }

    let task = match cfg.tasks.get(name) {
        Some(task) => task,
        None => {
            // The referencing task is the last entry on the path.
            let referrer = path.last().cloned().unwrap_or_default();
            return Err(ConfigError::UnknownPrerequisite {
                task: referrer,
                prerequisite: name.to_string(),
            });
        }
    };

    path.push(name.to_string());

    for prereq in task.prerequisites.iter() {
        visit(cfg, prereq, order, done, path)?;
    }

    path.pop();
    done.insert(name.to_string());
    order.push(name.to_string());

    Ok(())
}
