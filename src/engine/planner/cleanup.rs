// src/engine/planner/cleanup.rs

//! The cleanup-stage planner: undo whatever the run stage did, driven by
//! the same event log.
//!
//! Cleanup runs on every exit path. On the success branch containers are
//! removed politely; on the failure branch they are forcibly cleaned up
//! (tolerant of already being gone). The network goes last, once every
//! created container is accounted for.

use crate::engine::events::TaskEvent;
use crate::engine::planner::{EventFacts, PlanResult, Terminal};
use crate::engine::steps::TaskStep;
use crate::graph::ContainerGraph;

/// Decide what cleanup work may run now.
///
/// `failure_reason` is the run stage's failure, if any; it selects the
/// forcible-removal branch and is included in the final failure display.
pub fn plan(
    _graph: &ContainerGraph,
    events: &[TaskEvent],
    failure_reason: Option<&str>,
) -> PlanResult {
    let facts = EventFacts::scan(events);

    let mut ready = Vec::new();
    let mut all_containers_accounted = true;

    for (&name, &handle) in facts.created.iter() {
        if facts.removed.contains(name) || facts.removal_failed.contains(name) {
            continue;
        }

        all_containers_accounted = false;

        let running = facts.started.contains(name)
            && !facts.exited.contains_key(name)
            && !facts.stopped.contains(name)
            && !facts.stop_failed.contains(name);

        if running {
            ready.push(TaskStep::StopContainer {
                container: name.to_string(),
                handle: handle.clone(),
            });
            continue;
        }

        if failure_reason.is_some() {
            ready.push(TaskStep::CleanUpContainer {
                container: name.to_string(),
                handle: handle.clone(),
            });
        } else {
            ready.push(TaskStep::RemoveContainer {
                container: name.to_string(),
                handle: handle.clone(),
            });
        }
    }

    if !all_containers_accounted {
        return PlanResult {
            ready,
            terminal: Terminal::None,
        };
    }

    if let Some(network) = facts.network {
        if !facts.network_deleted && !facts.network_deletion_failed {
            ready.push(TaskStep::DeleteTaskNetwork {
                network: network.clone(),
            });

            return PlanResult {
                ready,
                terminal: Terminal::None,
            };
        }
    }

    // Everything is accounted for; finish the stage. The same plan that
    // signals terminal carries the final (inline) steps.
    let commands = manual_cleanup_commands(events);

    if failure_reason.is_some() || !commands.is_empty() {
        ready.push(TaskStep::DisplayTaskFailure {
            instructions: failure_summary(failure_reason, &commands),
        });
    }

    ready.push(TaskStep::FinishTask);

    PlanResult {
        ready,
        terminal: Terminal::Success,
    }
}

/// Daemon commands the user can run by hand for anything cleanup could not
/// (or did not get to) remove.
pub fn manual_cleanup_commands(events: &[TaskEvent]) -> Vec<String> {
    let facts = EventFacts::scan(events);
    let mut commands = Vec::new();

    for (&name, &handle) in facts.created.iter() {
        if !facts.removed.contains(name) {
            commands.push(format!("docker rm --force {handle}  # container '{name}'"));
        }
    }

    if let Some(network) = facts.network {
        if !facts.network_deleted {
            commands.push(format!("docker network rm {network}"));
        }
    }

    commands
}

/// Human-readable failure text: the reason (if the run stage failed),
/// followed by any manual cleanup commands.
pub fn failure_summary(reason: Option<&str>, commands: &[String]) -> String {
    let mut lines = Vec::new();

    match reason {
        Some(reason) => lines.push(format!("The task failed: {reason}.")),
        None => lines.push("The task did not clean up after itself completely.".to_string()),
    }

    if !commands.is_empty() {
        lines.push(String::new());
        lines.push("You may need to run the following to clean up leftover resources:".to_string());

        for command in commands {
            lines.push(format!("  {command}"));
        }
    }

    lines.join("\n")
}
