// src/engine/planner/run.rs

//! The run-stage planner: from nothing-has-happened up to the task
//! container exiting (or the first failure).

use std::collections::HashSet;

use crate::docker::ImageId;
use crate::engine::events::TaskEvent;
use crate::engine::planner::{EventFacts, PlanResult, Terminal};
use crate::engine::steps::TaskStep;
use crate::graph::{ContainerGraph, ContainerNode, ImageSource};

/// Decide what may run now.
///
/// Per-container progression: not-started -> image-ready -> creatable
/// (image ready, network up, every dependency healthy) -> created ->
/// started -> healthy; the root goes created -> running -> exited instead.
/// A failure event freezes the container it concerns.
pub fn plan(graph: &ContainerGraph, events: &[TaskEvent]) -> PlanResult {
    let facts = EventFacts::scan(events);
    let root = graph.root_name();

    let terminal = if facts.exited.contains_key(root) {
        Terminal::Success
    } else if let Some(reason) = &facts.first_failure {
        Terminal::Failure(reason.clone())
    } else {
        Terminal::None
    };

    let mut ready = Vec::new();

    if !facts.task_started {
        ready.push(TaskStep::BeginTask);
        return PlanResult { ready, terminal };
    }

    if !facts.network_creation_attempted {
        ready.push(TaskStep::CreateTaskNetwork);
    }

    // Identical pull references collapse to one step.
    let mut pulls_planned = HashSet::new();

    for node in graph.nodes() {
        let name = node.name.as_str();

        if facts.failed_containers.contains(name) {
            continue;
        }

        match &node.image_source {
            ImageSource::Build(_) => {
                if !facts.built.contains_key(name) && !facts.build_failed.contains(name) {
                    ready.push(TaskStep::BuildImage {
                        container: name.to_string(),
                    });
                }
            }
            ImageSource::Pull(reference) => {
                if !facts.pulled.contains_key(reference.as_str())
                    && !facts.pull_failed.contains(reference.as_str())
                    && pulls_planned.insert(reference.as_str())
                {
                    ready.push(TaskStep::PullImage {
                        reference: reference.clone(),
                    });
                }
            }
        }

        let dependencies_healthy = graph
            .dependencies_of(name)
            .iter()
            .all(|dep| facts.healthy.contains(dep));

        match facts.created.get(name) {
            None => {
                let image = image_for(node, &facts);

                if let (Some(image), Some(network)) = (image, facts.network) {
                    if dependencies_healthy {
                        ready.push(TaskStep::CreateContainer {
                            container: name.to_string(),
                            command: node.command.clone(),
                            image: image.clone(),
                            network: network.clone(),
                        });
                    }
                }
            }
            Some(&handle) => {
                if name == root {
                    if dependencies_healthy && !facts.exited.contains_key(name) {
                        ready.push(TaskStep::RunContainer {
                            container: name.to_string(),
                            handle: handle.clone(),
                        });
                    }
                } else if !facts.started.contains(name) {
                    ready.push(TaskStep::StartContainer {
                        container: name.to_string(),
                        handle: handle.clone(),
                    });
                } else if !facts.healthy.contains(name) {
                    ready.push(TaskStep::WaitForContainerToBecomeHealthy {
                        container: name.to_string(),
                        handle: handle.clone(),
                    });
                }
            }
        }
    }

    PlanResult { ready, terminal }
}

fn image_for<'a>(node: &ContainerNode, facts: &EventFacts<'a>) -> Option<&'a ImageId> {
    match &node.image_source {
        ImageSource::Build(_) => facts.built.get(node.name.as_str()).copied(),
        ImageSource::Pull(reference) => facts.pulled.get(reference.as_str()).copied(),
    }
}
