// src/ui/fancy.rs

//! Interactive progress output: one spinner per container, with a state
//! line derived from the event stream.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::engine::{TaskEvent, TaskStep};
use crate::graph::{ContainerGraph, ImageSource};
use crate::ui::EventSink;

const TICK_INTERVAL: Duration = Duration::from_millis(100);

struct ContainerLine {
    bar: ProgressBar,
    pulls: Option<String>,
}

pub struct FancyEventSink {
    multi: MultiProgress,
    lines: Mutex<HashMap<String, ContainerLine>>,
    /// Set once the task container starts running; from then on its I/O
    /// owns the terminal and the bars stay out of the way.
    cleared: Mutex<bool>,
}

impl FancyEventSink {
    pub fn new(graph: &ContainerGraph, no_color: bool) -> Self {
        let multi = MultiProgress::new();
        let mut lines = HashMap::new();

        let template = if no_color {
            "{spinner} {prefix}: {msg}"
        } else {
            "{spinner:.green} {prefix:.bold}: {msg}"
        };

        let style = ProgressStyle::default_spinner()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let mut names: Vec<&str> = graph.nodes().map(|n| n.name.as_str()).collect();
        names.sort_unstable();

        for name in names {
            let node = match graph.node(name) {
                Some(node) => node,
                None => continue,
            };

            let bar = multi.add(ProgressBar::new_spinner());
            bar.set_style(style.clone());
            bar.set_prefix(name.to_string());
            bar.enable_steady_tick(TICK_INTERVAL);

            let (message, pulls) = match &node.image_source {
                ImageSource::Build(_) => ("ready to build image".to_string(), None),
                ImageSource::Pull(reference) => (
                    format!("ready to pull '{reference}'"),
                    Some(reference.clone()),
                ),
            };

            bar.set_message(message);

            lines.insert(
                name.to_string(),
                ContainerLine { bar, pulls },
            );
        }

        Self {
            multi,
            lines: Mutex::new(lines),
            cleared: Mutex::new(false),
        }
    }

    fn set_message(&self, container: &str, message: String) {
        if *self.cleared.lock().expect("ui state mutex poisoned") {
            return;
        }

        let lines = self.lines.lock().expect("ui state mutex poisoned");

        if let Some(line) = lines.get(container) {
            line.bar.set_message(message);
        }
    }

    /// Update every container that pulls `reference`.
    fn set_message_for_pull(&self, reference: &str, message: &str) {
        if *self.cleared.lock().expect("ui state mutex poisoned") {
            return;
        }

        let lines = self.lines.lock().expect("ui state mutex poisoned");

        for line in lines.values() {
            if line.pulls.as_deref() == Some(reference) {
                line.bar.set_message(message.to_string());
            }
        }
    }

    fn clear_all(&self) {
        let mut cleared = self.cleared.lock().expect("ui state mutex poisoned");

        if *cleared {
            return;
        }

        *cleared = true;

        let lines = self.lines.lock().expect("ui state mutex poisoned");

        for line in lines.values() {
            line.bar.finish_and_clear();
        }

        let _ = self.multi.clear();
    }
}

impl EventSink for FancyEventSink {
    fn task_starting(&self, task: &str) {
        let _ = self.multi.println(format!("Running task '{task}'..."));
    }

    fn step_starting(&self, step: &TaskStep) {
        match step {
            TaskStep::BuildImage { container } => {
                self.set_message(container, "building image".to_string());
            }
            TaskStep::PullImage { reference } => {
                self.set_message_for_pull(reference, "pulling image");
            }
            TaskStep::CreateContainer { container, .. } => {
                self.set_message(container, "creating container".to_string());
            }
            TaskStep::StartContainer { container, .. } => {
                self.set_message(container, "starting".to_string());
            }
            TaskStep::WaitForContainerToBecomeHealthy { container, .. } => {
                self.set_message(container, "started, waiting to become healthy".to_string());
            }
            TaskStep::RunContainer { .. } => {
                // The task container's I/O takes over the terminal.
                self.clear_all();
            }
            _ => {}
        }
    }

    fn event_posted(&self, event: &TaskEvent) {
        match event {
            TaskEvent::ImageBuildProgress {
                container,
                progress,
            } => {
                self.set_message(container, format!("building image: {progress}"));
            }
            TaskEvent::ImageBuilt { container, .. } => {
                self.set_message(container, "image ready, waiting for the task network".to_string());
            }
            TaskEvent::ImagePulled { reference, .. } => {
                self.set_message_for_pull(reference, "image ready, waiting for the task network");
            }
            TaskEvent::TaskNetworkCreated { .. } => {
                let lines = self.lines.lock().expect("ui state mutex poisoned");

                for line in lines.values() {
                    line.bar.tick();
                }
            }
            TaskEvent::ContainerCreated { container, .. } => {
                self.set_message(container, "waiting for dependencies".to_string());
            }
            TaskEvent::ContainerBecameHealthy { container } => {
                self.set_message(container, "running and healthy".to_string());
            }
            TaskEvent::RunningContainerExited { .. } => {
                self.clear_all();
            }
            failure if failure.is_failure() => {
                self.clear_all();
                let _ = self.multi.println(format!("{failure}"));
            }
            _ => {}
        }
    }

    fn task_failed(&self, task: &str, details: &str) {
        self.clear_all();
        eprintln!();
        eprintln!("Task '{task}' failed.");
        eprintln!("{details}");
    }
}
