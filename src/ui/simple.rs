// src/ui/simple.rs

use crate::engine::{TaskEvent, TaskStep};
use crate::ui::EventSink;

/// Line-at-a-time output, suitable for CI logs and non-TTY environments.
pub struct SimpleEventSink;

impl EventSink for SimpleEventSink {
    fn task_starting(&self, task: &str) {
        println!("Running task '{task}'...");
    }

    fn step_starting(&self, step: &TaskStep) {
        match step {
            // These produce their own event lines; echoing the step too
            // would double every line of output.
            TaskStep::BeginTask | TaskStep::DisplayTaskFailure { .. } | TaskStep::FinishTask => {}
            other => println!("> {other}"),
        }
    }

    fn event_posted(&self, event: &TaskEvent) {
        match event {
            TaskEvent::TaskStarted => {}
            TaskEvent::ImageBuildProgress {
                container,
                progress,
            } => println!("  [{container}] {progress}"),
            other => println!("{other}"),
        }
    }

    fn task_failed(&self, task: &str, details: &str) {
        eprintln!();
        eprintln!("Task '{task}' failed.");
        eprintln!("{details}");
    }
}

/// Drops everything except failures; used with `--quiet`. The task
/// container's own I/O still streams through untouched.
pub struct QuietEventSink;

impl EventSink for QuietEventSink {
    fn task_starting(&self, _task: &str) {}

    fn step_starting(&self, _step: &TaskStep) {}

    fn event_posted(&self, _event: &TaskEvent) {}

    fn task_failed(&self, task: &str, details: &str) {
        eprintln!("Task '{task}' failed.");
        eprintln!("{details}");
    }
}
