// src/ui/mod.rs

//! UI event sinks.
//!
//! The execution manager forwards every posted event through a sink in
//! posting order; sinks must tolerate any event interleaving consistent
//! with the dependency graph. Each task run gets its own sink instance;
//! there is no process-wide output singleton.

pub mod fancy;
pub mod simple;

use crate::engine::{TaskEvent, TaskStep};

/// Consumer of the engine's progress stream.
pub trait EventSink: Send + Sync {
    fn task_starting(&self, task: &str);

    fn step_starting(&self, step: &TaskStep);

    fn event_posted(&self, event: &TaskEvent);

    /// The task failed, or cleanup left resources behind; `details`
    /// includes any manual cleanup commands.
    fn task_failed(&self, task: &str, details: &str);
}

pub use fancy::FancyEventSink;
pub use simple::{QuietEventSink, SimpleEventSink};
