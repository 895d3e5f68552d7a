// src/engine/manager.rs

//! The parallel execution manager.
//!
//! A single async event loop that alternates between planning and waiting
//! for the next event: plan, dispatch every ready step that is not already
//! in flight or completed, block on the event channel, append the received
//! event to the log, forward it to the UI sink, repeat. Workers are spawned
//! tokio tasks; the manager itself owns all scheduling state.
//!
//! After the run stage reaches a terminal the manager switches to the
//! cleanup planner over the same graph and event log. Cleanup runs on every
//! exit path, including interrupts.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::docker::ContainerDaemon;
use crate::engine::events::{EventLog, TaskEvent};
use crate::engine::planner::{cleanup, run, Terminal};
use crate::engine::runner::{EventSender, StepRunner};
use crate::engine::steps::{StepIdentity, TaskStep};
use crate::graph::ContainerGraph;
use crate::ui::EventSink;

const EVENT_CHANNEL_CAPACITY: usize = 64;

type EventReceiver = mpsc::Receiver<(StepIdentity, TaskEvent)>;

/// How the run stage ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStageOutcome {
    /// The task container exited; its code is the task's exit code.
    Succeeded { exit_code: i64 },
    /// A step failed, a container did not become healthy, or the task was
    /// interrupted.
    Failed { reason: String },
}

/// Spawn the Ctrl-C listener feeding the manager's interrupt channel.
///
/// The first interrupt abandons the run stage (cleanup still happens); a
/// second one during cleanup aborts hard.
pub fn spawn_interrupt_listener() -> watch::Receiver<u32> {
    let (tx, rx) = watch::channel(0u32);

    tokio::spawn(async move {
        let mut count = 0u32;

        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }

            count += 1;

            if tx.send(count).is_err() {
                return;
            }
        }
    });

    rx
}

pub struct ExecutionManager {
    graph: Arc<ContainerGraph>,
    runner: Arc<StepRunner>,
    log: Arc<EventLog>,
    sink: Arc<dyn EventSink>,
    task_name: String,
    in_flight: HashSet<StepIdentity>,
    completed: HashSet<StepIdentity>,
    interrupts: watch::Receiver<u32>,
    interrupts_closed: bool,
}

impl ExecutionManager {
    pub fn new(
        graph: Arc<ContainerGraph>,
        daemon: Arc<dyn ContainerDaemon>,
        sink: Arc<dyn EventSink>,
        project_name: &str,
        task_name: &str,
        interrupts: watch::Receiver<u32>,
    ) -> Self {
        let network_name = format!("{}-task-{}", project_name, random_suffix());
        let runner = Arc::new(StepRunner::new(
            daemon,
            Arc::clone(&graph),
            project_name,
            &network_name,
        ));

        Self {
            graph,
            runner,
            log: Arc::new(EventLog::new()),
            sink,
            task_name: task_name.to_string(),
            in_flight: HashSet::new(),
            completed: HashSet::new(),
            interrupts,
            interrupts_closed: false,
        }
    }

    /// The log this run posts into; useful for inspecting a finished run.
    pub fn event_log(&self) -> Arc<EventLog> {
        Arc::clone(&self.log)
    }

    /// Run the task to completion, cleanup included.
    ///
    /// Returns the task container's exit code, or -1 if the task failed
    /// before the container reported one.
    pub async fn execute(mut self) -> i64 {
        self.sink.task_starting(&self.task_name);

        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let outcome = self.run_stage(&tx, &mut rx).await;
        self.cleanup_stage(&tx, &mut rx, &outcome).await;

        match outcome {
            RunStageOutcome::Succeeded { exit_code } => exit_code,
            RunStageOutcome::Failed { .. } => -1,
        }
    }

    async fn run_stage(&mut self, tx: &EventSender, rx: &mut EventReceiver) -> RunStageOutcome {
        loop {
            let events = self.log.snapshot();
            let plan = run::plan(&self.graph, &events);

            match plan.terminal {
                Terminal::Success => {
                    let root = self.graph.root_name();

                    let exited = self.log.filter(|event| {
                        matches!(
                            event,
                            TaskEvent::RunningContainerExited { container, .. } if container == root
                        )
                    });

                    match exited.first() {
                        Some(TaskEvent::RunningContainerExited { exit_code, .. }) => {
                            return RunStageOutcome::Succeeded {
                                exit_code: *exit_code,
                            };
                        }
                        _ => panic!(
                            "run stage reported success but the task container never reported \
                             an exit status; this is a bug"
                        ),
                    }
                }
                Terminal::Failure(reason) => {
                    info!(task = %self.task_name, %reason, "run stage failed");
                    self.drain_in_flight(rx).await;
                    return RunStageOutcome::Failed { reason };
                }
                Terminal::None => {}
            }

            if self.interrupt_count() >= 1 {
                info!(task = %self.task_name, "interrupt received; abandoning the run stage");
                self.drain_in_flight(rx).await;
                return RunStageOutcome::Failed {
                    reason: "the task was interrupted".to_string(),
                };
            }

            self.dispatch(plan.ready, tx);

            if self.in_flight.is_empty() {
                panic!(
                    "execution stalled: nothing is ready, nothing is in flight and the stage \
                     is not terminal; this is a bug"
                );
            }

            self.await_event(rx).await;
        }
    }

    async fn cleanup_stage(
        &mut self,
        tx: &EventSender,
        rx: &mut EventReceiver,
        outcome: &RunStageOutcome,
    ) {
        let failure_reason = match outcome {
            RunStageOutcome::Failed { reason } => Some(reason.as_str()),
            RunStageOutcome::Succeeded { .. } => None,
        };

        loop {
            if self.interrupt_count() >= 2 {
                warn!(task = %self.task_name, "second interrupt received; abandoning cleanup");

                let commands = cleanup::manual_cleanup_commands(&self.log.snapshot());
                let reason = failure_reason.unwrap_or("the task was interrupted");
                let summary = cleanup::failure_summary(Some(reason), &commands);
                self.sink.task_failed(&self.task_name, &summary);
                return;
            }

            let events = self.log.snapshot();
            let plan = cleanup::plan(&self.graph, &events, failure_reason);

            let mut outstanding = Vec::new();

            for step in plan.ready {
                if step.is_inline() {
                    self.run_inline(step);
                } else {
                    outstanding.push(step);
                }
            }

            self.dispatch(outstanding, tx);

            if plan.terminal == Terminal::Success {
                return;
            }

            if self.in_flight.is_empty() {
                panic!(
                    "cleanup stalled: nothing is ready, nothing is in flight and the stage \
                     is not terminal; this is a bug"
                );
            }

            self.await_event(rx).await;
        }
    }

    /// Submit every ready step that is not already in flight or completed.
    /// Returns how many were newly dispatched.
    fn dispatch(&mut self, ready: Vec<TaskStep>, tx: &EventSender) -> usize {
        let mut dispatched = 0;

        for step in ready {
            let identity = step.identity();

            if self.in_flight.contains(&identity) || self.completed.contains(&identity) {
                continue;
            }

            self.sink.step_starting(&step);
            self.in_flight.insert(identity.clone());
            dispatched += 1;

            let runner = Arc::clone(&self.runner);
            let tx = tx.clone();

            tokio::spawn(async move {
                runner.run(step, identity, tx).await;
            });
        }

        dispatched
    }

    /// Steps that produce no events run on the manager itself.
    fn run_inline(&mut self, step: TaskStep) {
        let identity = step.identity();

        if self.completed.contains(&identity) {
            return;
        }

        self.completed.insert(identity);

        match step {
            TaskStep::DisplayTaskFailure { instructions } => {
                self.sink.task_failed(&self.task_name, &instructions);
            }
            TaskStep::FinishTask => {
                debug!(task = %self.task_name, "task finished");
            }
            other => {
                panic!("step '{other}' cannot run inline; this is a bug");
            }
        }
    }

    /// Block until the next event (or an interrupt) arrives, then record it.
    async fn await_event(&mut self, rx: &mut EventReceiver) {
        let received = if self.interrupts_closed {
            rx.recv().await
        } else {
            tokio::select! {
                changed = self.interrupts.changed() => {
                    if changed.is_err() {
                        self.interrupts_closed = true;
                    }

                    // Re-plan; the interrupt count is read at the loop top.
                    return;
                }
                received = rx.recv() => received,
            }
        };

        match received {
            Some((identity, event)) => self.record(identity, event),
            None => panic!("event channel closed while steps were in flight; this is a bug"),
        }
    }

    /// Wait for every in-flight step to post its terminal event. No new
    /// steps are dispatched while draining. A second interrupt gives up on
    /// the wait; the cleanup stage then aborts hard.
    async fn drain_in_flight(&mut self, rx: &mut EventReceiver) {
        while !self.in_flight.is_empty() && self.interrupt_count() < 2 {
            self.await_event(rx).await;
        }
    }

    /// Append the event to the log and forward it to the UI sink, in that
    /// order, before any further dispatching.
    fn record(&mut self, identity: StepIdentity, event: TaskEvent) {
        let is_progress = matches!(event, TaskEvent::ImageBuildProgress { .. });

        if !is_progress {
            self.in_flight.remove(&identity);
            self.completed.insert(identity);
        }

        self.log.post(event.clone());
        self.sink.event_posted(&event);
    }

    fn interrupt_count(&self) -> u32 {
        *self.interrupts.borrow()
    }
}

fn random_suffix() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}
