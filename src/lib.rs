// src/lib.rs

pub mod cli;
pub mod config;
pub mod docker;
pub mod engine;
pub mod errors;
pub mod graph;
pub mod logging;
pub mod ui;

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::docker::{ContainerDaemon, DockerDaemon};
use crate::engine::{spawn_interrupt_listener, ExecutionManager};
use crate::errors::ConfigError;
use crate::graph::{resolve_execution_order, ContainerGraph};
use crate::ui::{EventSink, FancyEventSink, QuietEventSink, SimpleEventSink};

/// Output-related options shared by every task in a `run` invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub quiet: bool,
    pub simple_output: bool,
    pub no_color: bool,
}

impl OutputOptions {
    fn from_args(args: &CliArgs) -> Self {
        Self {
            quiet: args.quiet,
            simple_output: args.simple_output,
            no_color: args.no_color,
        }
    }
}

/// High-level entry point used by `main.rs`.
///
/// Returns the process exit code: the task container's exit code for `run`
/// (1 if the task failed before its container exited), 0 for `tasks`.
pub async fn run(args: CliArgs) -> Result<i32> {
    match &args.command {
        Command::Tasks => {
            let cfg = load_and_validate(&args.config_file)?;
            print!("{}", format_task_list(&cfg));
            Ok(0)
        }

        Command::Upgrade => {
            eprintln!(
                "This build cannot upgrade itself; download the latest release and replace the binary."
            );
            Ok(1)
        }

        Command::Run { task } => {
            let cfg = load_and_validate(&args.config_file)?;
            let order = resolve_execution_order(&cfg, task)?;

            debug!(?order, "resolved task execution order");

            let daemon: Arc<dyn ContainerDaemon> =
                Arc::new(DockerDaemon::connect().context("connecting to the container daemon")?);
            let interrupts = spawn_interrupt_listener();

            let exit_code = execute_task_sequence(
                &cfg,
                &order,
                daemon,
                OutputOptions::from_args(&args),
                interrupts,
            )
            .await?;

            Ok(exit_code)
        }
    }
}

/// Run each task in `order`, short-circuiting on the first non-zero exit
/// code. The last task in the order is the one the user asked for.
pub async fn execute_task_sequence(
    cfg: &ConfigFile,
    order: &[String],
    daemon: Arc<dyn ContainerDaemon>,
    options: OutputOptions,
    interrupts: watch::Receiver<u32>,
) -> Result<i32> {
    for name in order {
        let task = cfg
            .tasks
            .get(name)
            .ok_or_else(|| ConfigError::UnknownTask { task: name.clone() })?;

        let graph = Arc::new(ContainerGraph::resolve(cfg, name, task)?);
        let sink = make_sink(options, &graph);

        let manager = ExecutionManager::new(
            Arc::clone(&graph),
            Arc::clone(&daemon),
            sink,
            &cfg.project_name,
            name,
            interrupts.clone(),
        );

        let exit_code = manager.execute().await;

        info!(task = %name, exit_code, "task finished");

        if exit_code != 0 {
            return Ok(process_exit_code(exit_code));
        }
    }

    Ok(0)
}

/// Map an engine exit code to a process exit status: the engine reports a
/// task that failed outright as -1, which has no representation in an
/// unsigned 8-bit exit status.
fn process_exit_code(engine_code: i64) -> i32 {
    if (0..=255).contains(&engine_code) {
        engine_code as i32
    } else {
        1
    }
}

fn make_sink(options: OutputOptions, graph: &ContainerGraph) -> Arc<dyn EventSink> {
    if options.quiet {
        Arc::new(QuietEventSink)
    } else if options.simple_output {
        Arc::new(SimpleEventSink)
    } else {
        Arc::new(FancyEventSink::new(graph, options.no_color))
    }
}

/// One line per configured task, sorted by name.
pub fn format_task_list(cfg: &ConfigFile) -> String {
    let mut out = String::new();

    for (name, task) in cfg.tasks.iter() {
        match &task.description {
            Some(description) => {
                let _ = writeln!(out, "- {name}: {description}");
            }
            None => {
                let _ = writeln!(out, "- {name}");
            }
        }
    }

    out
}
