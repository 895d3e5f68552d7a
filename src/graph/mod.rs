// src/graph/mod.rs

//! Dependency graphs.
//!
//! - [`container_graph`] resolves the containers a task needs into an
//!   immutable DAG rooted at the task container, with effective command,
//!   environment and ports per node.
//! - [`order`] expands a task's prerequisites into the linear order the
//!   top-level runner executes.

pub mod container_graph;
pub mod order;

pub use container_graph::{ContainerGraph, ContainerNode, ImageSource};
pub use order::resolve_execution_order;
