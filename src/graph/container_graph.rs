// src/graph/container_graph.rs

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::config::environment::resolve_host_references;
use crate::config::model::{ConfigFile, PortMapping, TaskConfig, VolumeMount};
use crate::errors::ConfigError;

/// Where a container's image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Build the image from a directory containing a Dockerfile.
    Build(PathBuf),
    /// Pull the image by reference.
    Pull(String),
}

/// A container definition resolved in the context of one task: the effective
/// command, environment and ports have already been computed, and host
/// environment references have been substituted.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerNode {
    pub name: String,
    pub image_source: ImageSource,
    /// Effective command as argv; `None` means the image default.
    pub command: Option<Vec<String>>,
    pub environment: BTreeMap<String, String>,
    pub working_directory: Option<String>,
    pub volumes: Vec<VolumeMount>,
    pub ports: Vec<PortMapping>,
}

/// Immutable DAG of the containers one task invocation needs.
///
/// Nodes are the task's run container plus the transitive closure of
/// `dependencies` (unioned with the task-level dependency set). An edge
/// from A to B means "A may not start until B is healthy". The graph is
/// rooted at the run container and guaranteed acyclic; a cycle is a
/// configuration error reported with the full offending path.
#[derive(Debug, Clone)]
pub struct ContainerGraph {
    graph: DiGraph<ContainerNode, ()>,
    indices: HashMap<String, NodeIndex>,
    root: NodeIndex,
}

impl ContainerGraph {
    /// Resolve the graph for `task` against `cfg`.
    ///
    /// Fails when a referenced container is absent, when the dependency
    /// relation contains a cycle, when a command cannot be parsed, or when
    /// an environment value references an unset host variable.
    pub fn resolve(cfg: &ConfigFile, task_name: &str, task: &TaskConfig) -> Result<Self, ConfigError> {
        let root_name = task.run.container.as_str();

        if !cfg.containers.contains_key(root_name) {
            return Err(ConfigError::UnknownRunContainer {
                task: task_name.to_string(),
                container: root_name.to_string(),
            });
        }

        let members = collect_members(cfg, task, root_name)?;
        check_for_cycles(cfg, task, root_name)?;

        let mut graph = DiGraph::new();
        let mut indices = HashMap::new();

        for name in &members {
            let node = resolve_node(cfg, task, task_name, name, name == root_name)?;
            let index = graph.add_node(node);
            indices.insert(name.clone(), index);
        }

        for name in &members {
            let from = indices[name];
            for dep in dependencies_in_config(cfg, task, name, name == root_name) {
                graph.add_edge(from, indices[&dep], ());
            }
        }

        let root = indices[root_name];

        Ok(Self {
            graph,
            indices,
            root,
        })
    }

    /// The task container.
    pub fn root(&self) -> &ContainerNode {
        &self.graph[self.root]
    }

    pub fn root_name(&self) -> &str {
        &self.graph[self.root].name
    }

    pub fn node(&self, name: &str) -> Option<&ContainerNode> {
        self.indices.get(name).map(|&i| &self.graph[i])
    }

    /// All nodes, root included, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &ContainerNode> {
        self.graph.node_weights()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// The containers `name` waits on (its direct dependencies).
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// The containers that wait on `name`.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Incoming)
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<&str> {
        match self.indices.get(name) {
            Some(&index) => self
                .graph
                .neighbors_directed(index, direction)
                .map(|i| self.graph[i].name.as_str())
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Breadth-first closure of the dependency relation starting at the root.
///
/// The returned list is deduplicated and starts with the root.
fn collect_members(
    cfg: &ConfigFile,
    task: &TaskConfig,
    root_name: &str,
) -> Result<Vec<String>, ConfigError> {
    let mut members = vec![root_name.to_string()];
    let mut queue = VecDeque::from([root_name.to_string()]);

    while let Some(name) = queue.pop_front() {
        for dep in dependencies_in_config(cfg, task, &name, name == root_name) {
            if dep == name {
                return Err(ConfigError::SelfDependency { container: name });
            }

            if !cfg.containers.contains_key(&dep) {
                return Err(ConfigError::UnknownContainerDependency {
                    container: name.clone(),
                    dependency: dep,
                });
            }

            if !members.contains(&dep) {
                members.push(dep.clone());
                queue.push_back(dep);
            }
        }
    }

    Ok(members)
}

/// Direct dependencies of `name` as configured: the container's own
/// (effective) list, plus the task-level additions for the root.
fn dependencies_in_config(
    cfg: &ConfigFile,
    task: &TaskConfig,
    name: &str,
    is_root: bool,
) -> Vec<String> {
    let mut deps = match cfg.containers.get(name) {
        Some(container) => container.effective_dependencies(),
        None => Vec::new(),
    };

    if is_root {
        for dep in &task.dependencies {
            if !deps.contains(dep) && dep != name {
                deps.push(dep.clone());
            }
        }
    }

    deps
}

/// Colouring DFS over the dependency relation. White nodes are unvisited,
/// grey nodes are on the current path, black nodes are fully explored; a
/// grey-to-grey edge is a cycle and the error names the full path.
fn check_for_cycles(cfg: &ConfigFile, task: &TaskConfig, root: &str) -> Result<(), ConfigError> {
    #[derive(PartialEq)]
    enum Colour {
        Grey,
        Black,
    }

    fn visit(
        cfg: &ConfigFile,
        task: &TaskConfig,
        root: &str,
        name: &str,
        colours: &mut HashMap<String, Colour>,
        path: &mut Vec<String>,
    ) -> Result<(), ConfigError> {
        colours.insert(name.to_string(), Colour::Grey);
        path.push(name.to_string());

        for dep in dependencies_in_config(cfg, task, name, name == root) {
            match colours.get(&dep) {
                Some(Colour::Grey) => {
                    let start = path.iter().position(|n| *n == dep).unwrap_or(0);
                    let mut cycle: Vec<&str> = path[start..].iter().map(String::as_str).collect();
                    cycle.push(&dep);

                    return Err(ConfigError::DependencyCycle {
                        cycle: cycle.join(" -> "),
                    });
                }
                Some(Colour::Black) => {}
                None => visit(cfg, task, root, &dep, colours, path)?,
            }
        }

        path.pop();
        colours.insert(name.to_string(), Colour::Black);
        Ok(())
    }

    let mut colours = HashMap::new();
    let mut path = Vec::new();
    visit(cfg, task, root, root, &mut colours, &mut path)
}

/// Compute the effective node values for one container in the context of
/// the task, resolving host environment references.
fn resolve_node(
    cfg: &ConfigFile,
    task: &TaskConfig,
    task_name: &str,
    name: &str,
    is_root: bool,
) -> Result<ContainerNode, ConfigError> {
    let container = &cfg.containers[name];

    let image_source = match (&container.image, &container.build_directory) {
        (Some(reference), None) => ImageSource::Pull(reference.clone()),
        (None, Some(directory)) => ImageSource::Build(directory.clone()),
        _ => {
            return Err(ConfigError::InvalidImageSource {
                container: name.to_string(),
            })
        }
    };

    // Task override > container command > image default.
    let command_string = if is_root {
        task.run.command.as_ref().or(container.command.as_ref())
    } else {
        container.command.as_ref()
    };

    let command = match command_string {
        Some(command) => Some(parse_command(command, name, task_name, is_root)?),
        None => None,
    };

    let mut environment = container.environment.clone();
    let mut ports = container.ports.clone();

    if is_root {
        // Task-level bindings win on conflict.
        for (key, value) in task.run.environment.iter() {
            environment.insert(key.clone(), value.clone());
        }

        for port in task.run.ports.iter() {
            if !ports.contains(port) {
                ports.push(*port);
            }
        }
    }

    let environment = resolve_host_references(&environment, name)?;

    Ok(ContainerNode {
        name: name.to_string(),
        image_source,
        command,
        environment,
        working_directory: container.working_directory.clone(),
        volumes: container.volumes.clone(),
        ports,
    })
}

fn parse_command(
    command: &str,
    container: &str,
    task: &str,
    is_root: bool,
) -> Result<Vec<String>, ConfigError> {
    let owner = if is_root {
        format!("task '{task}'")
    } else {
        format!("container '{container}'")
    };

    match shlex::split(command) {
        Some(argv) => Ok(argv),
        None => Err(ConfigError::InvalidCommand {
            owner,
            command: command.to_string(),
        }),
    }
}
