//! In-memory low-level build manifest: a DAG of named commands over nodes,
//! plus named targets grouping output nodes.
//!
//! Commands, nodes and targets all keep insertion order so that rendering is
//! stable. A manifest is rebuilt from scratch for every plan; it is never
//! patched incrementally.

use std::path::Path;

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::auxiliary::AuxiliaryFile;
use crate::node::Node;
use crate::tool::{Command, MkdirTool, PhonyTool, ShellTool, Tool, WriteAuxiliaryFileTool};

pub const DEFAULT_TARGET: &str = "main";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildManifest {
    commands: IndexMap<String, Command>,
    nodes: IndexMap<String, Node>,
    targets: IndexMap<String, Vec<Node>>,
    default_target: String,
}

impl Default for BuildManifest {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildManifest {
    pub fn new() -> Self {
        Self {
            commands: IndexMap::new(),
            nodes: IndexMap::new(),
            targets: IndexMap::new(),
            default_target: DEFAULT_TARGET.to_string(),
        }
    }

    pub fn default_target(&self) -> &str {
        &self.default_target
    }

    pub fn set_default_target(&mut self, target: impl Into<String>) {
        self.default_target = target.into();
    }

    /// # Panics
    ///
    /// Panics if a command named `name` already exists.
    pub fn add_phony_command(&mut self, name: impl Into<String>, inputs: Vec<Node>, outputs: Vec<Node>) {
        self.insert_command(name.into(), Tool::Phony(PhonyTool { inputs, outputs }));
    }

    /// # Panics
    ///
    /// Panics if a command named `name` already exists.
    pub fn add_shell_command(&mut self, name: impl Into<String>, tool: ShellTool) {
        self.insert_command(name.into(), Tool::Shell(tool));
    }

    /// # Panics
    ///
    /// Panics if a command named `name` already exists.
    pub fn add_write_auxiliary_file_command(
        &mut self,
        name: impl Into<String>,
        inputs: Vec<Node>,
        output_path: &Path,
    ) {
        self.insert_command(
            name.into(),
            Tool::WriteAuxiliaryFile(WriteAuxiliaryFileTool {
                inputs,
                outputs: vec![Node::file(output_path)],
            }),
        );
    }

    /// Adds the command writing `file` to `output_path`, named after the path,
    /// and returns the output node.
    ///
    /// # Panics
    ///
    /// Panics if a command for `output_path` already exists.
    pub fn add_auxiliary_file(&mut self, file: &AuxiliaryFile, output_path: &Path) -> Node {
        let output = Node::file(output_path);
        self.add_write_auxiliary_file_command(output.name(), file.compute_inputs(), output_path);
        output
    }

    /// # Panics
    ///
    /// Panics if a command named `name` already exists.
    pub fn add_mkdir_command(&mut self, name: impl Into<String>, path: &Path) {
        self.insert_command(
            name.into(),
            Tool::Mkdir(MkdirTool {
                inputs: Vec::new(),
                outputs: vec![Node::directory(path)],
            }),
        );
    }

    /// Appends `node` to the outputs grouped under `target`.
    pub fn add_node(&mut self, node: Node, target: &str) {
        self.register_node(&node);
        self.targets.entry(target.to_string()).or_default().push(node);
    }

    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.commands.values()
    }

    pub fn command(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn targets(&self) -> impl Iterator<Item = (&str, &[Node])> {
        self.targets
            .iter()
            .map(|(name, nodes)| (name.as_str(), nodes.as_slice()))
    }

    pub fn target(&self, name: &str) -> Option<&[Node]> {
        self.targets.get(name).map(Vec::as_slice)
    }

    fn insert_command(&mut self, name: String, tool: Tool) {
        assert!(
            !self.commands.contains_key(&name),
            "duplicate command name '{name}' in build manifest"
        );
        for node in tool.inputs().iter().chain(tool.outputs()) {
            self.register_node(node);
        }
        self.commands.insert(name.clone(), Command { name, tool });
    }

    fn register_node(&mut self, node: &Node) {
        match self.nodes.entry(node.name().to_string()) {
            Entry::Occupied(mut existing) => {
                if node.is_mutated() {
                    existing.get_mut().mark_mutated();
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(node.clone());
            }
        }
    }
}
