use std::collections::BTreeMap;

use crate::node::Node;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhonyTool {
    pub inputs: Vec<Node>,
    pub outputs: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellTool {
    pub description: String,
    pub inputs: Vec<Node>,
    pub outputs: Vec<Node>,
    pub arguments: Vec<String>,
    pub environment: BTreeMap<String, String>,
    pub working_directory: Option<String>,
    pub allow_missing_inputs: bool,
}

impl ShellTool {
    pub fn new(
        description: impl Into<String>,
        inputs: Vec<Node>,
        outputs: Vec<Node>,
        arguments: Vec<String>,
    ) -> Self {
        Self {
            description: description.into(),
            inputs,
            outputs,
            arguments,
            environment: BTreeMap::new(),
            working_directory: None,
            allow_missing_inputs: false,
        }
    }

    pub fn with_environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_working_directory(mut self, directory: impl Into<String>) -> Self {
        self.working_directory = Some(directory.into());
        self
    }

    pub fn allowing_missing_inputs(mut self) -> Self {
        self.allow_missing_inputs = true;
        self
    }
}

/// Writes a file whose content is a pure function of `inputs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteAuxiliaryFileTool {
    pub inputs: Vec<Node>,
    pub outputs: Vec<Node>,
}

impl WriteAuxiliaryFileTool {
    pub fn output_path(&self) -> &str {
        self.outputs.first().map(Node::name).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MkdirTool {
    pub inputs: Vec<Node>,
    pub outputs: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tool {
    Phony(PhonyTool),
    Shell(ShellTool),
    WriteAuxiliaryFile(WriteAuxiliaryFileTool),
    Mkdir(MkdirTool),
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Phony(_) => "phony",
            Self::Shell(_) => "shell",
            Self::WriteAuxiliaryFile(_) => "write-auxiliary-file",
            Self::Mkdir(_) => "mkdir",
        }
    }

    pub fn inputs(&self) -> &[Node] {
        match self {
            Self::Phony(tool) => &tool.inputs,
            Self::Shell(tool) => &tool.inputs,
            Self::WriteAuxiliaryFile(tool) => &tool.inputs,
            Self::Mkdir(tool) => &tool.inputs,
        }
    }

    pub fn outputs(&self) -> &[Node] {
        match self {
            Self::Phony(tool) => &tool.outputs,
            Self::Shell(tool) => &tool.outputs,
            Self::WriteAuxiliaryFile(tool) => &tool.outputs,
            Self::Mkdir(tool) => &tool.outputs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub tool: Tool,
}
