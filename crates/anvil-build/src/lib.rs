mod auxiliary;
mod config;
mod error;
mod lower;
mod manifest;
mod module_graph;
mod node;
mod plan;
mod tool;
mod writer;

pub use auxiliary::{entitlements, file_contents, AuxiliaryFile};
pub use config::{BuildConfig, ClientConfig, Configuration, FileSystemMode, CONFIG_FILE};
pub use error::BuildError;
pub use lower::{lower_packages, PackageInput};
pub use manifest::{BuildManifest, DEFAULT_TARGET};
pub use module_graph::{Module, ModuleGraph, ModuleId};
pub use node::{Node, NodeKind};
pub use plan::{BuildPlan, GET_TASK_ALLOW, TEST_TARGET};
pub use tool::{Command, MkdirTool, PhonyTool, ShellTool, Tool, WriteAuxiliaryFileTool};
pub use writer::{render_manifest, write_auxiliary_files, write_manifest};
