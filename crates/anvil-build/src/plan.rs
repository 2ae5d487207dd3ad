//! Lowers a [`ModuleGraph`] into a [`BuildManifest`].

use std::path::{Path, PathBuf};

use anvil_core::TargetKind;
use tracing::debug;

use crate::auxiliary::AuxiliaryFile;
use crate::config::{BuildConfig, Configuration};
use crate::manifest::{BuildManifest, DEFAULT_TARGET};
use crate::module_graph::{Module, ModuleGraph, ModuleId};
use crate::node::Node;
use crate::tool::ShellTool;

pub const TEST_TARGET: &str = "test";
pub const GET_TASK_ALLOW: &str = "com.apple.security.get-task-allow";

pub struct BuildPlan<'a> {
    graph: &'a ModuleGraph,
    config: &'a BuildConfig,
}

impl<'a> BuildPlan<'a> {
    pub fn new(graph: &'a ModuleGraph, config: &'a BuildConfig) -> Self {
        Self { graph, config }
    }

    /// Builds a fresh manifest. Modules are emitted dependencies first.
    pub fn build_manifest(&self) -> BuildManifest {
        let mut manifest = BuildManifest::new();
        manifest.set_default_target(self.config.default_target.clone());

        let output_dir = self.config.output_dir();
        manifest.add_mkdir_command(Node::directory(&output_dir).name(), &output_dir);

        for id in self.graph.topological_order() {
            let module = self.graph.module(id);
            let module_node = self.add_compile_commands(&mut manifest, id, module);
            if module.kind != TargetKind::Test {
                manifest.add_node(module_node.clone(), DEFAULT_TARGET);
            }
            manifest.add_node(module_node, TEST_TARGET);

            if module.kind == TargetKind::Executable {
                let product = self.add_product_commands(&mut manifest, id, module);
                manifest.add_node(product.clone(), DEFAULT_TARGET);
                manifest.add_node(product, TEST_TARGET);
            }
        }

        debug!(
            modules = self.graph.len(),
            commands = manifest.commands().count(),
            configuration = %self.config.configuration,
            "planned build"
        );
        manifest
    }

    fn add_compile_commands(
        &self,
        manifest: &mut BuildManifest,
        id: ModuleId,
        module: &Module,
    ) -> Node {
        let output_dir = self.config.output_dir();
        let module_file = self.module_file(&module.name);
        let object_file = self.object_file(&module.name);

        let mut inputs = vec![
            Node::directory_structure(&module.sources),
            Node::directory(&output_dir),
        ];
        inputs.extend(
            self.graph
                .recursive_dependencies(id)
                .into_iter()
                .map(|dependency| Node::file(self.module_file(&self.graph.module(dependency).name))),
        );

        let mut arguments = vec![
            path_arg(&self.config.compiler),
            "-module-name".to_string(),
            module.name.clone(),
            "-c".to_string(),
            path_arg(&module.sources),
            "-o".to_string(),
            path_arg(&object_file),
            "-emit-module-path".to_string(),
            path_arg(&module_file),
            "-I".to_string(),
            path_arg(&output_dir),
        ];
        arguments.push(
            match self.config.configuration {
                Configuration::Debug => "-g",
                Configuration::Release => "-O",
            }
            .to_string(),
        );
        if module.kind == TargetKind::Executable {
            arguments.push("-parse-as-executable".to_string());
        }

        let outputs = vec![Node::file(&module_file), Node::file(&object_file)];
        let label = self.label(&module.name, "module");
        manifest.add_shell_command(
            format!("C.{label}"),
            ShellTool::new(
                format!("Compiling module {}", module.name),
                inputs,
                outputs.clone(),
                arguments,
            ),
        );

        let module_node = Node::virtual_node(&label);
        manifest.add_phony_command(label, outputs, vec![module_node.clone()]);
        module_node
    }

    fn add_product_commands(
        &self,
        manifest: &mut BuildManifest,
        id: ModuleId,
        module: &Module,
    ) -> Node {
        let product_dir = self
            .config
            .output_dir()
            .join(format!("{}.product", module.name));
        let binary = self.config.output_dir().join(&module.name);

        let mut objects = vec![self.object_file(&module.name)];
        objects.extend(
            self.graph
                .recursive_dependencies(id)
                .into_iter()
                .map(|dependency| self.graph.module(dependency))
                .filter(|dependency| dependency.kind == TargetKind::Library)
                .map(|dependency| self.object_file(&dependency.name)),
        );

        let file_list = manifest.add_auxiliary_file(
            &AuxiliaryFile::LinkFileList {
                objects: objects.clone(),
            },
            &product_dir.join("Objects.LinkFileList"),
        );

        let mut link_inputs = objects.iter().map(Node::file).collect::<Vec<_>>();
        link_inputs.push(file_list.clone());
        let label = self.label(&module.name, "exe");
        manifest.add_shell_command(
            format!("C.{label}"),
            ShellTool::new(
                format!("Linking {}", module.name),
                link_inputs,
                vec![Node::file(&binary)],
                vec![
                    path_arg(&self.config.linker),
                    "-o".to_string(),
                    path_arg(&binary),
                    format!("@{}", file_list.name()),
                ],
            ),
        );

        let product_input = if self.config.applies_entitlements() {
            let plist = manifest.add_auxiliary_file(
                &AuxiliaryFile::EntitlementPlist {
                    entitlements: vec![GET_TASK_ALLOW.to_string()],
                },
                &product_dir.join(format!("{}-entitlement.plist", module.name)),
            );
            let timestamp = Node::command_timestamp(&format!("{label}-codesign"));
            manifest.add_shell_command(
                format!("C.{label}-codesign"),
                ShellTool::new(
                    format!("Applying debug entitlements to {}", module.name),
                    vec![Node::file(&binary), plist.clone()],
                    vec![Node::file(&binary).mutated(), timestamp.clone()],
                    vec![
                        path_arg(&self.config.codesign),
                        "--force".to_string(),
                        "--sign".to_string(),
                        "-".to_string(),
                        "--entitlements".to_string(),
                        plist.name().to_string(),
                        path_arg(&binary),
                    ],
                ),
            );
            timestamp
        } else {
            Node::file(&binary)
        };

        let product = Node::virtual_node(&label);
        manifest.add_phony_command(label, vec![product_input], vec![product.clone()]);
        product
    }

    fn label(&self, name: &str, suffix: &str) -> String {
        format!("{name}-{}.{suffix}", self.config.configuration)
    }

    fn module_file(&self, name: &str) -> PathBuf {
        self.config.output_dir().join(format!("{name}.module"))
    }

    fn object_file(&self, name: &str) -> PathBuf {
        self.config.output_dir().join(format!("{name}.o"))
    }
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}
