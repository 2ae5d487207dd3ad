use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use anvil_core::{PackageIdentity, PackageManifest, TargetDependency};
use tracing::debug;

use crate::error::BuildError;
use crate::module_graph::{Module, ModuleGraph};

/// A resolved package ready to be lowered: its checkout root and manifest.
#[derive(Debug, Clone)]
pub struct PackageInput {
    pub identity: PackageIdentity,
    pub root: PathBuf,
    pub manifest: PackageManifest,
}

/// Creates one module per target of `packages` (given dependency-first) and
/// wires local and cross-package edges in declaration order.
pub fn lower_packages(packages: &[PackageInput]) -> Result<ModuleGraph, BuildError> {
    let mut graph = ModuleGraph::new();
    let mut owners: HashMap<&str, &PackageIdentity> = HashMap::new();

    for package in packages {
        for target in &package.manifest.targets {
            if let Some(first) = owners.insert(target.name.as_str(), &package.identity) {
                return Err(BuildError::DuplicateModule {
                    name: target.name.clone(),
                    first: first.clone(),
                    second: package.identity.clone(),
                });
            }
            graph.add_module(Module::new(
                package.identity.clone(),
                target.name.clone(),
                target.kind,
                package.root.join(target.source_path()),
            ));
        }
    }

    let known: HashSet<&PackageIdentity> = packages.iter().map(|p| &p.identity).collect();
    for package in packages {
        for target in &package.manifest.targets {
            let from = graph
                .find(&package.identity, &target.name)
                .ok_or_else(|| BuildError::UnknownTarget {
                    package: package.identity.clone(),
                    target: target.name.clone(),
                })?;

            for dependency in &target.dependencies {
                let owner = match dependency {
                    TargetDependency::Local(_) => &package.identity,
                    TargetDependency::Package {
                        package: owner, ..
                    } => {
                        if !known.contains(owner) {
                            return Err(BuildError::UnknownPackage {
                                package: owner.clone(),
                                referenced_by: target.name.clone(),
                            });
                        }
                        owner
                    }
                };

                let name = dependency.target_name();
                let to = graph
                    .find(owner, name)
                    .ok_or_else(|| BuildError::UnknownTarget {
                        package: owner.clone(),
                        target: name.to_string(),
                    })?;
                graph.add_dependency(from, to);
            }
        }
    }

    graph.validate_acyclic()?;
    debug!(modules = graph.len(), "lowered package graph");
    Ok(graph)
}
