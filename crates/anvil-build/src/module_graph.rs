use std::collections::HashMap;
use std::path::PathBuf;

use anvil_core::{PackageIdentity, TargetKind};

use crate::error::BuildError;

/// Index of a module inside its [`ModuleGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(usize);

impl ModuleId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub package: PackageIdentity,
    pub name: String,
    pub kind: TargetKind,
    pub sources: PathBuf,
    dependencies: Vec<ModuleId>,
}

impl Module {
    pub fn new(
        package: PackageIdentity,
        name: impl Into<String>,
        kind: TargetKind,
        sources: impl Into<PathBuf>,
    ) -> Self {
        Self {
            package,
            name: name.into(),
            kind,
            sources: sources.into(),
            dependencies: Vec::new(),
        }
    }

    /// Direct dependencies in declaration order.
    pub fn dependencies(&self) -> &[ModuleId] {
        &self.dependencies
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Active,
    Done,
}

/// Arena of modules; edges are index lists and equality is index equality.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    modules: Vec<Module>,
    by_name: HashMap<(PackageIdentity, String), ModuleId>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(&mut self, module: Module) -> ModuleId {
        let id = ModuleId(self.modules.len());
        self.by_name
            .insert((module.package.clone(), module.name.clone()), id);
        self.modules.push(module);
        id
    }

    /// Appends `to` to the dependencies of `from`; repeated edges are ignored.
    pub fn add_dependency(&mut self, from: ModuleId, to: ModuleId) {
        let dependencies = &mut self.modules[from.0].dependencies;
        if !dependencies.contains(&to) {
            dependencies.push(to);
        }
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.0]
    }

    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules
            .iter()
            .enumerate()
            .map(|(index, module)| (ModuleId(index), module))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn find(&self, package: &PackageIdentity, name: &str) -> Option<ModuleId> {
        self.by_name
            .get(&(package.clone(), name.to_string()))
            .copied()
    }

    /// Every module `id` depends on, directly or not, each listed after its
    /// own dependencies. A module reachable along several paths keeps the
    /// position of its first occurrence. Computed from the live graph on every
    /// call.
    pub fn recursive_dependencies(&self, id: ModuleId) -> Vec<ModuleId> {
        self.post_order(&[id], false)
    }

    /// All modules, dependencies first, in insertion order otherwise.
    pub fn topological_order(&self) -> Vec<ModuleId> {
        let all = (0..self.modules.len()).map(ModuleId).collect::<Vec<_>>();
        self.post_order(&all, true)
    }

    pub fn validate_acyclic(&self) -> Result<(), BuildError> {
        let mut marks = vec![Mark::Unvisited; self.modules.len()];
        let mut path = Vec::new();
        for index in 0..self.modules.len() {
            self.visit(ModuleId(index), &mut marks, &mut path)?;
        }
        Ok(())
    }

    fn visit(
        &self,
        id: ModuleId,
        marks: &mut [Mark],
        path: &mut Vec<ModuleId>,
    ) -> Result<(), BuildError> {
        match marks[id.0] {
            Mark::Done => return Ok(()),
            Mark::Active => {
                let start = path.iter().position(|entry| *entry == id).unwrap_or(0);
                let mut cycle = path[start..]
                    .iter()
                    .map(|entry| self.modules[entry.0].name.clone())
                    .collect::<Vec<_>>();
                cycle.push(self.modules[id.0].name.clone());
                return Err(BuildError::CyclicDependency { cycle });
            }
            Mark::Unvisited => {}
        }

        marks[id.0] = Mark::Active;
        path.push(id);
        for dependency in &self.modules[id.0].dependencies {
            self.visit(*dependency, marks, path)?;
        }
        path.pop();
        marks[id.0] = Mark::Done;
        Ok(())
    }

    fn post_order(&self, roots: &[ModuleId], include_roots: bool) -> Vec<ModuleId> {
        let mut visited = vec![false; self.modules.len()];
        let mut ordered = Vec::new();

        for &root in roots {
            if visited[root.0] {
                continue;
            }
            visited[root.0] = true;

            let mut stack = vec![(root, 0_usize)];
            while let Some(&(current, cursor)) = stack.last() {
                if let Some(&child) = self.modules[current.0].dependencies.get(cursor) {
                    if let Some(top) = stack.last_mut() {
                        top.1 += 1;
                    }
                    if !visited[child.0] {
                        visited[child.0] = true;
                        stack.push((child, 0));
                    }
                } else {
                    stack.pop();
                    if include_roots || current != root {
                        ordered.push(current);
                    }
                }
            }
        }

        ordered
    }
}
