use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anvil_build::{
    lower_packages, write_auxiliary_files, write_manifest, BuildConfig, BuildPlan, Configuration,
    ModuleGraph, PackageInput, CONFIG_FILE,
};
use anvil_core::{PackageIdentity, PackageManifest, MANIFEST_FILE};
use anvil_registry::{RegistryCollaborator, RegistryIndex};
use anvil_resolver::{
    resolve_dependency_graph, ConstraintSource, Lockfile, ResolveError, ResolvedGraph, LOCK_FILE,
};
use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

/// The root package plus everything it resolved to.
#[derive(Debug)]
pub(crate) struct ResolvedWorkspace {
    pub(crate) root: PackageInput,
    pub(crate) graph: ResolvedGraph,
    pub(crate) collaborator: RegistryCollaborator,
    pub(crate) lockfile_updated: bool,
}

#[derive(Debug, Default)]
pub(crate) struct PlanOverrides {
    pub(crate) output: Option<PathBuf>,
    pub(crate) build_dir: Option<PathBuf>,
    pub(crate) configuration: Option<String>,
    pub(crate) toolchain: Option<PathBuf>,
}

#[derive(Debug)]
pub(crate) struct PlanOutcome {
    pub(crate) manifest_path: PathBuf,
    pub(crate) written: bool,
    pub(crate) commands: usize,
    pub(crate) auxiliary_files: usize,
}

pub(crate) fn load_root_manifest(package_dir: &Path) -> Result<PackageManifest> {
    let path = package_dir.join(MANIFEST_FILE);
    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read package manifest: {}", path.display()))?;
    PackageManifest::from_toml_str(&content)
        .with_context(|| format!("failed to parse package manifest: {}", path.display()))
}

/// Resolves the package in `package_dir`, preferring the versions recorded in
/// its lockfile. Locked versions that no longer satisfy the manifest are
/// dropped and resolution starts over. The lockfile is rewritten when the
/// selection changes.
pub(crate) fn resolve_workspace(package_dir: &Path, index: &RegistryIndex) -> Result<ResolvedWorkspace> {
    let manifest = load_root_manifest(package_dir)?;
    let lock_path = package_dir.join(LOCK_FILE);
    let existing = Lockfile::read(&lock_path)?;
    let pins = existing
        .as_ref()
        .map(Lockfile::pins)
        .unwrap_or_default();

    let mut collaborator = RegistryCollaborator::new(index.clone());
    let graph = match resolve_dependency_graph(&manifest.dependencies, &pins, &mut collaborator) {
        Ok(graph) => graph,
        Err(err) if is_pin_conflict(&err) => {
            warn!(
                lockfile = %lock_path.display(),
                "locked versions conflict with the manifest; resolving without them"
            );
            collaborator = RegistryCollaborator::new(index.clone());
            resolve_dependency_graph(&manifest.dependencies, &BTreeMap::new(), &mut collaborator)?
        }
        Err(err) => return Err(err),
    };

    let lockfile = Lockfile::from_graph(&graph);
    let lockfile_updated = existing.as_ref() != Some(&lockfile);
    if lockfile_updated {
        lockfile.write(&lock_path)?;
        info!(path = %lock_path.display(), packages = lockfile.packages.len(), "updated lockfile");
    }

    let root = PackageInput {
        identity: PackageIdentity::new(manifest.name.clone()),
        root: package_dir.to_path_buf(),
        manifest,
    };
    Ok(ResolvedWorkspace {
        root,
        graph,
        collaborator,
        lockfile_updated,
    })
}

pub(crate) fn is_pin_conflict(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ResolveError>(),
        Some(ResolveError::Unsatisfiable { constraints, .. })
            if constraints.iter().any(|c| c.source == ConstraintSource::Pin)
    )
}

/// Lowers the resolved packages, dependencies first, with the root package
/// last.
pub(crate) fn lower_workspace(workspace: &ResolvedWorkspace) -> Result<ModuleGraph> {
    let mut inputs = Vec::with_capacity(workspace.graph.build_order.len() + 1);
    for identity in &workspace.graph.build_order {
        let checkout = workspace
            .collaborator
            .checkout(identity)
            .ok_or_else(|| anyhow!("package '{identity}' was resolved but never checked out"))?;
        inputs.push(PackageInput {
            identity: identity.clone(),
            root: checkout.path.clone(),
            manifest: checkout.manifest.clone(),
        });
    }
    inputs.push(workspace.root.clone());

    lower_packages(&inputs).context("failed to build module graph")
}

pub(crate) fn load_build_config(package_dir: &Path, overrides: &PlanOverrides) -> Result<BuildConfig> {
    let mut config = BuildConfig::load(&package_dir.join(CONFIG_FILE))?;
    if let Some(build_dir) = &overrides.build_dir {
        config.build_dir = build_dir.clone();
    }
    if let Some(configuration) = &overrides.configuration {
        config.configuration = Configuration::parse(configuration).ok_or_else(|| {
            anyhow!("invalid configuration '{configuration}': expected 'debug' or 'release'")
        })?;
    }
    if let Some(toolchain) = &overrides.toolchain {
        config.compiler = toolchain.clone();
    }
    if config.build_dir.is_relative() {
        config.build_dir = package_dir.join(&config.build_dir);
    }
    Ok(config)
}

pub(crate) fn plan_workspace(
    package_dir: &Path,
    index: &RegistryIndex,
    overrides: &PlanOverrides,
) -> Result<PlanOutcome> {
    let config = load_build_config(package_dir, overrides)?;
    let workspace = resolve_workspace(package_dir, index)?;
    let graph = lower_workspace(&workspace)?;

    let manifest = BuildPlan::new(&graph, &config).build_manifest();
    let manifest_path = overrides
        .output
        .clone()
        .unwrap_or_else(|| config.manifest_path());
    let written = write_manifest(&manifest, &config.client(), &manifest_path)?;
    let auxiliary_files = write_auxiliary_files(&manifest)?;

    Ok(PlanOutcome {
        manifest_path,
        written,
        commands: manifest.commands().count(),
        auxiliary_files,
    })
}
