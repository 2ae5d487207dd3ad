use std::collections::BTreeMap;

use anvil_core::{Dependency, PackageIdentity, PackageManifest, VersionRange};
use anyhow::{Context, Result};
use semver::Version;
use tracing::info;

use crate::types::ResolvedGraph;
use crate::updater::{Request, Response, Updater};

/// Side of the resolver that talks to repositories.
pub trait Collaborator {
    fn fetch(&mut self, identity: &PackageIdentity) -> Result<()>;

    fn read_manifest(
        &mut self,
        identity: &PackageIdentity,
        range: &VersionRange,
    ) -> Result<PackageManifest>;

    /// Checks out a version inside `range` and returns it.
    fn update(&mut self, identity: &PackageIdentity, range: &VersionRange) -> Result<Version>;
}

pub fn select_highest_in_range<'a>(
    candidates: &'a [PackageManifest],
    range: &VersionRange,
) -> Option<&'a PackageManifest> {
    candidates
        .iter()
        .filter(|m| range.contains(&m.version))
        .max_by(|a, b| a.version.cmp(&b.version))
}

/// Drives an [`Updater`] to completion against `collaborator`. Collaborator
/// failures end the session; nothing is retried.
pub fn resolve_dependency_graph<C>(
    roots: &[Dependency],
    pins: &BTreeMap<PackageIdentity, VersionRange>,
    collaborator: &mut C,
) -> Result<ResolvedGraph>
where
    C: Collaborator + ?Sized,
{
    let mut updater = Updater::with_pins(roots.iter().cloned(), pins.clone());
    let mut turns = 0_usize;

    while let Some(request) = updater.next_request()? {
        turns += 1;
        let response = match &request {
            Request::Fetch { identity } => {
                collaborator
                    .fetch(identity)
                    .with_context(|| format!("failed to fetch '{identity}'"))?;
                Response::Fetched
            }
            Request::ReadManifest { identity, range } => {
                let manifest = collaborator
                    .read_manifest(identity, range)
                    .with_context(|| format!("failed to read manifest of '{identity}' ({range})"))?;
                Response::from_manifest(&manifest)
            }
            Request::Update { identity, range } => {
                let version = collaborator
                    .update(identity, range)
                    .with_context(|| format!("failed to update '{identity}' to {range}"))?;
                Response::Updated { version }
            }
        };
        updater.respond(response)?;
    }

    let graph = updater.into_graph()?;
    info!(
        packages = graph.packages.len(),
        turns, "resolved dependency graph"
    );
    Ok(graph)
}
