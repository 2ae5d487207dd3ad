use std::collections::BTreeMap;
use std::path::PathBuf;

use anvil_core::{PackageIdentity, PackageManifest, VersionRange};
use anvil_resolver::{select_highest_in_range, Collaborator};
use anyhow::{anyhow, Result};
use semver::Version;
use tracing::debug;

use crate::registry_index::RegistryIndex;

/// A package version selected by an update, with its sources on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    pub version: Version,
    pub path: PathBuf,
    pub manifest: PackageManifest,
}

/// Answers resolver requests from a [`RegistryIndex`]. Fetching loads the
/// published versions of a package once; later requests are served from
/// memory.
///
/// The registry lays packages out by [`PackageIdentity::name`], so two
/// identities sharing a name cannot take part in the same resolution.
#[derive(Debug)]
pub struct RegistryCollaborator {
    index: RegistryIndex,
    fetched: BTreeMap<PackageIdentity, Vec<PackageManifest>>,
    names: BTreeMap<String, PackageIdentity>,
    checkouts: BTreeMap<PackageIdentity, Checkout>,
}

impl RegistryCollaborator {
    pub fn new(index: RegistryIndex) -> Self {
        Self {
            index,
            fetched: BTreeMap::new(),
            names: BTreeMap::new(),
            checkouts: BTreeMap::new(),
        }
    }

    pub fn checkout(&self, identity: &PackageIdentity) -> Option<&Checkout> {
        self.checkouts.get(identity)
    }

    fn versions(&mut self, identity: &PackageIdentity) -> Result<&[PackageManifest]> {
        if !self.fetched.contains_key(identity) {
            self.fetch(identity)?;
        }
        Ok(self
            .fetched
            .get(identity)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    fn select(&mut self, identity: &PackageIdentity, range: &VersionRange) -> Result<PackageManifest> {
        let candidates = self.versions(identity)?;
        select_highest_in_range(candidates, range)
            .cloned()
            .ok_or_else(|| {
                let available = candidates
                    .iter()
                    .map(|m| m.version.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                anyhow!("no published version of '{identity}' is in {range} (available: {available})")
            })
    }
}

impl Collaborator for RegistryCollaborator {
    fn fetch(&mut self, identity: &PackageIdentity) -> Result<()> {
        if let Some(claimed) = self.names.get(identity.name()) {
            if claimed != identity {
                anyhow::bail!(
                    "packages '{claimed}' and '{identity}' both map to registry name '{}'",
                    identity.name()
                );
            }
        }

        let manifests = self.index.package_versions(identity)?;
        if manifests.is_empty() {
            anyhow::bail!(
                "package '{identity}' was not found in registry {}",
                self.index.root().display()
            );
        }
        debug!(%identity, versions = manifests.len(), "fetched package");
        self.names
            .insert(identity.name().to_string(), identity.clone());
        self.fetched.insert(identity.clone(), manifests);
        Ok(())
    }

    fn read_manifest(
        &mut self,
        identity: &PackageIdentity,
        range: &VersionRange,
    ) -> Result<PackageManifest> {
        self.select(identity, range)
    }

    fn update(&mut self, identity: &PackageIdentity, range: &VersionRange) -> Result<Version> {
        let version = self.select(identity, range)?.version;
        let path = self.index.checkout_path(identity, &version);
        if !path.is_dir() {
            anyhow::bail!(
                "checkout of '{identity}' {version} is missing: {}",
                path.display()
            );
        }

        let manifest = self.index.checkout_manifest(identity, &version)?;
        if manifest.version != version {
            anyhow::bail!(
                "checkout of '{identity}' at {} declares version {} instead of {version}",
                path.display(),
                manifest.version
            );
        }

        debug!(%identity, %version, path = %path.display(), "checked out package");
        self.checkouts.insert(
            identity.clone(),
            Checkout {
                version: version.clone(),
                path,
                manifest,
            },
        );
        Ok(version)
    }
}
