use std::fs;
use std::path::{Path, PathBuf};

use anvil_core::{PackageIdentity, PackageManifest, MANIFEST_FILE};
use anyhow::{Context, Result};
use semver::Version;

/// A registry laid out on disk:
///
/// ```text
/// <root>/index/<name>/<version>.toml      one manifest per published version
/// <root>/checkouts/<name>/<version>/      checked-out sources of that version
/// ```
///
/// `<name>` is [`PackageIdentity::name`].
#[derive(Debug, Clone)]
pub struct RegistryIndex {
    root: PathBuf,
}

impl RegistryIndex {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every published manifest of `identity`, newest first.
    pub fn package_versions(&self, identity: &PackageIdentity) -> Result<Vec<PackageManifest>> {
        let package_dir = self.root.join("index").join(identity.name());
        let mut manifests = Vec::new();
        for (version, path) in self.versions_in(&package_dir)? {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed reading manifest: {}", path.display()))?;
            let manifest = PackageManifest::from_toml_str(&content)
                .with_context(|| format!("failed parsing manifest: {}", path.display()))?;
            if manifest.version != version {
                anyhow::bail!(
                    "manifest {} declares version {} but is published as {}",
                    path.display(),
                    manifest.version,
                    version
                );
            }
            manifests.push(manifest);
        }

        manifests.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(manifests)
    }

    pub fn checkout_path(&self, identity: &PackageIdentity, version: &Version) -> PathBuf {
        self.root
            .join("checkouts")
            .join(identity.name())
            .join(version.to_string())
    }

    /// Reads the manifest shipped inside a checkout.
    pub fn checkout_manifest(&self, identity: &PackageIdentity, version: &Version) -> Result<PackageManifest> {
        let path = self.checkout_path(identity, version).join(MANIFEST_FILE);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed reading checkout manifest: {}", path.display()))?;
        PackageManifest::from_toml_str(&content)
            .with_context(|| format!("failed parsing checkout manifest: {}", path.display()))
    }

    fn versions_in(&self, package_dir: &Path) -> Result<Vec<(Version, PathBuf)>> {
        if !package_dir.exists() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in fs::read_dir(package_dir)
            .with_context(|| format!("failed to read package directory: {}", package_dir.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let path = entry.path();
            if path.extension().and_then(|v| v.to_str()) != Some("toml") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|v| v.to_str()) else {
                continue;
            };
            let version = Version::parse(stem)
                .with_context(|| format!("invalid version in manifest file name: {}", path.display()))?;
            versions.push((version, path));
        }
        Ok(versions)
    }
}
