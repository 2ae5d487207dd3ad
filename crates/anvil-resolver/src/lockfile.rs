use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use anvil_core::{PackageIdentity, VersionRange};
use anyhow::{anyhow, Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::types::ResolvedGraph;

pub const LOCK_FILE: &str = "anvil.lock";

const LOCKFILE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedPackage {
    pub identity: PackageIdentity,
    pub version: Version,
}

/// Versions chosen by the last successful resolution, sorted by identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockfile {
    #[serde(default = "lockfile_version")]
    pub version: u32,
    #[serde(default, rename = "package")]
    pub packages: Vec<LockedPackage>,
}

fn lockfile_version() -> u32 {
    LOCKFILE_VERSION
}

impl Lockfile {
    pub fn from_graph(graph: &ResolvedGraph) -> Self {
        let packages = graph
            .packages
            .values()
            .map(|package| LockedPackage {
                identity: package.identity.clone(),
                version: package.version.clone(),
            })
            .collect();
        Self {
            version: LOCKFILE_VERSION,
            packages,
        }
    }

    pub fn from_toml_str(input: &str) -> Result<Self> {
        let mut lockfile: Self = toml::from_str(input).context("failed to parse lockfile")?;
        if lockfile.version != LOCKFILE_VERSION {
            return Err(anyhow!(
                "unsupported lockfile version {} (expected {LOCKFILE_VERSION})",
                lockfile.version
            ));
        }

        let mut seen = HashSet::new();
        for package in &lockfile.packages {
            if !seen.insert(package.identity.clone()) {
                return Err(anyhow!(
                    "lockfile lists '{}' more than once",
                    package.identity
                ));
            }
        }

        lockfile
            .packages
            .sort_by(|a, b| a.identity.cmp(&b.identity));
        Ok(lockfile)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).context("failed serializing lockfile")
    }

    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read lockfile: {}", path.display()))?;
        let lockfile = Self::from_toml_str(&content)
            .with_context(|| format!("failed to parse lockfile: {}", path.display()))?;
        Ok(Some(lockfile))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let content = self.to_toml_string()?;
        fs::write(path, content)
            .with_context(|| format!("failed to write lockfile: {}", path.display()))
    }

    /// Exact-version pins for every locked package.
    pub fn pins(&self) -> BTreeMap<PackageIdentity, VersionRange> {
        self.packages
            .iter()
            .map(|package| {
                (
                    package.identity.clone(),
                    VersionRange::exact(package.version.clone()),
                )
            })
            .collect()
    }
}
