use std::collections::HashSet;

use anyhow::{anyhow, Context};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::identity::PackageIdentity;
use crate::version::VersionRange;

pub const MANIFEST_FILE: &str = "anvil.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageManifest {
    pub name: String,
    pub version: Version,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub targets: Vec<TargetDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dependency {
    pub url: PackageIdentity,
    pub range: VersionRange,
}

impl Dependency {
    pub fn new(url: impl Into<PackageIdentity>, range: VersionRange) -> Self {
        Self {
            url: url.into(),
            range,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    #[default]
    Library,
    Executable,
    Test,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Library => "library",
            Self::Executable => "executable",
            Self::Test => "test",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetDescription {
    pub name: String,
    #[serde(default)]
    pub kind: TargetKind,
    pub path: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<TargetDependency>,
}

impl TargetDescription {
    /// Source directory relative to the package root.
    pub fn source_path(&self) -> String {
        if let Some(path) = &self.path {
            return path.clone();
        }
        match self.kind {
            TargetKind::Test => format!("Tests/{}", self.name),
            TargetKind::Library | TargetKind::Executable => format!("Sources/{}", self.name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TargetDependency {
    Local(String),
    Package {
        target: String,
        package: PackageIdentity,
    },
}

impl TargetDependency {
    pub fn target_name(&self) -> &str {
        match self {
            Self::Local(name) => name,
            Self::Package { target, .. } => target,
        }
    }
}

impl PackageManifest {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let manifest: Self = toml::from_str(input).context("failed to parse anvil manifest")?;

        let mut seen_dependencies = HashSet::new();
        for dependency in &manifest.dependencies {
            if !seen_dependencies.insert(dependency.url.clone()) {
                return Err(anyhow!(
                    "manifest '{}' declares dependency '{}' more than once",
                    manifest.name,
                    dependency.url
                ));
            }
        }

        let mut seen_targets = HashSet::new();
        for target in &manifest.targets {
            if target.name.trim().is_empty() {
                return Err(anyhow!(
                    "target name must not be empty in manifest '{}'",
                    manifest.name
                ));
            }
            if !seen_targets.insert(target.name.as_str()) {
                return Err(anyhow!(
                    "duplicate target '{}' in manifest '{}'",
                    target.name,
                    manifest.name
                ));
            }
        }

        for target in &manifest.targets {
            for dependency in &target.dependencies {
                match dependency {
                    TargetDependency::Local(name) if name == &target.name => {
                        return Err(anyhow!(
                            "target '{}' in manifest '{}' depends on itself",
                            target.name,
                            manifest.name
                        ));
                    }
                    TargetDependency::Local(_) => {}
                    TargetDependency::Package { package, target: dep_target } => {
                        if !seen_dependencies.contains(package) {
                            return Err(anyhow!(
                                "target '{}' depends on '{}' from undeclared package '{}'",
                                target.name,
                                dep_target,
                                package
                            ));
                        }
                    }
                }
            }
        }

        Ok(manifest)
    }

    pub fn target(&self, name: &str) -> Option<&TargetDescription> {
        self.targets.iter().find(|target| target.name == name)
    }
}
