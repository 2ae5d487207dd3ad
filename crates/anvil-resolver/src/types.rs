use std::collections::BTreeMap;
use std::fmt;

use anvil_core::{PackageIdentity, VersionRange};
use semver::Version;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintSource {
    Root,
    Package(PackageIdentity),
    Pin,
}

impl fmt::Display for ConstraintSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("root"),
            Self::Package(identity) => write!(f, "package '{identity}'"),
            Self::Pin => f.write_str("pin"),
        }
    }
}

/// One version range reaching a package, with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub source: ConstraintSource,
    pub range: VersionRange,
}

impl Constraint {
    pub fn new(source: ConstraintSource, range: VersionRange) -> Self {
        Self { source, range }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    pub identity: PackageIdentity,
    pub version: Version,
    pub range: VersionRange,
    pub dependencies: Vec<PackageIdentity>,
}

#[derive(Debug, Clone)]
pub struct ResolvedGraph {
    pub packages: BTreeMap<PackageIdentity, ResolvedPackage>,
    pub build_order: Vec<PackageIdentity>,
}

impl ResolvedGraph {
    pub fn package(&self, identity: &PackageIdentity) -> Option<&ResolvedPackage> {
        self.packages.get(identity)
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Packages in dependency-first order.
    pub fn ordered_packages(&self) -> impl Iterator<Item = &ResolvedPackage> {
        self.build_order
            .iter()
            .filter_map(|identity| self.packages.get(identity))
    }
}
