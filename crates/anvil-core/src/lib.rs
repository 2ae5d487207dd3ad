mod identity;
mod manifest;
mod version;

pub use identity::PackageIdentity;
pub use manifest::{
    Dependency, PackageManifest, TargetDependency, TargetDescription, TargetKind, MANIFEST_FILE,
};
pub use semver::Version;
pub use version::{compare_versions, version, VersionRange};

#[cfg(test)]
mod tests;
