use anvil_core::PackageIdentity;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("cyclic dependency between modules: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("package '{package}' has no target named '{target}'")]
    UnknownTarget {
        package: PackageIdentity,
        target: String,
    },

    #[error("target '{referenced_by}' depends on package '{package}' which is not part of the build")]
    UnknownPackage {
        package: PackageIdentity,
        referenced_by: String,
    },

    #[error("module '{name}' is declared by both '{first}' and '{second}'")]
    DuplicateModule {
        name: String,
        first: PackageIdentity,
        second: PackageIdentity,
    },

    #[error("malformed inputs for auxiliary file: {reason}")]
    MalformedAuxiliaryInputs { reason: String },
}
