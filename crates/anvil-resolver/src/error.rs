use anvil_core::{PackageIdentity, VersionRange};
use semver::Version;
use thiserror::Error;

use crate::types::Constraint;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The ranges reaching a package have no version in common.
    #[error("no version of '{identity}' satisfies every requirement:\n  {}", format_constraints(.constraints))]
    Unsatisfiable {
        identity: PackageIdentity,
        constraints: Vec<Constraint>,
    },

    #[error("dependency cycle detected involving: {}", .cycle.join(", "))]
    DependencyCycle { cycle: Vec<String> },

    #[error("version {version} of '{identity}' is outside the required range {range}")]
    VersionOutOfRange {
        identity: PackageIdentity,
        version: Version,
        range: VersionRange,
    },

    /// The checked-out version differs from the version whose manifest
    /// supplied the package's dependencies.
    #[error("'{identity}' was read at version {read} but updated to {updated}")]
    ManifestVersionMismatch {
        identity: PackageIdentity,
        read: Version,
        updated: Version,
    },

    #[error("expected a '{expected}' response, received '{received}'")]
    UnexpectedResponse {
        expected: &'static str,
        received: &'static str,
    },

    #[error("no request is awaiting a response")]
    NoOutstandingRequest,

    #[error("a request for '{identity}' is still awaiting a response")]
    RequestOutstanding { identity: PackageIdentity },

    #[error("resolution has not finished")]
    Incomplete,
}

fn format_constraints(constraints: &[Constraint]) -> String {
    constraints
        .iter()
        .map(|constraint| format!("{} (from {})", constraint.range, constraint.source))
        .collect::<Vec<_>>()
        .join("\n  ")
}
