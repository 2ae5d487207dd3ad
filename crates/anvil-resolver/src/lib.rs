mod constraints;
mod error;
mod lockfile;
mod order;
mod resolve;
mod types;
mod updater;

pub use constraints::ConstraintSet;
pub use error::ResolveError;
pub use lockfile::{LockedPackage, Lockfile, LOCK_FILE};
pub use resolve::{resolve_dependency_graph, select_highest_in_range, Collaborator};
pub use types::{Constraint, ConstraintSource, ResolvedGraph, ResolvedPackage};
pub use updater::{Request, Response, Updater, UpdaterState};
