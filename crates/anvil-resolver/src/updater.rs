//! Request/response state machine that builds a dependency graph.
//!
//! The updater never performs I/O. The caller repeatedly asks for the next
//! [`Request`], performs it, and feeds the outcome back as a [`Response`]:
//!
//! 1. every newly discovered package is fetched and then has its manifest read
//!    with the range known at that point, breadth-first in discovery order;
//! 2. once no manifest is left to read, every edge is known and each package
//!    receives one `Update` request carrying its final intersected range.
//!
//! A package passes through each stage at most once; later edges reaching it
//! only narrow its range. An empty intersection stops the session immediately,
//! and so does an update that checks out a different version than the one
//! whose manifest was read.

use std::collections::{BTreeMap, VecDeque};

use anvil_core::{Dependency, PackageIdentity, PackageManifest, VersionRange};
use semver::Version;
use tracing::debug;

use crate::constraints::ConstraintSet;
use crate::error::ResolveError;
use crate::order::topo_order;
use crate::types::{Constraint, ConstraintSource, ResolvedGraph, ResolvedPackage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Fetch {
        identity: PackageIdentity,
    },
    ReadManifest {
        identity: PackageIdentity,
        range: VersionRange,
    },
    Update {
        identity: PackageIdentity,
        range: VersionRange,
    },
}

impl Request {
    pub fn identity(&self) -> &PackageIdentity {
        match self {
            Self::Fetch { identity }
            | Self::ReadManifest { identity, .. }
            | Self::Update { identity, .. } => identity,
        }
    }

    fn expected_response(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetched",
            Self::ReadManifest { .. } => "manifest",
            Self::Update { .. } => "updated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Fetched,
    Manifest {
        version: Version,
        dependencies: Vec<Dependency>,
    },
    Updated {
        version: Version,
    },
}

impl Response {
    pub fn from_manifest(manifest: &PackageManifest) -> Self {
        Self::Manifest {
            version: manifest.version.clone(),
            dependencies: manifest.dependencies.clone(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Fetched => "fetched",
            Self::Manifest { .. } => "manifest",
            Self::Updated { .. } => "updated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdaterState {
    Idle,
    AwaitingFetch,
    AwaitingManifest,
    AwaitingUpdate,
    Finished,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Discovered,
    Fetched,
    ManifestRead,
    Updated,
}

#[derive(Debug, Clone)]
struct PackageEntry {
    stage: Stage,
    constraints: ConstraintSet,
    dependencies: Vec<PackageIdentity>,
    manifest_version: Option<Version>,
    version: Option<Version>,
}

#[derive(Debug)]
pub struct Updater {
    packages: BTreeMap<PackageIdentity, PackageEntry>,
    discovered: Vec<PackageIdentity>,
    pending_reads: VecDeque<PackageIdentity>,
    next_update: usize,
    pins: BTreeMap<PackageIdentity, VersionRange>,
    outstanding: Option<Request>,
    failure: Option<ResolveError>,
}

impl Updater {
    pub fn new(roots: impl IntoIterator<Item = Dependency>) -> Self {
        Self::with_pins(roots, BTreeMap::new())
    }

    /// Pins add a constraint to a package when it is discovered; a pin alone
    /// never causes a package to be fetched.
    pub fn with_pins(
        roots: impl IntoIterator<Item = Dependency>,
        pins: BTreeMap<PackageIdentity, VersionRange>,
    ) -> Self {
        let mut updater = Self {
            packages: BTreeMap::new(),
            discovered: Vec::new(),
            pending_reads: VecDeque::new(),
            next_update: 0,
            pins,
            outstanding: None,
            failure: None,
        };

        for root in roots {
            let constraint = Constraint::new(ConstraintSource::Root, root.range);
            if let Err(err) = updater.constrain(root.url, constraint) {
                updater.failure = Some(err);
                break;
            }
        }
        updater
    }

    pub fn state(&self) -> UpdaterState {
        if self.failure.is_some() {
            return UpdaterState::Failed;
        }
        match &self.outstanding {
            Some(Request::Fetch { .. }) => UpdaterState::AwaitingFetch,
            Some(Request::ReadManifest { .. }) => UpdaterState::AwaitingManifest,
            Some(Request::Update { .. }) => UpdaterState::AwaitingUpdate,
            None if self.is_finished() => UpdaterState::Finished,
            None => UpdaterState::Idle,
        }
    }

    fn is_finished(&self) -> bool {
        self.pending_reads.is_empty() && self.next_update == self.discovered.len()
    }

    /// Returns the next request, `Ok(None)` once resolution has succeeded, or
    /// the failure that ended the session.
    pub fn next_request(&mut self) -> Result<Option<Request>, ResolveError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if let Some(request) = &self.outstanding {
            return Err(ResolveError::RequestOutstanding {
                identity: request.identity().clone(),
            });
        }

        let request = if let Some(identity) = self.pending_reads.front() {
            let entry = self.entry(identity);
            match entry.stage {
                Stage::Discovered => Request::Fetch {
                    identity: identity.clone(),
                },
                _ => Request::ReadManifest {
                    identity: identity.clone(),
                    range: entry.constraints.range().clone(),
                },
            }
        } else if let Some(identity) = self.discovered.get(self.next_update) {
            Request::Update {
                identity: identity.clone(),
                range: self.entry(identity).constraints.range().clone(),
            }
        } else {
            debug!(packages = self.discovered.len(), "resolution finished");
            return Ok(None);
        };

        debug!(?request, "resolver turn");
        self.outstanding = Some(request.clone());
        Ok(Some(request))
    }

    pub fn respond(&mut self, response: Response) -> Result<(), ResolveError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let Some(request) = self.outstanding.take() else {
            return Err(ResolveError::NoOutstandingRequest);
        };

        let result = match (request, response) {
            (Request::Fetch { identity }, Response::Fetched) => {
                self.entry_mut(&identity).stage = Stage::Fetched;
                Ok(())
            }
            (
                Request::ReadManifest { identity, range },
                Response::Manifest {
                    version,
                    dependencies,
                },
            ) => self.record_manifest(identity, range, version, dependencies),
            (Request::Update { identity, range }, Response::Updated { version }) => {
                self.record_update(identity, range, version)
            }
            (request, response) => {
                let err = ResolveError::UnexpectedResponse {
                    expected: request.expected_response(),
                    received: response.kind(),
                };
                self.outstanding = Some(request);
                return Err(err);
            }
        };

        if let Err(err) = &result {
            debug!(error = %err, "resolution failed");
            self.failure = Some(err.clone());
        }
        result
    }

    pub fn into_graph(self) -> Result<ResolvedGraph, ResolveError> {
        if let Some(err) = self.failure {
            return Err(err);
        }
        if self.outstanding.is_some() || !self.is_finished() {
            return Err(ResolveError::Incomplete);
        }

        let mut packages = BTreeMap::new();
        for (identity, entry) in self.packages {
            let Some(version) = entry.version else {
                return Err(ResolveError::Incomplete);
            };
            packages.insert(
                identity.clone(),
                ResolvedPackage {
                    identity,
                    version,
                    range: entry.constraints.range().clone(),
                    dependencies: entry.dependencies,
                },
            );
        }

        let build_order = topo_order(&packages)?;
        Ok(ResolvedGraph {
            packages,
            build_order,
        })
    }

    fn record_manifest(
        &mut self,
        identity: PackageIdentity,
        range: VersionRange,
        version: Version,
        dependencies: Vec<Dependency>,
    ) -> Result<(), ResolveError> {
        if !range.contains(&version) {
            return Err(ResolveError::VersionOutOfRange {
                identity,
                version,
                range,
            });
        }

        self.pending_reads.pop_front();
        debug!(%identity, %version, children = dependencies.len(), "manifest read");

        let mut children = Vec::with_capacity(dependencies.len());
        for dependency in dependencies {
            let constraint = Constraint::new(
                ConstraintSource::Package(identity.clone()),
                dependency.range,
            );
            children.push(dependency.url.clone());
            self.constrain(dependency.url, constraint)?;
        }

        let entry = self.entry_mut(&identity);
        entry.stage = Stage::ManifestRead;
        entry.dependencies = children;
        entry.manifest_version = Some(version);
        Ok(())
    }

    fn record_update(
        &mut self,
        identity: PackageIdentity,
        range: VersionRange,
        version: Version,
    ) -> Result<(), ResolveError> {
        if !range.contains(&version) {
            return Err(ResolveError::VersionOutOfRange {
                identity,
                version,
                range,
            });
        }

        // Dependencies were recorded from the manifest that was read.
        let read = self.entry(&identity).manifest_version.clone();
        if let Some(read) = read.filter(|read| read != &version) {
            return Err(ResolveError::ManifestVersionMismatch {
                identity,
                read,
                updated: version,
            });
        }

        let entry = self.entry_mut(&identity);
        entry.stage = Stage::Updated;
        entry.version = Some(version);
        self.next_update += 1;
        Ok(())
    }

    fn constrain(
        &mut self,
        identity: PackageIdentity,
        constraint: Constraint,
    ) -> Result<(), ResolveError> {
        if let Some(entry) = self.packages.get_mut(&identity) {
            let narrowed = entry.constraints.add(&identity, constraint)?;
            debug!(%identity, range = %narrowed, "narrowed requirement");
            return Ok(());
        }

        let mut constraints = ConstraintSet::new(constraint);
        if let Some(pin) = self.pins.get(&identity) {
            constraints.add(
                &identity,
                Constraint::new(ConstraintSource::Pin, pin.clone()),
            )?;
        }

        debug!(%identity, range = %constraints.range(), "discovered package");
        self.packages.insert(
            identity.clone(),
            PackageEntry {
                stage: Stage::Discovered,
                constraints,
                dependencies: Vec::new(),
                manifest_version: None,
                version: None,
            },
        );
        self.discovered.push(identity.clone());
        self.pending_reads.push_back(identity);
        Ok(())
    }

    fn entry(&self, identity: &PackageIdentity) -> &PackageEntry {
        self.packages
            .get(identity)
            .expect("queued identities are always registered")
    }

    fn entry_mut(&mut self, identity: &PackageIdentity) -> &mut PackageEntry {
        self.packages
            .get_mut(identity)
            .expect("queued identities are always registered")
    }
}
