use std::collections::{BTreeMap, BTreeSet, HashSet};

use anvil_core::PackageIdentity;

use crate::error::ResolveError;
use crate::types::ResolvedPackage;

/// Dependency-first order over resolved packages; ties go to the smaller
/// identity.
pub(crate) fn topo_order(
    packages: &BTreeMap<PackageIdentity, ResolvedPackage>,
) -> Result<Vec<PackageIdentity>, ResolveError> {
    let mut reverse: BTreeMap<&PackageIdentity, BTreeSet<&PackageIdentity>> = BTreeMap::new();
    let mut in_degree: BTreeMap<&PackageIdentity, usize> = BTreeMap::new();

    for (identity, package) in packages {
        let deps: BTreeSet<&PackageIdentity> = package
            .dependencies
            .iter()
            .filter(|dep| packages.contains_key(*dep))
            .collect();
        in_degree.insert(identity, deps.len());
        reverse.entry(identity).or_default();
        for dep in deps {
            reverse.entry(dep).or_default().insert(identity);
        }
    }

    let mut ready: BTreeSet<&PackageIdentity> = in_degree
        .iter()
        .filter_map(|(identity, degree)| (*degree == 0).then_some(*identity))
        .collect();
    let mut ordered = Vec::new();

    while let Some(next) = ready.pop_first() {
        ordered.push(next.clone());
        if let Some(dependents) = reverse.get(next) {
            for dependent in dependents {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }
    }

    if ordered.len() != packages.len() {
        let ordered_set: HashSet<&PackageIdentity> = ordered.iter().collect();
        let cycle = packages
            .keys()
            .filter(|identity| !ordered_set.contains(identity))
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        return Err(ResolveError::DependencyCycle { cycle });
    }

    Ok(ordered)
}
