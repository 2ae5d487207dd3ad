use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anvil_core::{version, Dependency, PackageIdentity, VersionRange};
use anvil_resolver::{resolve_dependency_graph, Collaborator};

use super::*;

#[test]
fn package_versions_are_sorted_newest_first() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    publish(tmp.path(), "log", "1.0.0", &[]);
    publish(tmp.path(), "log", "1.2.0", &[]);
    publish(tmp.path(), "log", "1.10.0", &[]);

    let index = RegistryIndex::open(tmp.path());
    let versions = index
        .package_versions(&identity("log"))
        .expect("must read versions")
        .into_iter()
        .map(|m| m.version)
        .collect::<Vec<_>>();
    assert_eq!(versions, vec![version(1, 10, 0), version(1, 2, 0), version(1, 0, 0)]);
}

#[test]
fn package_versions_of_unknown_package_are_empty() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    let index = RegistryIndex::open(tmp.path());
    let versions = index
        .package_versions(&identity("missing"))
        .expect("missing package is not an error");
    assert!(versions.is_empty());
}

#[test]
fn package_versions_reject_mismatched_file_name() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    publish(tmp.path(), "log", "1.0.0", &[]);
    let dir = tmp.path().join("index/log");
    fs::copy(dir.join("1.0.0.toml"), dir.join("2.0.0.toml")).expect("must copy manifest");

    let err = RegistryIndex::open(tmp.path())
        .package_versions(&identity("log"))
        .expect_err("mismatched version must fail");
    assert!(err.to_string().contains("declares version 1.0.0"));
}

#[test]
fn package_versions_ignore_non_manifest_files() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    publish(tmp.path(), "log", "1.0.0", &[]);
    fs::write(tmp.path().join("index/log/README.md"), "notes").expect("must write file");

    let versions = RegistryIndex::open(tmp.path())
        .package_versions(&identity("log"))
        .expect("must read versions");
    assert_eq!(versions.len(), 1);
}

#[test]
fn checkout_path_uses_identity_name() {
    let index = RegistryIndex::open("/registry");
    let path = index.checkout_path(
        &PackageIdentity::new("https://example.test/org/log.git"),
        &version(1, 2, 3),
    );
    assert_eq!(path, Path::new("/registry/checkouts/log/1.2.3"));
}

#[test]
fn fetch_rejects_unknown_package() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    let mut collaborator = RegistryCollaborator::new(RegistryIndex::open(tmp.path()));
    let err = collaborator
        .fetch(&identity("ghost"))
        .expect_err("unknown package must fail");
    assert!(err.to_string().contains("'ghost' was not found"));
}

#[test]
fn read_manifest_picks_highest_version_in_range() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    publish(tmp.path(), "log", "1.0.0", &[]);
    publish(tmp.path(), "log", "1.4.0", &[]);
    publish(tmp.path(), "log", "2.0.0", &[]);

    let mut collaborator = RegistryCollaborator::new(RegistryIndex::open(tmp.path()));
    let manifest = collaborator
        .read_manifest(&identity("log"), &range("^1.0.0"))
        .expect("must read manifest");
    assert_eq!(manifest.version, version(1, 4, 0));

    let err = collaborator
        .read_manifest(&identity("log"), &range("3.0.0...4.0.0"))
        .expect_err("empty selection must fail");
    assert!(err.to_string().contains("available: 2.0.0, 1.4.0, 1.0.0"));
}

#[test]
fn update_requires_a_checkout() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    publish(tmp.path(), "log", "1.0.0", &[]);

    let mut collaborator = RegistryCollaborator::new(RegistryIndex::open(tmp.path()));
    let err = collaborator
        .update(&identity("log"), &range("^1.0.0"))
        .expect_err("missing checkout must fail");
    assert!(err.to_string().contains("is missing"));

    check_out(tmp.path(), "log", "1.0.0");
    let selected = collaborator
        .update(&identity("log"), &range("^1.0.0"))
        .expect("must update");
    assert_eq!(selected, version(1, 0, 0));

    let checkout = collaborator.checkout(&identity("log")).expect("recorded");
    assert_eq!(checkout.path, tmp.path().join("checkouts/log/1.0.0"));
    assert_eq!(checkout.manifest.name, "log");
}

#[test]
fn update_records_the_manifest_shipped_in_the_checkout() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    publish(tmp.path(), "log", "1.0.0", &[]);
    let dir = tmp.path().join("checkouts/log/1.0.0");
    fs::create_dir_all(&dir).expect("must create checkout");
    fs::write(
        dir.join(anvil_core::MANIFEST_FILE),
        "name = \"log\"\nversion = \"1.0.0\"\n\n[[targets]]\nname = \"Log\"\n",
    )
    .expect("must write checkout manifest");

    let mut collaborator = RegistryCollaborator::new(RegistryIndex::open(tmp.path()));
    collaborator
        .update(&identity("log"), &range("^1.0.0"))
        .expect("must update");

    let checkout = collaborator.checkout(&identity("log")).expect("recorded");
    let targets = checkout
        .manifest
        .targets
        .iter()
        .map(|target| target.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(targets, vec!["Log"]);
}

#[test]
fn update_rejects_checkout_declaring_another_version() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    publish(tmp.path(), "log", "1.0.0", &[]);
    let dir = tmp.path().join("checkouts/log/1.0.0");
    fs::create_dir_all(&dir).expect("must create checkout");
    fs::write(
        dir.join(anvil_core::MANIFEST_FILE),
        manifest_toml("log", "0.9.0", &[]),
    )
    .expect("must write checkout manifest");

    let mut collaborator = RegistryCollaborator::new(RegistryIndex::open(tmp.path()));
    let err = collaborator
        .update(&identity("log"), &range("^1.0.0"))
        .expect_err("mismatched checkout must fail");
    assert!(err.to_string().contains("declares version 0.9.0 instead of 1.0.0"), "{err}");
    assert!(collaborator.checkout(&identity("log")).is_none());
}

#[test]
fn fetch_rejects_identities_sharing_a_registry_name() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    publish(tmp.path(), "a", "1.0.0", &[]);

    let mut collaborator = RegistryCollaborator::new(RegistryIndex::open(tmp.path()));
    collaborator
        .fetch(&identity("https://x.test/a.git"))
        .expect("first identity claims the name");
    collaborator
        .fetch(&identity("https://x.test/a.git"))
        .expect("same identity may fetch again");

    let err = collaborator
        .fetch(&identity("https://y.test/a"))
        .expect_err("second identity must be rejected");
    assert!(
        err.to_string()
            .contains("'https://x.test/a.git' and 'https://y.test/a' both map to registry name 'a'"),
        "{err}"
    );
}

#[test]
fn resolves_a_diamond_from_disk() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    let root = tmp.path();
    publish(root, "app-core", "1.0.0", &[("log", "1.0.0...1.5.0")]);
    publish(root, "net", "2.1.0", &[("log", "^1.2.0")]);
    for v in ["1.1.0", "1.3.0", "1.6.0"] {
        publish(root, "log", v, &[]);
    }
    check_out(root, "app-core", "1.0.0");
    check_out(root, "net", "2.1.0");
    check_out(root, "log", "1.3.0");

    let mut collaborator = RegistryCollaborator::new(RegistryIndex::open(root));
    let roots = vec![
        Dependency::new("app-core", range("^1.0.0")),
        Dependency::new("net", range("^2.0.0")),
    ];
    let graph = resolve_dependency_graph(&roots, &BTreeMap::new(), &mut collaborator)
        .expect("must resolve");

    let log = graph.package(&identity("log")).expect("log resolved");
    assert_eq!(log.version, version(1, 3, 0));
    assert_eq!(log.range, range("1.2.0...1.5.0"));
    assert_eq!(graph.build_order.first(), Some(&identity("log")));

    for name in ["app-core", "net", "log"] {
        assert!(collaborator.checkout(&identity(name)).is_some(), "{name} checked out");
    }
}

fn identity(name: &str) -> PackageIdentity {
    PackageIdentity::new(name)
}

fn range(value: &str) -> VersionRange {
    value.parse().expect("range must parse")
}

fn publish(root: &Path, name: &str, version: &str, dependencies: &[(&str, &str)]) {
    let dir = root.join("index").join(name);
    fs::create_dir_all(&dir).expect("must create package dir");
    fs::write(dir.join(format!("{version}.toml")), manifest_toml(name, version, dependencies))
        .expect("must write manifest");
}

fn check_out(root: &Path, name: &str, version: &str) {
    let dir = root.join("checkouts").join(name).join(version);
    fs::create_dir_all(&dir).expect("must create checkout");
    let manifest = fs::read_to_string(root.join("index").join(name).join(format!("{version}.toml")))
        .expect("must read published manifest");
    fs::write(dir.join(anvil_core::MANIFEST_FILE), manifest).expect("must write checkout manifest");
}

fn manifest_toml(name: &str, version: &str, dependencies: &[(&str, &str)]) -> String {
    let mut content = format!("name = \"{name}\"\nversion = \"{version}\"\n");
    for (url, range) in dependencies {
        content.push_str(&format!(
            "\n[[dependencies]]\nurl = \"{url}\"\nrange = \"{range}\"\n"
        ));
    }
    content
}
