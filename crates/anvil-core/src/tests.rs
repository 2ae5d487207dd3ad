use proptest::prelude::*;

use super::*;

#[test]
fn parse_manifest() {
    let content = r#"
name = "app"
version = "1.4.0"

[[dependencies]]
url = "https://example.test/org/net.git"
range = "^2.1.0"

[[dependencies]]
url = "/repos/log"
range = "1.0.0...1.5.0"

[[targets]]
name = "App"
kind = "executable"
dependencies = ["Core", { target = "Net", package = "https://example.test/org/net.git" }]

[[targets]]
name = "Core"
dependencies = [{ target = "Log", package = "/repos/log" }]

[[targets]]
name = "CoreTests"
kind = "test"
dependencies = ["Core"]
"#;

    let manifest = PackageManifest::from_toml_str(content).expect("manifest must parse");
    assert_eq!(manifest.name, "app");
    assert_eq!(manifest.version, version(1, 4, 0));
    assert_eq!(manifest.dependencies.len(), 2);
    assert_eq!(
        manifest.dependencies[0].url,
        PackageIdentity::new("https://example.test/org/net.git")
    );
    assert_eq!(manifest.dependencies[0].range.to_string(), "2.1.0..<3.0.0");
    assert_eq!(manifest.dependencies[1].range.to_string(), "1.0.0...1.5.0");

    let app = manifest.target("App").expect("App target");
    assert_eq!(app.kind, TargetKind::Executable);
    assert_eq!(app.source_path(), "Sources/App");
    assert_eq!(
        app.dependencies,
        vec![
            TargetDependency::Local("Core".to_string()),
            TargetDependency::Package {
                target: "Net".to_string(),
                package: PackageIdentity::new("https://example.test/org/net.git"),
            },
        ]
    );
    assert_eq!(manifest.target("Core").expect("Core").kind, TargetKind::Library);
    assert_eq!(
        manifest.target("CoreTests").expect("tests").source_path(),
        "Tests/CoreTests"
    );
}

#[test]
fn explicit_target_path_overrides_convention() {
    let content = r#"
name = "lib"
version = "0.1.0"

[[targets]]
name = "Lib"
path = "src"
"#;

    let manifest = PackageManifest::from_toml_str(content).expect("manifest must parse");
    assert_eq!(manifest.targets[0].source_path(), "src");
}

#[test]
fn reject_duplicate_target() {
    let content = r#"
name = "lib"
version = "0.1.0"

[[targets]]
name = "Lib"

[[targets]]
name = "Lib"
"#;

    let err = PackageManifest::from_toml_str(content).expect_err("manifest should be rejected");
    assert!(
        err.to_string().contains("duplicate target 'Lib'"),
        "unexpected error: {err}"
    );
}

#[test]
fn reject_duplicate_dependency() {
    let content = r#"
name = "lib"
version = "0.1.0"

[[dependencies]]
url = "/repos/a"
range = "1.0.0"

[[dependencies]]
url = "/repos/a"
range = "2.0.0"
"#;

    let err = PackageManifest::from_toml_str(content).expect_err("manifest should be rejected");
    assert!(
        err.to_string().contains("more than once"),
        "unexpected error: {err}"
    );
}

#[test]
fn reject_self_dependent_target() {
    let content = r#"
name = "lib"
version = "0.1.0"

[[targets]]
name = "Lib"
dependencies = ["Lib"]
"#;

    let err = PackageManifest::from_toml_str(content).expect_err("manifest should be rejected");
    assert!(
        err.to_string().contains("depends on itself"),
        "unexpected error: {err}"
    );
}

#[test]
fn reject_target_from_undeclared_package() {
    let content = r#"
name = "lib"
version = "0.1.0"

[[targets]]
name = "Lib"
dependencies = [{ target = "Other", package = "/repos/other" }]
"#;

    let err = PackageManifest::from_toml_str(content).expect_err("manifest should be rejected");
    assert!(
        err.to_string().contains("undeclared package '/repos/other'"),
        "unexpected error: {err}"
    );
}

#[test]
fn reject_invalid_range() {
    let content = r#"
name = "lib"
version = "0.1.0"

[[dependencies]]
url = "/repos/a"
range = "2.0.0...1.0.0"
"#;

    let err = PackageManifest::from_toml_str(content).expect_err("manifest should be rejected");
    let chain = format!("{err:#}");
    assert!(chain.contains("is empty"), "unexpected error chain: {chain}");
}

#[test]
fn manifest_serializes_back_to_equivalent_toml() {
    let content = r#"
name = "lib"
version = "0.1.0"

[[dependencies]]
url = "/repos/a"
range = "1.0.0..<1.2.0"
"#;

    let manifest = PackageManifest::from_toml_str(content).expect("manifest must parse");
    let rendered = toml::to_string(&manifest).expect("manifest must serialize");
    let reparsed = PackageManifest::from_toml_str(&rendered).expect("rendered must parse");
    assert_eq!(reparsed, manifest);
}

const GRID_MAJOR: u64 = 6;
const GRID_MINOR: u64 = 4;
const GRID_PATCH: u64 = 4;

fn grid_versions() -> Vec<Version> {
    let mut versions = Vec::new();
    for major in 0..=GRID_MAJOR {
        for minor in 0..=GRID_MINOR {
            for patch in 0..=GRID_PATCH {
                versions.push(version(major, minor, patch));
            }
        }
    }
    versions
}

fn arb_version() -> impl Strategy<Value = Version> {
    (0..=GRID_MAJOR, 0..=GRID_MINOR, 0..=GRID_PATCH)
        .prop_map(|(major, minor, patch)| version(major, minor, patch))
}

fn arb_range() -> impl Strategy<Value = VersionRange> {
    (arb_version(), arb_version(), any::<bool>()).prop_map(|(a, b, inclusive)| {
        let (lower, upper) = if compare_versions(&a, &b).is_le() {
            (a, b)
        } else {
            (b, a)
        };
        if inclusive {
            VersionRange::closed(lower, upper).expect("sorted bounds form a non-empty range")
        } else {
            VersionRange::half_open(lower.clone(), upper)
                .unwrap_or_else(|| VersionRange::exact(lower))
        }
    })
}

proptest! {
    #[test]
    fn intersect_is_commutative(a in arb_range(), b in arb_range()) {
        prop_assert_eq!(a.intersect(&b), b.intersect(&a));
    }

    #[test]
    fn intersect_contains_exactly_the_shared_versions(a in arb_range(), b in arb_range()) {
        let intersection = a.intersect(&b);
        for candidate in grid_versions() {
            let in_both = a.contains(&candidate) && b.contains(&candidate);
            let in_result = intersection.as_ref().is_some_and(|r| r.contains(&candidate));
            prop_assert_eq!(in_both, in_result, "version {}", candidate);
        }
    }

    #[test]
    fn intersect_is_independent_of_edge_order(
        a in arb_range(),
        b in arb_range(),
        c in arb_range(),
    ) {
        let left = a.intersect(&b).and_then(|ab| ab.intersect(&c));
        let right = b.intersect(&c).and_then(|bc| a.intersect(&bc));
        let rotated = c.intersect(&a).and_then(|ca| ca.intersect(&b));
        prop_assert_eq!(&left, &right);
        prop_assert_eq!(&left, &rotated);
    }
}
