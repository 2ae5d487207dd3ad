use std::fs;
use std::path::Path;

use anvil_core::{version, PackageIdentity, VersionRange};
use anvil_registry::RegistryIndex;
use anvil_resolver::{Constraint, ConstraintSource, Lockfile, ResolveError, LOCK_FILE};
use clap::Parser;

use super::*;
use crate::completion::write_completions_script;
use crate::core_flows::{
    is_pin_conflict, load_build_config, lower_workspace, plan_workspace, resolve_workspace,
    PlanOverrides,
};
use crate::render::{
    format_module_lines, format_resolved_lines, render_error, render_status_line,
    resolve_output_style, resolved_graph_json, OutputStyle,
};

#[test]
fn parses_resolve_with_json_flag() {
    let cli = Cli::try_parse_from(["anvil", "--registry-root", "/reg", "resolve", "pkg", "--json"])
        .expect("must parse");
    assert_eq!(cli.registry_root.as_deref(), Some(Path::new("/reg")));
    match cli.command {
        Commands::Resolve { package_dir, json } => {
            assert_eq!(package_dir, Path::new("pkg"));
            assert!(json);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parses_plan_overrides_and_repeated_verbosity() {
    let cli = Cli::try_parse_from([
        "anvil",
        "plan",
        "-vv",
        "--configuration",
        "release",
        "--toolchain",
        "/opt/anvilc",
        "--output",
        "out.yaml",
    ])
    .expect("must parse");
    assert_eq!(cli.verbose, 2);
    match cli.command {
        Commands::Plan {
            package_dir,
            configuration,
            toolchain,
            output,
            build_dir,
        } => {
            assert_eq!(package_dir, Path::new("."));
            assert_eq!(configuration.as_deref(), Some("release"));
            assert_eq!(toolchain.as_deref(), Some(Path::new("/opt/anvilc")));
            assert_eq!(output.as_deref(), Some(Path::new("out.yaml")));
            assert!(build_dir.is_none());
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn rejects_unknown_completion_shell() {
    let err = Cli::try_parse_from(["anvil", "completions", "tcsh"]).expect_err("must reject");
    assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
}

#[test]
fn verbosity_raises_default_log_level() {
    assert_eq!(default_log_level(0), "warn");
    assert_eq!(default_log_level(1), "info");
    assert_eq!(default_log_level(2), "debug");
    assert_eq!(default_log_level(7), "trace");
}

#[test]
fn output_style_is_rich_only_on_a_color_terminal() {
    assert_eq!(resolve_output_style(true, false), OutputStyle::Rich);
    assert_eq!(resolve_output_style(true, true), OutputStyle::Plain);
    assert_eq!(resolve_output_style(false, false), OutputStyle::Plain);
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "locked 3 packages"),
        "locked 3 packages"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "ok", "locked 3 packages"),
        "[OK] locked 3 packages"
    );
}

#[test]
fn render_error_prefixes_the_full_chain() {
    let err = anyhow::anyhow!("registry offline").context("failed to fetch 'log'");
    assert_eq!(
        render_error(OutputStyle::Plain, &err),
        "error: failed to fetch 'log': registry offline"
    );

    let rich = render_error(OutputStyle::Rich, &err);
    assert!(rich.starts_with('\u{1b}'), "expected ANSI prefix: {rich:?}");
    assert!(rich.ends_with("failed to fetch 'log': registry offline"));
}

#[test]
fn pin_conflicts_are_recognized_through_context() {
    let conflict = anyhow::Error::new(ResolveError::Unsatisfiable {
        identity: PackageIdentity::new("log"),
        constraints: vec![
            Constraint::new(ConstraintSource::Root, range("^1.0.0")),
            Constraint::new(ConstraintSource::Pin, VersionRange::exact(version(0, 9, 0))),
        ],
    })
    .context("resolution failed");
    assert!(is_pin_conflict(&conflict));

    let plain = anyhow::Error::new(ResolveError::Unsatisfiable {
        identity: PackageIdentity::new("log"),
        constraints: vec![Constraint::new(ConstraintSource::Root, range("^1.0.0"))],
    });
    assert!(!is_pin_conflict(&plain));
    assert!(!is_pin_conflict(&anyhow::anyhow!("io failure")));
}

#[test]
fn resolve_writes_lockfile_once() {
    let fixture = Fixture::new();

    let first = resolve_workspace(&fixture.package_dir(), &fixture.index()).expect("must resolve");
    assert!(first.lockfile_updated);
    assert_eq!(
        format_resolved_lines(&first.graph),
        vec!["log 1.2.0 (1.0.0..<2.0.0)".to_string()]
    );

    let lockfile = Lockfile::read(&fixture.package_dir().join(LOCK_FILE))
        .expect("must read lockfile")
        .expect("lockfile exists");
    assert_eq!(lockfile.packages.len(), 1);
    assert_eq!(lockfile.packages[0].version, version(1, 2, 0));

    let second = resolve_workspace(&fixture.package_dir(), &fixture.index()).expect("must resolve");
    assert!(!second.lockfile_updated);
}

#[test]
fn resolve_honours_locked_versions() {
    let fixture = Fixture::new();
    fs::write(
        fixture.package_dir().join(LOCK_FILE),
        "version = 1\n\n[[package]]\nidentity = \"log\"\nversion = \"1.0.0\"\n",
    )
    .expect("must write lockfile");

    let workspace = resolve_workspace(&fixture.package_dir(), &fixture.index()).expect("must resolve");
    let log = workspace
        .graph
        .package(&PackageIdentity::new("log"))
        .expect("log resolved");
    assert_eq!(log.version, version(1, 0, 0));
    assert!(!workspace.lockfile_updated);
}

#[test]
fn resolve_drops_locked_versions_that_conflict() {
    let fixture = Fixture::new();
    fs::write(
        fixture.package_dir().join(LOCK_FILE),
        "version = 1\n\n[[package]]\nidentity = \"log\"\nversion = \"0.9.0\"\n",
    )
    .expect("must write lockfile");

    let workspace = resolve_workspace(&fixture.package_dir(), &fixture.index()).expect("must resolve");
    let log = workspace
        .graph
        .package(&PackageIdentity::new("log"))
        .expect("log resolved");
    assert_eq!(log.version, version(1, 2, 0));
    assert!(workspace.lockfile_updated);
}

#[test]
fn resolved_graph_renders_as_json() {
    let fixture = Fixture::new();
    let workspace = resolve_workspace(&fixture.package_dir(), &fixture.index()).expect("must resolve");

    let value = resolved_graph_json(&workspace.graph);
    assert_eq!(value["packages"][0]["identity"], "log");
    assert_eq!(value["packages"][0]["version"], "1.2.0");
    assert_eq!(value["packages"][0]["range"], "1.0.0..<2.0.0");
}

#[test]
fn modules_are_listed_dependencies_first() {
    let fixture = Fixture::new();
    let workspace = resolve_workspace(&fixture.package_dir(), &fixture.index()).expect("must resolve");
    let graph = lower_workspace(&workspace).expect("must lower");

    assert_eq!(
        format_module_lines(&graph),
        vec![
            "Log [library] log".to_string(),
            "Core [library] app <- Log".to_string(),
            "App [executable] app <- Core".to_string(),
        ]
    );
}

#[test]
fn build_config_overrides_apply_relative_to_package() {
    let fixture = Fixture::new();
    fs::write(
        fixture.package_dir().join(anvil_build::CONFIG_FILE),
        "[build]\nlinker = \"/usr/bin/ld\"\n",
    )
    .expect("must write config");

    let overrides = PlanOverrides {
        build_dir: Some("out".into()),
        configuration: Some("Release".to_string()),
        toolchain: Some("/opt/anvilc".into()),
        ..PlanOverrides::default()
    };
    let config = load_build_config(&fixture.package_dir(), &overrides).expect("must load");
    assert_eq!(config.build_dir, fixture.package_dir().join("out"));
    assert_eq!(config.configuration, anvil_build::Configuration::Release);
    assert_eq!(config.compiler, Path::new("/opt/anvilc"));
    assert_eq!(config.linker, Path::new("/usr/bin/ld"));

    let invalid = PlanOverrides {
        configuration: Some("fast".to_string()),
        ..PlanOverrides::default()
    };
    let err = load_build_config(&fixture.package_dir(), &invalid).expect_err("must reject");
    assert!(err.to_string().contains("invalid configuration 'fast'"));
}

#[test]
fn plan_writes_manifest_and_auxiliary_files() {
    let fixture = Fixture::new();

    let outcome = plan_workspace(&fixture.package_dir(), &fixture.index(), &PlanOverrides::default())
        .expect("must plan");
    assert!(outcome.written);
    assert_eq!(outcome.auxiliary_files, 1);
    assert_eq!(
        outcome.manifest_path,
        fixture.package_dir().join(".build/debug.yaml")
    );

    let rendered = fs::read_to_string(&outcome.manifest_path).expect("must read manifest");
    assert!(rendered.contains("  \"C.Log-debug.module\":\n"));
    assert!(rendered.contains("  \"C.App-debug.exe\":\n"));

    let again = plan_workspace(&fixture.package_dir(), &fixture.index(), &PlanOverrides::default())
        .expect("must plan");
    assert!(!again.written);
    assert_eq!(again.auxiliary_files, 0);
}

#[test]
fn plan_reports_missing_manifest() {
    let fixture = Fixture::new();
    let missing = fixture.root().join("nowhere");
    let err = plan_workspace(&missing, &fixture.index(), &PlanOverrides::default())
        .expect_err("must fail");
    assert!(err.to_string().contains("failed to read package manifest"));
}

#[test]
fn completions_name_the_binary() {
    let mut out = Vec::new();
    write_completions_script(clap_complete::Shell::Bash, &mut out).expect("must generate");
    let script = String::from_utf8(out).expect("utf-8");
    assert!(script.contains("anvil"));
}

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("must create tempdir");
        let fixture = Self { dir };
        let log_manifest = |v: &str| format!("name = \"log\"\nversion = \"{v}\"\n\n[[targets]]\nname = \"Log\"\n");
        for v in ["1.0.0", "1.2.0"] {
            let index_dir = fixture.registry().join("index/log");
            fs::create_dir_all(&index_dir).expect("must create index dir");
            fs::write(index_dir.join(format!("{v}.toml")), log_manifest(v)).expect("must publish");

            let checkout = fixture.registry().join("checkouts/log").join(v);
            fs::create_dir_all(checkout.join("Sources/Log")).expect("must create checkout");
            fs::write(checkout.join("anvil.toml"), log_manifest(v)).expect("must write checkout manifest");
        }

        fs::create_dir_all(fixture.package_dir()).expect("must create package dir");
        fs::write(
            fixture.package_dir().join("anvil.toml"),
            r#"name = "app"
version = "0.1.0"

[[dependencies]]
url = "log"
range = "^1.0.0"

[[targets]]
name = "App"
kind = "executable"
dependencies = ["Core"]

[[targets]]
name = "Core"
dependencies = [{ target = "Log", package = "log" }]
"#,
        )
        .expect("must write package manifest");
        fixture
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn registry(&self) -> std::path::PathBuf {
        self.root().join("registry")
    }

    fn package_dir(&self) -> std::path::PathBuf {
        self.root().join("app")
    }

    fn index(&self) -> RegistryIndex {
        RegistryIndex::open(self.registry())
    }
}

fn range(value: &str) -> VersionRange {
    value.parse().expect("range must parse")
}
