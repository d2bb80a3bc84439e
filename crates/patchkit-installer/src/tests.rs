use super::*;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use patchkit_core::{ArtifactCoordinate, PatchDescriptor, VersionRange};

static TEST_ROOT_COUNTER: AtomicU64 = AtomicU64::new(0);

fn build_test_root_path(nanos: u128) -> PathBuf {
    let mut path = std::env::temp_dir();
    let sequence = TEST_ROOT_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.push(format!(
        "patchkit-installer-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        sequence
    ));
    path
}

fn test_root() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    build_test_root_path(nanos)
}

fn test_layout() -> InstallLayout {
    let layout = InstallLayout::new(test_root());
    layout.ensure_base_dirs().expect("must create dirs");
    layout
}

fn write_file(path: &Path, contents: &[u8]) {
    fs::create_dir_all(path.parent().expect("parent")).expect("must create parent");
    fs::write(path, contents).expect("must write file");
}

fn coordinate(uri: &str) -> ArtifactCoordinate {
    ArtifactCoordinate::parse_uri(uri).expect("coordinate must parse")
}

fn range(spec: &str) -> VersionRange {
    VersionRange::parse(spec).expect("range must parse")
}

fn lines(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|line| line.to_string()).collect()
}

#[derive(Default)]
struct MemoryLogger {
    entries: RefCell<Vec<(LogLevel, String)>>,
}

impl MemoryLogger {
    fn messages(&self, level: LogLevel) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|(entry_level, _)| *entry_level == level)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl PatchLogger for MemoryLogger {
    fn log(&self, level: LogLevel, message: &str) {
        self.entries.borrow_mut().push((level, message.to_string()));
    }
}

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().expect("buffer lock").clone()).expect("utf8 output")
    }
}

impl std::io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn build_test_root_path_disambiguates_same_timestamp_calls() {
    assert_ne!(build_test_root_path(42), build_test_root_path(42));
}

#[test]
fn layout_paths_match_distribution_layout() {
    let layout = InstallLayout::new("/opt/app");
    let artifact = coordinate("mvn:com.foo/bar/1.0.1");
    assert_eq!(
        layout.overrides_path(),
        Path::new("/opt/app/etc/overrides.properties")
    );
    assert_eq!(
        layout.startup_path(),
        Path::new("/opt/app/etc/startup.properties")
    );
    assert_eq!(
        layout.artifact_path(&artifact),
        Path::new("/opt/app/system/com/foo/bar/1.0.1/bar-1.0.1.jar")
    );
    assert_eq!(
        layout.backup_path("p1", "etc/config.properties"),
        Path::new("/opt/app/data/patch/backups/p1/etc/config.properties")
    );
    assert_eq!(
        layout.deploy_path("migrator"),
        Path::new("/opt/app/deploy/migrator.jar")
    );
}

#[test]
fn missing_registry_reads_as_empty() {
    let layout = test_layout();
    let read = read_registry_lines(&layout.overrides_path()).expect("must read");
    assert!(read.is_empty());

    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn persisted_registry_is_deduplicated_and_sorted() {
    let layout = test_layout();
    let path = layout.overrides_path();

    let written = persist_registry(
        &path,
        lines(&[
            "mvn:org.zeta/z/1.0",
            "mvn:com.alpha/a/1.0",
            "# comment",
            "mvn:org.zeta/z/1.0",
        ]),
    )
    .expect("must persist");
    assert_eq!(
        written,
        lines(&["# comment", "mvn:com.alpha/a/1.0", "mvn:org.zeta/z/1.0"])
    );

    let raw = fs::read_to_string(&path).expect("must read back");
    assert_eq!(raw, "# comment\nmvn:com.alpha/a/1.0\nmvn:org.zeta/z/1.0\n");
    let leftovers: Vec<_> = fs::read_dir(layout.etc_dir())
        .expect("etc dir")
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".part"))
        .collect();
    assert!(leftovers.is_empty(), "temporary registry files must not remain");

    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn override_line_carries_explicit_range_only() {
    assert_eq!(
        override_line(" mvn:com.foo/bar/1.0.5 ", Some("[1.0,2.0)")),
        "mvn:com.foo/bar/1.0.5;range=[1.0,2.0)"
    );
    assert_eq!(
        override_line("mvn:com.foo/bar/1.0.5", None),
        "mvn:com.foo/bar/1.0.5"
    );
}

#[test]
fn override_lines_with_range_suffix_parse_to_their_coordinate() {
    let parsed =
        parse_override_line("mvn:com.foo/bar/1.0.5;range=[1.0,2.0)").expect("must parse");
    assert_eq!(parsed, coordinate("mvn:com.foo/bar/1.0.5"));
}

#[test]
fn override_merge_appends_unmatched_candidates() {
    let logger = MemoryLogger::default();
    let mut registry = Vec::new();

    let first = coordinate("mvn:com.foo/bar/1.0.0");
    let outcome = merge_override(
        &mut registry,
        &first,
        &VersionRange::default_for(&first.parsed_version()),
        "mvn:com.foo/bar/1.0.0",
        &logger,
    );
    assert!(!outcome.matched);
    assert!(!outcome.replaced);
    assert_eq!(registry, lines(&["mvn:com.foo/bar/1.0.0"]));

    let older = coordinate("mvn:com.foo/bar/0.9.0");
    let older_range = VersionRange::default_for(&older.parsed_version());
    assert_eq!(older_range.to_string(), "[0.9.0,0.10.0)");
    let outcome = merge_override(
        &mut registry,
        &older,
        &older_range,
        "mvn:com.foo/bar/0.9.0",
        &logger,
    );
    assert!(!outcome.matched, "1.0.0 lies outside the 0.9 range");

    assert_eq!(
        normalize_registry_lines(registry),
        lines(&["mvn:com.foo/bar/0.9.0", "mvn:com.foo/bar/1.0.0"])
    );
}

#[test]
fn override_merge_replaces_older_entry_in_range() {
    let logger = MemoryLogger::default();
    let mut registry = lines(&["mvn:com.foo/bar/1.0.0"]);
    let candidate = coordinate("mvn:com.foo/bar/1.0.5");
    let line = override_line("mvn:com.foo/bar/1.0.5", Some("[1.0,2.0)"));

    let outcome = merge_override(
        &mut registry,
        &candidate,
        &range("[1.0,2.0)"),
        &line,
        &logger,
    );

    assert!(outcome.matched);
    assert!(outcome.replaced);
    assert_eq!(outcome.superseded, vec![coordinate("mvn:com.foo/bar/1.0.0")]);
    assert_eq!(registry, lines(&["mvn:com.foo/bar/1.0.5;range=[1.0,2.0)"]));
}

#[test]
fn override_merge_keeps_newer_entry() {
    let logger = MemoryLogger::default();
    let mut registry = lines(&["mvn:com.foo/bar/1.0.9"]);
    let candidate = coordinate("mvn:com.foo/bar/1.0.5");

    let outcome = merge_override(
        &mut registry,
        &candidate,
        &range("[1.0,2.0)"),
        "mvn:com.foo/bar/1.0.5;range=[1.0,2.0)",
        &logger,
    );

    assert!(outcome.matched);
    assert!(!outcome.replaced);
    assert!(outcome.superseded.is_empty());
    assert_eq!(registry, lines(&["mvn:com.foo/bar/1.0.9"]));
}

#[test]
fn override_merge_is_idempotent() {
    for (initial, uri, spec) in [
        (vec![], "mvn:com.foo/bar/1.0.0", None),
        (
            vec!["mvn:com.foo/bar/1.0.0"],
            "mvn:com.foo/bar/1.0.5",
            Some("[1.0,2.0)"),
        ),
    ] {
        let logger = MemoryLogger::default();
        let candidate = coordinate(uri);
        let candidate_range = match spec {
            Some(spec) => range(spec),
            None => VersionRange::default_for(&candidate.parsed_version()),
        };
        let line = override_line(uri, spec);

        let mut once = lines(&initial);
        merge_override(&mut once, &candidate, &candidate_range, &line, &logger);
        let once = normalize_registry_lines(once);

        let mut twice = once.clone();
        let second = merge_override(&mut twice, &candidate, &candidate_range, &line, &logger);
        assert!(second.matched);
        assert!(!second.replaced);
        assert_eq!(normalize_registry_lines(twice), once, "candidate {uri}");
    }
}

#[test]
fn override_merge_preserves_comments_and_warns_on_unparsable_lines() {
    let logger = MemoryLogger::default();
    let mut registry = lines(&["# managed by patches", "", "not-a-uri", "mvn:broken/only"]);
    let candidate = coordinate("mvn:com.foo/bar/1.0.0");

    merge_override(
        &mut registry,
        &candidate,
        &VersionRange::default_for(&candidate.parsed_version()),
        "mvn:com.foo/bar/1.0.0",
        &logger,
    );

    assert_eq!(
        registry,
        lines(&[
            "# managed by patches",
            "",
            "not-a-uri",
            "mvn:broken/only",
            "mvn:com.foo/bar/1.0.0",
        ])
    );
    assert_eq!(logger.messages(LogLevel::Warn).len(), 2);
}

#[test]
fn override_merge_ignores_other_artifact_shapes() {
    let logger = MemoryLogger::default();
    let mut registry = lines(&["mvn:com.foo/bar/1.0.0/war", "mvn:com.foo/bar/1.0.0/jar/tests"]);
    let candidate = coordinate("mvn:com.foo/bar/1.0.5");

    let outcome = merge_override(
        &mut registry,
        &candidate,
        &range("[1.0,2.0)"),
        "mvn:com.foo/bar/1.0.5",
        &logger,
    );

    assert!(!outcome.matched);
    assert_eq!(registry.len(), 3);
}

#[test]
fn startup_pin_rewrite_preserves_start_level() {
    let logger = MemoryLogger::default();
    let mut registry = lines(&["com/foo/bar/1.0.0/bar-1.0.0.jar=30"]);
    let candidate = coordinate("mvn:com.foo/bar/1.0.1");

    let outcome = merge_startup_pin(&mut registry, &candidate, &range("[1.0,2.0)"), &logger);

    assert!(outcome.matched);
    assert!(outcome.replaced);
    assert_eq!(registry, lines(&["com/foo/bar/1.0.1/bar-1.0.1.jar=30"]));
}

#[test]
fn startup_pin_merge_never_appends_and_skips_foreign_paths_silently() {
    let logger = MemoryLogger::default();
    let mut registry = lines(&["# bootstrap", "lib/boot.jar=5", "org/other/x/2.0/x-2.0.jar=10"]);
    let candidate = coordinate("mvn:com.foo/bar/1.0.1");

    let outcome = merge_startup_pin(&mut registry, &candidate, &range("[1.0,2.0)"), &logger);

    assert_eq!(outcome, MergeOutcome::default());
    assert_eq!(
        registry,
        lines(&["# bootstrap", "lib/boot.jar=5", "org/other/x/2.0/x-2.0.jar=10"])
    );
    assert!(logger.messages(LogLevel::Warn).is_empty());
    assert!(logger.messages(LogLevel::Error).is_empty());
}

#[test]
fn startup_pin_without_separator_is_kept_with_warning() {
    let logger = MemoryLogger::default();
    let mut registry = lines(&["com/foo/bar/1.0.0/bar-1.0.0.jar"]);
    let candidate = coordinate("mvn:com.foo/bar/1.0.1");

    let outcome = merge_startup_pin(&mut registry, &candidate, &range("[1.0,2.0)"), &logger);

    assert!(!outcome.matched);
    assert_eq!(registry, lines(&["com/foo/bar/1.0.0/bar-1.0.0.jar"]));
    assert_eq!(logger.messages(LogLevel::Warn).len(), 1);
}

#[test]
fn parse_startup_pin_reports_unrecognized_paths() {
    let err = parse_startup_pin("lib/boot.jar=5").expect_err("must not be an artifact pin");
    assert_eq!(
        err,
        PatchError::UnrecognizedPath {
            path: "lib/boot.jar".to_string()
        }
    );

    let pin = parse_startup_pin(" com/foo/bar/1.0.0/bar-1.0.0.jar=30 ").expect("must parse");
    assert_eq!(pin.path, "com/foo/bar/1.0.0/bar-1.0.0.jar");
    assert_eq!(pin.start_level_suffix, "=30");
    assert_eq!(pin.coordinate, coordinate("mvn:com.foo/bar/1.0.0"));
}

#[test]
fn backup_and_restore_round_trip_existing_file() {
    let layout = test_layout();
    let logger = MemoryLogger::default();
    let store = BackupStore::new(&layout, &logger);
    let original: Vec<u8> = (0u8..=255).collect();
    write_file(&layout.install_path("etc/config.properties"), &original);

    let backup = store
        .backup("p1", "etc/config.properties")
        .expect("must back up")
        .expect("existing file must produce a record");
    assert_eq!(backup, layout.backup_path("p1", "etc/config.properties"));

    write_file(&layout.install_path("etc/config.properties"), b"patched");
    let outcome = store
        .restore("p1", "etc/config.properties")
        .expect("must restore");

    assert_eq!(outcome, RestoreOutcome::Restored);
    assert_eq!(
        fs::read(layout.install_path("etc/config.properties")).expect("restored file"),
        original
    );
    assert!(!store.has_backup("p1", "etc/config.properties"));

    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn backup_of_missing_file_is_a_no_op_and_restore_deletes_added_file() {
    let layout = test_layout();
    let logger = MemoryLogger::default();
    let store = BackupStore::new(&layout, &logger);

    let backup = store.backup("p1", "etc/new.cfg").expect("must not fail");
    assert!(backup.is_none());

    write_file(&layout.install_path("etc/new.cfg"), b"added by patch");
    let outcome = store.restore("p1", "etc/new.cfg").expect("must restore");

    assert_eq!(outcome, RestoreOutcome::Removed);
    assert!(!layout.install_path("etc/new.cfg").exists());

    let outcome = store.restore("p1", "etc/new.cfg").expect("must restore");
    assert_eq!(outcome, RestoreOutcome::Absent);

    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn backup_keeps_first_snapshot_of_a_patch() {
    let layout = test_layout();
    let logger = MemoryLogger::default();
    let store = BackupStore::new(&layout, &logger);
    write_file(&layout.install_path("bin/start"), b"original");

    store.backup("p1", "bin/start").expect("first backup");
    write_file(&layout.install_path("bin/start"), b"patched");
    let second = store.backup("p1", "bin/start").expect("second backup");

    assert!(second.is_none());
    assert_eq!(
        fs::read(layout.backup_path("p1", "bin/start")).expect("backup"),
        b"original"
    );

    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn restore_removes_patch_backup_dir_only_when_empty() {
    let layout = test_layout();
    let logger = MemoryLogger::default();
    let store = BackupStore::new(&layout, &logger);
    write_file(&layout.install_path("README"), b"readme");
    write_file(&layout.install_path("etc/a.cfg"), b"a");

    store.backup("flat", "README").expect("backup");
    store.restore("flat", "README").expect("restore");
    assert!(!layout.patch_backup_dir("flat").exists());

    store.backup("nested", "etc/a.cfg").expect("backup");
    store.restore("nested", "etc/a.cfg").expect("restore");
    assert!(
        layout.patch_backup_dir("nested").join("etc").is_dir(),
        "cleanup is shallow and leaves nested directories behind"
    );

    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn extraction_never_overwrites_existing_artifact() {
    let layout = test_layout();
    let logger = MemoryLogger::default();
    let package_root = test_root();
    let artifact = coordinate("mvn:com.foo/bar/1.0.5");
    write_file(
        &package_root.join(repository_entry(&artifact.repository_path())),
        b"from patch",
    );
    write_file(&layout.artifact_path(&artifact), b"already installed");

    let extractor = ArtifactExtractor::new(&layout, &logger);
    let source = DirectoryPatchSource::new(&package_root);
    let first = extractor
        .extract(&source, std::slice::from_ref(&artifact))
        .expect("must extract");
    let second = extractor
        .extract(&source, std::slice::from_ref(&artifact))
        .expect("must extract");

    assert_eq!(first.already_present, vec![artifact.clone()]);
    assert_eq!(second.already_present, vec![artifact.clone()]);
    assert!(first.extracted.is_empty());
    assert_eq!(
        fs::read(layout.artifact_path(&artifact)).expect("installed artifact"),
        b"already installed"
    );

    let _ = fs::remove_dir_all(layout.root());
    let _ = fs::remove_dir_all(&package_root);
}

#[test]
fn extraction_skips_missing_payloads_and_continues() {
    let layout = test_layout();
    let logger = MemoryLogger::default();
    let package_root = test_root();
    let missing = coordinate("mvn:com.foo/gone/1.0.0");
    let present = coordinate("mvn:com.foo/bar/1.0.5/jar/tests");
    write_file(
        &package_root.join(repository_entry(&present.repository_path())),
        b"payload",
    );

    let extractor = ArtifactExtractor::new(&layout, &logger);
    let report = extractor
        .extract(
            &DirectoryPatchSource::new(&package_root),
            &[missing.clone(), present.clone()],
        )
        .expect("must not abort the batch");

    assert!(layout
        .artifact_path(&present)
        .ends_with("com/foo/bar/1.0.5/bar-tests-1.0.5.jar"));
    assert_eq!(report.missing, vec![missing.clone()]);
    assert_eq!(report.extracted, vec![present.clone()]);
    assert!(!layout.artifact_path(&missing).exists());
    assert_eq!(
        fs::read(layout.artifact_path(&present)).expect("extracted"),
        b"payload"
    );
    assert_eq!(logger.messages(LogLevel::Error).len(), 1);

    let _ = fs::remove_dir_all(layout.root());
    let _ = fs::remove_dir_all(&package_root);
}

#[test]
fn deletion_warns_about_absent_artifacts() {
    let layout = test_layout();
    let logger = MemoryLogger::default();
    let installed = coordinate("mvn:com.foo/bar/1.0.0");
    let absent = coordinate("mvn:com.foo/bar/0.9.0");
    write_file(&layout.artifact_path(&installed), b"old");

    let report = ArtifactExtractor::new(&layout, &logger)
        .delete(&[installed.clone(), absent.clone()])
        .expect("must delete");

    assert_eq!(report.deleted, vec![installed.clone()]);
    assert_eq!(report.not_found, vec![absent]);
    assert!(!layout.artifact_path(&installed).exists());
    assert_eq!(logger.messages(LogLevel::Warn).len(), 1);

    let _ = fs::remove_dir_all(layout.root());
}

const PACKAGE_DESCRIPTOR: &str = r#"
id = "patch-1"
description = "bar and baz fixes"
bundles = [
    "mvn:com.foo/bar/1.0.5",
    "mvn:com.foo/baz/2.0.0",
    "mvn:com.foo/migrator/1.0.0",
    "file:/opt/legacy.jar",
]
files = ["etc/config.properties", "etc/new.cfg", "etc/missing.cfg"]
migrator_bundle = "mvn:com.foo/migrator/1.0.0"

[version_ranges]
"mvn:com.foo/bar/1.0.5" = "[1.0,2.0)"
"#;

fn seed_install(layout: &InstallLayout) {
    write_file(
        &layout.overrides_path(),
        b"# overrides\nmvn:com.foo/bar/1.0.0\n",
    );
    write_file(
        &layout.startup_path(),
        b"lib/boot.jar=1\ncom/foo/bar/1.0.0/bar-1.0.0.jar=30\n",
    );
    write_file(
        &layout.artifact_path(&coordinate("mvn:com.foo/bar/1.0.0")),
        b"bar 1.0.0",
    );
    write_file(&layout.install_path("etc/config.properties"), b"old config");
}

fn seed_package(root: &Path) {
    write_file(&root.join("patch-1.patch"), PACKAGE_DESCRIPTOR.as_bytes());
    write_file(&root.join("README.txt"), b"not a descriptor");
    for uri in [
        "mvn:com.foo/bar/1.0.5",
        "mvn:com.foo/baz/2.0.0",
        "mvn:com.foo/migrator/1.0.0",
    ] {
        let artifact = coordinate(uri);
        write_file(
            &root.join(repository_entry(&artifact.repository_path())),
            artifact.to_string().as_bytes(),
        );
    }
    write_file(&root.join("etc/config.properties"), b"new config");
    write_file(&root.join("etc/new.cfg"), b"brand new");
}

#[test]
fn apply_package_reconciles_registries_artifacts_and_files() {
    let layout = test_layout();
    let package_root = test_root();
    seed_install(&layout);
    seed_package(&package_root);
    let applier = PatchApplier::with_logger(layout.clone(), MemoryLogger::default());

    let reports = applier
        .apply_package(&DirectoryPatchSource::new(&package_root))
        .expect("must apply");

    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.stage, ApplyStage::Applied);
    assert_eq!(
        report.extraction.extracted,
        vec![
            coordinate("mvn:com.foo/bar/1.0.5"),
            coordinate("mvn:com.foo/baz/2.0.0"),
            coordinate("mvn:com.foo/migrator/1.0.0"),
        ]
    );
    assert_eq!(report.deletion.deleted, vec![coordinate("mvn:com.foo/bar/1.0.0")]);
    assert_eq!(
        report.patched_files,
        vec![
            FileChange {
                path: "etc/config.properties".to_string(),
                kind: FileChangeKind::Updated,
            },
            FileChange {
                path: "etc/new.cfg".to_string(),
                kind: FileChangeKind::Added,
            },
        ]
    );
    assert_eq!(report.skipped_files, vec!["etc/missing.cfg"]);
    assert_eq!(report.staged_migrator, Some(layout.deploy_path("migrator")));

    assert_eq!(
        fs::read_to_string(layout.overrides_path()).expect("overrides"),
        "# overrides\n\
         mvn:com.foo/bar/1.0.5;range=[1.0,2.0)\n\
         mvn:com.foo/baz/2.0.0\n\
         mvn:com.foo/migrator/1.0.0\n"
    );
    assert_eq!(
        fs::read_to_string(layout.startup_path()).expect("startup"),
        "lib/boot.jar=1\ncom/foo/bar/1.0.5/bar-1.0.5.jar=30\n"
    );
    assert!(!layout
        .artifact_path(&coordinate("mvn:com.foo/bar/1.0.0"))
        .exists());
    assert_eq!(
        fs::read_to_string(layout.install_path("etc/config.properties")).expect("config"),
        "new config"
    );
    assert_eq!(
        fs::read_to_string(layout.backup_path("patch-1", "etc/config.properties"))
            .expect("backup"),
        "old config"
    );
    assert!(!layout.backup_path("patch-1", "etc/new.cfg").exists());
    assert_eq!(
        fs::read_to_string(layout.deploy_path("migrator")).expect("migrator"),
        "com.foo:migrator:1.0.0"
    );
    assert_eq!(applier.logger().messages(LogLevel::Error).len(), 1);

    let _ = fs::remove_dir_all(layout.root());
    let _ = fs::remove_dir_all(&package_root);
}

#[test]
fn rollback_restores_files_but_not_registries() {
    let layout = test_layout();
    let package_root = test_root();
    seed_install(&layout);
    seed_package(&package_root);
    let applier = PatchApplier::with_logger(layout.clone(), MemoryLogger::default());
    let source = DirectoryPatchSource::new(&package_root);
    applier.apply_package(&source).expect("must apply");
    let overrides_after_apply = fs::read_to_string(layout.overrides_path()).expect("overrides");

    let reports = applier.rollback_package(&source).expect("must roll back");

    assert_eq!(
        reports[0].files,
        vec![
            ("etc/config.properties".to_string(), RestoreOutcome::Restored),
            ("etc/new.cfg".to_string(), RestoreOutcome::Removed),
            ("etc/missing.cfg".to_string(), RestoreOutcome::Absent),
        ]
    );
    assert_eq!(
        fs::read_to_string(layout.install_path("etc/config.properties")).expect("config"),
        "old config"
    );
    assert!(!layout.install_path("etc/new.cfg").exists());
    assert_eq!(
        fs::read_to_string(layout.overrides_path()).expect("overrides"),
        overrides_after_apply
    );

    let _ = fs::remove_dir_all(layout.root());
    let _ = fs::remove_dir_all(&package_root);
}

#[test]
fn apply_without_any_file_source_fails_after_persisting_registries() {
    let layout = test_layout();
    let descriptor = PatchDescriptor::from_toml_str(
        "id = \"p2\"\nbundles = [\"mvn:com.foo/bar/1.0.0\"]\nfiles = [\"etc/a.cfg\"]\n",
    )
    .expect("descriptor");
    let applier = PatchApplier::with_logger(layout.clone(), MemoryLogger::default());

    let err = applier
        .apply_patch(&descriptor, None, None)
        .expect_err("must fail without a file source");

    assert_eq!(
        err.downcast_ref::<PatchError>(),
        Some(&PatchError::MissingBackupLocation {
            patch_id: "p2".to_string()
        })
    );
    assert!(format!("{err:#}").contains("registries-persisted"));
    assert_eq!(
        fs::read_to_string(layout.overrides_path()).expect("overrides"),
        "mvn:com.foo/bar/1.0.0\n"
    );

    let _ = fs::remove_dir_all(layout.root());
}

#[test]
fn apply_from_storage_patches_files_without_touching_artifacts() {
    let layout = test_layout();
    let storage_root = test_root();
    write_file(&storage_root.join("etc/a.cfg"), b"from storage");
    let descriptor = PatchDescriptor::from_toml_str(
        "id = \"p3\"\nbundles = [\"mvn:com.foo/bar/1.0.0\"]\nfiles = [\"etc/a.cfg\"]\n",
    )
    .expect("descriptor");
    let applier = PatchApplier::with_logger(layout.clone(), MemoryLogger::default());
    let storage = DirectoryPatchSource::new(&storage_root);

    let report = applier
        .apply_patch(&descriptor, None, Some(&storage))
        .expect("must apply");

    assert_eq!(report.stage, ApplyStage::Applied);
    assert!(report.extraction.extracted.is_empty());
    assert_eq!(
        fs::read_to_string(layout.install_path("etc/a.cfg")).expect("patched"),
        "from storage"
    );
    assert!(!layout
        .artifact_path(&coordinate("mvn:com.foo/bar/1.0.0"))
        .exists());

    let _ = fs::remove_dir_all(layout.root());
    let _ = fs::remove_dir_all(&storage_root);
}

#[test]
fn apply_keeps_startup_load_order() {
    let layout = test_layout();
    let storage_root = test_root();
    fs::create_dir_all(&storage_root).expect("storage root");
    write_file(
        &layout.startup_path(),
        b"# boot order\n\
          z/boot/1.0/boot-1.0.jar=5\n\
          com/foo/bar/1.0.0/bar-1.0.0.jar=30\n\
          z/boot/1.0/boot-1.0.jar=5\n",
    );
    let descriptor =
        PatchDescriptor::from_toml_str("id = \"p4\"\nbundles = [\"mvn:com.foo/bar/1.0.1\"]\n")
            .expect("descriptor");
    let applier = PatchApplier::with_logger(layout.clone(), MemoryLogger::default());

    applier
        .apply_patch(&descriptor, None, Some(&DirectoryPatchSource::new(&storage_root)))
        .expect("must apply");

    assert_eq!(
        fs::read_to_string(layout.startup_path()).expect("startup"),
        "# boot order\n\
         z/boot/1.0/boot-1.0.jar=5\n\
         com/foo/bar/1.0.1/bar-1.0.1.jar=30\n\
         z/boot/1.0/boot-1.0.jar=5\n"
    );

    let _ = fs::remove_dir_all(layout.root());
    let _ = fs::remove_dir_all(&storage_root);
}

#[test]
fn repeated_rollback_leaves_restored_files_alone() {
    let layout = test_layout();
    let storage_root = test_root();
    write_file(&storage_root.join("etc/a.cfg"), b"patched");
    write_file(&layout.install_path("etc/a.cfg"), b"original");
    let descriptor = PatchDescriptor::from_toml_str("id = \"p5\"\nfiles = [\"etc/a.cfg\"]\n")
        .expect("descriptor");
    let applier = PatchApplier::with_logger(layout.clone(), MemoryLogger::default());
    let storage = DirectoryPatchSource::new(&storage_root);

    applier
        .apply_patch(&descriptor, None, Some(&storage))
        .expect("must apply");
    let first = applier.rollback_patch(&descriptor).expect("first rollback");
    assert!(!first.already_rolled_back);
    assert_eq!(
        first.files,
        vec![("etc/a.cfg".to_string(), RestoreOutcome::Restored)]
    );

    let second = applier.rollback_patch(&descriptor).expect("second rollback");
    assert!(second.already_rolled_back);
    assert!(second.files.is_empty());
    assert_eq!(
        fs::read(layout.install_path("etc/a.cfg")).expect("restored file"),
        b"original"
    );

    applier
        .apply_patch(&descriptor, None, Some(&storage))
        .expect("must apply again");
    let third = applier.rollback_patch(&descriptor).expect("rollback after reapply");
    assert!(!third.already_rolled_back);
    assert_eq!(
        fs::read(layout.install_path("etc/a.cfg")).expect("restored file"),
        b"original"
    );

    let _ = fs::remove_dir_all(layout.root());
    let _ = fs::remove_dir_all(&storage_root);
}

#[test]
fn apply_package_without_descriptors_warns() {
    let layout = test_layout();
    let package_root = test_root();
    fs::create_dir_all(&package_root).expect("package root");
    let applier = PatchApplier::with_logger(layout.clone(), MemoryLogger::default());

    let reports = applier
        .apply_package(&DirectoryPatchSource::new(&package_root))
        .expect("must succeed");

    assert!(reports.is_empty());
    assert_eq!(
        applier.logger().messages(LogLevel::Warn),
        vec!["No patch to apply".to_string()]
    );

    let _ = fs::remove_dir_all(layout.root());
    let _ = fs::remove_dir_all(&package_root);
}

#[test]
fn package_descriptors_load_in_name_order() {
    let package_root = test_root();
    write_file(&package_root.join("b.patch"), b"id = \"b\"\n");
    write_file(&package_root.join("a.patch"), b"id = \"a\"\n");
    write_file(&package_root.join("nested/c.patch"), b"id = \"c\"\n");

    let descriptors = load_package_descriptors(&DirectoryPatchSource::new(&package_root))
        .expect("must load");
    let ids: Vec<_> = descriptors.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);

    let _ = fs::remove_dir_all(&package_root);
}

#[cfg(unix)]
#[test]
fn run_helper_pumps_both_streams() {
    let stdout = SharedBuffer::default();
    let stderr = SharedBuffer::default();
    let mut command = std::process::Command::new("sh");
    command.arg("-c").arg("echo to-stdout; echo to-stderr 1>&2; exit 3");

    let status = run_helper(&mut command, stdout.clone(), stderr.clone()).expect("must run");

    assert_eq!(status.code(), Some(3));
    assert_eq!(stdout.contents(), "to-stdout\n");
    assert_eq!(stderr.contents(), "to-stderr\n");
}
