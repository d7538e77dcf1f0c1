use std::fs::File;
use std::io::Read;
use std::path::Path;

use fnpack_build::package::effective_ignore;
use fnpack_build::{
    ContentHasher, FileEntry, FileLister, GlobLister, PackageError, PackagedSource, Packager,
    SourceError, SystemTempFiles, WalkError, format_size, sha256_hex,
};
use fnpack_core::{FunctionsConfig, canonical_json};
use serde_json::{Value, json};
use tempfile::TempDir;

/// Packager writing its archives into `out`.
fn packager(out: &Path) -> Packager<GlobLister, fnpack_build::Sha256Hasher, SystemTempFiles> {
    Packager::with_parts(
        GlobLister,
        fnpack_build::Sha256Hasher,
        SystemTempFiles::in_dir(out),
    )
}

fn package(source: &Path, out: &Path, runtime_config: Option<&Value>) -> PackagedSource {
    packager(out)
        .package_source(source, &FunctionsConfig::default(), runtime_config)
        .unwrap()
}

fn write(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn entry_names(archive: &Path) -> Vec<String> {
    let zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    zip.file_names().map(str::to_owned).collect::<Vec<_>>()
}

fn entry_names_in_order(archive: &Path) -> Vec<String> {
    let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_owned())
        .collect()
}

fn entry_content(archive: &Path, name: &str) -> String {
    let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let mut entry = zip.by_name(name).unwrap();
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    content
}

// ── Fingerprint ──

#[test]
fn two_files_hash_in_listing_order() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write(src.path(), "a.txt", "x");
    write(src.path(), "b.txt", "y");

    let packaged = package(src.path(), out.path(), None);

    assert_eq!(
        packaged.hash,
        format!("{}.{}", sha256_hex(b"x"), sha256_hex(b"y"))
    );
    assert_eq!(entry_names_in_order(&packaged.path_to_source), vec!["a.txt", "b.txt"]);
    assert_eq!(entry_content(&packaged.path_to_source, "a.txt"), "x");
    assert_eq!(entry_content(&packaged.path_to_source, "b.txt"), "y");
}

#[test]
fn empty_directory_without_config_has_empty_fingerprint() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    let packaged = package(src.path(), out.path(), None);

    assert_eq!(packaged.hash, "");
    assert!(entry_names(&packaged.path_to_source).is_empty());
    assert!(packaged.archive_size > 0);
}

#[test]
fn config_contributes_its_canonical_json() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write(src.path(), "index.js", "exports.x = 1;");
    let config = json!({"svc": {"key": "abc"}});

    let packaged = package(src.path(), out.path(), Some(&config));

    assert_eq!(
        packaged.hash,
        format!(
            "{}.{}",
            sha256_hex(b"exports.x = 1;"),
            r#"[{"key":"svc","value":[{"key":"key","value":"abc"}]}]"#
        )
    );
}

#[test]
fn config_only_fingerprint_is_the_canonical_json() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let config = json!({"a": 1});

    let packaged = package(src.path(), out.path(), Some(&config));

    assert_eq!(packaged.hash, canonical_json(&config));
}

#[test]
fn fingerprint_ignores_config_key_order() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write(src.path(), "index.js", "module.exports = {};");
    let first: Value = serde_json::from_str(r#"{"a":1,"b":2}"#).unwrap();
    let second: Value = serde_json::from_str(r#"{"b":2,"a":1}"#).unwrap();

    let one = package(src.path(), out.path(), Some(&first));
    let two = package(src.path(), out.path(), Some(&second));

    assert_eq!(one.hash, two.hash);
    assert_ne!(one.path_to_source, two.path_to_source);
}

#[test]
fn fingerprint_ignores_key_order_of_objects_in_arrays() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write(src.path(), "index.js", "module.exports = {};");
    let first: Value = serde_json::from_str(r#"{"hosts":[{"name":"x","port":1}]}"#).unwrap();
    let second: Value = serde_json::from_str(r#"{"hosts":[{"port":1,"name":"x"}]}"#).unwrap();

    let one = package(src.path(), out.path(), Some(&first));
    let two = package(src.path(), out.path(), Some(&second));

    assert_eq!(one.hash, two.hash);
    assert_eq!(
        entry_content(&two.path_to_source, ".runtimeconfig.json"),
        serde_json::to_string_pretty(&second).unwrap()
    );
}

#[test]
fn repeated_runs_are_deterministic() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write(src.path(), "lib/util.js", "util");
    write(src.path(), "index.js", "main");
    write(src.path(), "package.json", "{}");

    let one = package(src.path(), out.path(), None);
    let two = package(src.path(), out.path(), None);

    assert_eq!(one.hash, two.hash);
}

#[test]
fn content_change_changes_fingerprint() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write(src.path(), "index.js", "v1");
    let before = package(src.path(), out.path(), None);

    write(src.path(), "index.js", "v2");
    let after = package(src.path(), out.path(), None);

    assert_ne!(before.hash, after.hash);
}

// ── Ignore rules ──

#[test]
fn debug_logs_are_never_packaged() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write(src.path(), "index.js", "main");
    write(src.path(), "firebase-debug.log", "noise");
    write(src.path(), "firebase-debug.2024-01-01.log", "noise");
    write(src.path(), "nested/firebase-debug.log", "noise");

    let packaged = package(src.path(), out.path(), None);

    assert_eq!(entry_names(&packaged.path_to_source), vec!["index.js"]);
    assert_eq!(packaged.hash, sha256_hex(b"main"));
}

#[test]
fn default_ignore_skips_node_modules_and_git() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write(src.path(), "index.js", "main");
    write(src.path(), "node_modules/dep/index.js", "dep");
    write(src.path(), ".git/HEAD", "ref: refs/heads/main");

    let packaged = package(src.path(), out.path(), None);

    assert_eq!(entry_names(&packaged.path_to_source), vec!["index.js"]);
}

#[test]
fn caller_ignore_replaces_defaults() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write(src.path(), "index.js", "main");
    write(src.path(), "README.md", "docs");
    write(src.path(), "node_modules/dep.js", "dep");
    write(src.path(), "firebase-debug.log", "noise");
    let config = FunctionsConfig {
        ignore: Some(vec!["*.md".to_owned()]),
        ..Default::default()
    };

    let packaged = packager(out.path())
        .package_source(src.path(), &config, None)
        .unwrap();

    let names = entry_names_in_order(&packaged.path_to_source);
    assert_eq!(names, vec!["index.js", "node_modules/dep.js"]);
}

#[test]
fn stale_runtime_config_is_replaced_by_supplied_one() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write(src.path(), "index.js", "main");
    write(src.path(), ".runtimeconfig.json", r#"{"stale": true}"#);
    let config: Value = serde_json::from_str(r#"{"zeta":{"b":1,"a":2},"alpha":"x"}"#).unwrap();

    let packaged = package(src.path(), out.path(), Some(&config));

    let names = entry_names_in_order(&packaged.path_to_source);
    assert_eq!(names, vec!["index.js", ".runtimeconfig.json"]);
    assert_eq!(
        entry_content(&packaged.path_to_source, ".runtimeconfig.json"),
        "{\n  \"zeta\": {\n    \"b\": 1,\n    \"a\": 2\n  },\n  \"alpha\": \"x\"\n}"
    );
}

#[test]
fn stale_runtime_config_is_dropped_without_supplied_one() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write(src.path(), "index.js", "main");
    write(src.path(), ".runtimeconfig.json", "{}");

    let packaged = package(src.path(), out.path(), None);

    assert_eq!(entry_names(&packaged.path_to_source), vec!["index.js"]);
    assert_eq!(packaged.hash, sha256_hex(b"main"));
}

#[test]
fn effective_ignore_appends_fixed_patterns() {
    assert_eq!(
        effective_ignore(&FunctionsConfig::default()),
        vec![
            "node_modules",
            ".git",
            "firebase-debug.log",
            "firebase-debug.*.log",
            ".runtimeconfig.json",
        ]
    );

    let config = FunctionsConfig {
        ignore: Some(Vec::new()),
        ..Default::default()
    };
    assert_eq!(effective_ignore(&config).len(), 3);
}

// ── Archive layout ──

#[test]
fn nested_files_use_forward_slash_names() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write(src.path(), "lib/handlers/http.js", "http");

    let packaged = package(src.path(), out.path(), None);

    assert_eq!(
        entry_names(&packaged.path_to_source),
        vec!["lib/handlers/http.js"]
    );
}

#[test]
fn archive_lands_in_uniquely_named_temp_file() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    let one = package(src.path(), out.path(), None);
    let two = package(src.path(), out.path(), None);

    for packaged in [&one, &two] {
        let file_name = packaged
            .path_to_source
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert!(file_name.starts_with("firebase-functions-"));
        assert!(file_name.ends_with(".zip"));
        assert_eq!(packaged.path_to_source.parent().unwrap(), out.path());
        assert_eq!(
            std::fs::metadata(&packaged.path_to_source).unwrap().len(),
            packaged.archive_size
        );
    }
    assert_ne!(one.path_to_source, two.path_to_source);
}

#[cfg(unix)]
#[test]
fn file_modes_are_preserved() {
    use std::os::unix::fs::PermissionsExt;

    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write(src.path(), "run.sh", "#!/bin/sh");
    std::fs::set_permissions(
        src.path().join("run.sh"),
        std::fs::Permissions::from_mode(0o755),
    )
    .unwrap();

    let packaged = package(src.path(), out.path(), Some(&json!({})));

    let mut zip = zip::ZipArchive::new(File::open(&packaged.path_to_source).unwrap()).unwrap();
    let script_mode = zip.by_name("run.sh").unwrap().unix_mode().unwrap();
    assert_eq!(script_mode & 0o777, 0o755);
    let config_mode = zip.by_name(".runtimeconfig.json").unwrap().unix_mode().unwrap();
    assert_eq!(config_mode & 0o777, 0o644);
}

// ── Failures ──

#[cfg(unix)]
#[test]
fn broken_symlink_fails_and_leaves_no_archive() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write(src.path(), "index.js", "main");
    std::os::unix::fs::symlink(src.path().join("missing"), src.path().join("dangling")).unwrap();

    let err = packager(out.path())
        .package_source(src.path(), &FunctionsConfig::default(), None)
        .unwrap_err();

    assert!(matches!(
        err,
        PackageError::SourceUnreadable {
            source: SourceError::List(WalkError::Read { .. }),
            ..
        }
    ));
    assert_eq!(err.exit_code(), 1);
    assert!(err.to_string().contains("Remove links and shortcuts"));
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn missing_source_directory_is_unreadable() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    let err = packager(out.path())
        .package_source(
            &src.path().join("does-not-exist"),
            &FunctionsConfig::default(),
            None,
        )
        .unwrap_err();

    assert!(matches!(err, PackageError::SourceUnreadable { .. }));
}

struct FixedLister(Vec<FileEntry>);

impl FileLister for FixedLister {
    fn list_files(&self, _root: &Path, _ignore: &[String]) -> Result<Vec<FileEntry>, WalkError> {
        Ok(self.0.clone())
    }
}

struct FailingHasher;

impl ContentHasher for FailingHasher {
    fn hash_file(&self, _path: &Path) -> std::io::Result<String> {
        Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ))
    }
}

struct NameHasher;

impl ContentHasher for NameHasher {
    fn hash_file(&self, path: &Path) -> std::io::Result<String> {
        Ok(path.file_name().unwrap().to_string_lossy().into_owned())
    }
}

#[test]
fn hash_failure_is_reported_as_unreadable_source() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write(src.path(), "index.js", "main");
    let lister = FixedLister(vec![FileEntry {
        path: src.path().join("index.js"),
        name: "index.js".to_owned(),
        mode: 0o644,
    }]);

    let err = Packager::with_parts(lister, FailingHasher, SystemTempFiles::in_dir(out.path()))
        .package_source(src.path(), &FunctionsConfig::default(), None)
        .unwrap_err();

    let PackageError::SourceUnreadable { dir, source } = err else {
        panic!("expected SourceUnreadable");
    };
    assert_eq!(dir, src.path());
    assert!(matches!(source, SourceError::Hash { path, .. } if path == src.path().join("index.js")));
}

#[test]
fn hashes_follow_lister_order() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write(src.path(), "b.js", "b");
    write(src.path(), "a.js", "a");
    let entry = |name: &str| FileEntry {
        path: src.path().join(name),
        name: name.to_owned(),
        mode: 0o644,
    };
    let lister = FixedLister(vec![entry("b.js"), entry("a.js")]);

    let packaged = Packager::with_parts(lister, NameHasher, SystemTempFiles::in_dir(out.path()))
        .package_source(src.path(), &FunctionsConfig::default(), None)
        .unwrap();

    assert_eq!(packaged.hash, "b.js.a.js");
    assert_eq!(
        entry_names_in_order(&packaged.path_to_source),
        vec!["b.js", "a.js"]
    );
}

#[test]
fn unreadable_listing_entry_surfaces_archive_error() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let lister = FixedLister(vec![FileEntry {
        path: src.path().join("gone.js"),
        name: "gone.js".to_owned(),
        mode: 0o644,
    }]);

    let err = Packager::with_parts(lister, NameHasher, SystemTempFiles::in_dir(out.path()))
        .package_source(src.path(), &FunctionsConfig::default(), None)
        .unwrap_err();

    assert!(matches!(
        err,
        PackageError::SourceUnreadable {
            source: SourceError::Archive(_),
            ..
        }
    ));
}

// ── Size formatting ──

#[test]
fn format_size_renders_units() {
    assert_eq!(format_size(0), "0 B");
    assert_eq!(format_size(1023), "1023 B");
    assert_eq!(format_size(1024), "1 KB");
    assert_eq!(format_size(1536), "1.5 KB");
    assert_eq!(format_size(5 * 1024 * 1024), "5 MB");
    assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3 GB");
}
