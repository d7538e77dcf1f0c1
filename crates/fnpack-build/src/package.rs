use std::fs::File;
use std::path::{Path, PathBuf};

use fnpack_core::{FunctionsConfig, canonical_json};
use serde_json::Value;

use crate::archive::{ArchiveError, ZipArchiveWriter};
use crate::hash::{ContentHasher, Sha256Hasher};
use crate::walk::{FileLister, GlobLister, WalkError};

/// Archive entry holding the runtime config injected at package time.
pub const CONFIG_DEST_FILE: &str = ".runtimeconfig.json";

/// Used when the functions config does not list its own ignore patterns.
const DEFAULT_IGNORE: &[&str] = &["node_modules", ".git"];

/// Always excluded. A stale `.runtimeconfig.json` is replaced by the
/// injected one, and debug logs land in the source dir when deploying
/// from inside it.
const ALWAYS_IGNORE: &[&str] = &["firebase-debug.log", "firebase-debug.*.log", CONFIG_DEST_FILE];

const CONFIG_DEST_MODE: u32 = 0o644;
const HASH_SEPARATOR: &str = ".";

/// A packaged functions source, ready for upload.
///
/// The archive at `path_to_source` belongs to the caller, who must remove
/// it when done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedSource {
    pub path_to_source: PathBuf,
    pub hash: String,
    pub archive_size: u64,
}

/// Hands out fresh, uniquely named archive files.
pub trait TempFileProvider {
    fn allocate(&self) -> std::io::Result<(File, PathBuf)>;
}

/// Persistent temp files named `firebase-functions-*.zip`.
#[derive(Debug, Clone, Default)]
pub struct SystemTempFiles {
    dir: Option<PathBuf>,
}

impl SystemTempFiles {
    /// Allocate under `dir` instead of the system temp directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }
}

impl TempFileProvider for SystemTempFiles {
    fn allocate(&self) -> std::io::Result<(File, PathBuf)> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("firebase-functions-").suffix(".zip");
        let temp = match &self.dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        temp.keep().map_err(|e| e.error)
    }
}

/// Caller patterns (or the defaults) followed by the fixed exclusions.
pub fn effective_ignore(config: &FunctionsConfig) -> Vec<String> {
    let mut ignore: Vec<String> = match &config.ignore {
        Some(patterns) => patterns.clone(),
        None => DEFAULT_IGNORE.iter().map(|p| (*p).to_owned()).collect(),
    };
    ignore.extend(ALWAYS_IGNORE.iter().map(|p| (*p).to_owned()));
    ignore
}

/// Packages a source directory into a zip and fingerprints it.
pub struct Packager<L = GlobLister, H = Sha256Hasher, T = SystemTempFiles> {
    lister: L,
    hasher: H,
    temp_files: T,
}

impl Packager {
    pub fn new() -> Self {
        Self {
            lister: GlobLister,
            hasher: Sha256Hasher,
            temp_files: SystemTempFiles::default(),
        }
    }
}

impl Default for Packager {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: FileLister, H: ContentHasher, T: TempFileProvider> Packager<L, H, T> {
    pub fn with_parts(lister: L, hasher: H, temp_files: T) -> Self {
        Self {
            lister,
            hasher,
            temp_files,
        }
    }

    /// Zips `source_dir` and computes its fingerprint.
    ///
    /// When `runtime_config` is given, it is written into the archive as
    /// [`CONFIG_DEST_FILE`] and its canonical JSON joins the fingerprint.
    pub fn package_source(
        &self,
        source_dir: &Path,
        config: &FunctionsConfig,
        runtime_config: Option<&Value>,
    ) -> Result<PackagedSource, PackageError> {
        let (file, archive_path) = self
            .temp_files
            .allocate()
            .map_err(|e| PackageError::TempFile { source: e })?;

        let ignore = effective_ignore(config);
        let (hashes, archive_size) =
            match self.write_archive(file, &archive_path, source_dir, &ignore, runtime_config) {
                Ok(written) => written,
                Err(e) => {
                    discard(&archive_path);
                    return Err(PackageError::SourceUnreadable {
                        dir: source_dir.to_path_buf(),
                        source: e,
                    });
                }
            };

        tracing::info!(
            "functions: packaged {} ({}) for uploading",
            source_dir.display(),
            format_size(archive_size)
        );

        Ok(PackagedSource {
            path_to_source: archive_path,
            hash: hashes.join(HASH_SEPARATOR),
            archive_size,
        })
    }

    fn write_archive(
        &self,
        file: File,
        archive_path: &Path,
        source_dir: &Path,
        ignore: &[String],
        runtime_config: Option<&Value>,
    ) -> Result<(Vec<String>, u64), SourceError> {
        let mut archive = ZipArchiveWriter::new(file, archive_path);
        let mut hashes = Vec::new();

        for entry in self.lister.list_files(source_dir, ignore)? {
            let file_hash = self
                .hasher
                .hash_file(&entry.path)
                .map_err(|e| SourceError::Hash {
                    path: entry.path.clone(),
                    source: e,
                })?;
            tracing::debug!(file = %entry.name, hash = %file_hash, "adding to archive");
            hashes.push(file_hash);
            archive.add_file(&entry.path, &entry.name, entry.mode)?;
        }

        if let Some(runtime_config) = runtime_config {
            // Object key order would otherwise leak into the fingerprint.
            hashes.push(canonical_json(runtime_config));

            let pretty = serde_json::to_string_pretty(runtime_config)
                .map_err(|e| SourceError::SerializeConfig { source: e })?;
            archive.add_inline(CONFIG_DEST_FILE, pretty.as_bytes(), CONFIG_DEST_MODE)?;
        }

        let size = archive.finish()?;
        Ok((hashes, size))
    }
}

fn discard(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::debug!(path = %path.display(), error = %e, "could not remove partial archive");
    }
}

/// Human-readable byte count, e.g. `"512 B"` or `"1.5 KB"`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for &next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {unit}")
}

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("failed to allocate a temporary archive file")]
    TempFile { source: std::io::Error },

    #[error("Could not read source directory. Remove links and shortcuts and try again.")]
    SourceUnreadable { dir: PathBuf, source: SourceError },
}

impl PackageError {
    /// Process exit code for the invoking command. Packaging errors are
    /// never retried within an invocation.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Underlying cause of [`PackageError::SourceUnreadable`].
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    List(#[from] WalkError),

    #[error("failed to hash {path}")]
    Hash {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("failed to serialize runtime config")]
    SerializeConfig { source: serde_json::Error },
}

