//! Recursive file listing with ignore patterns.
//!
//! Patterns follow the usual "match base" convention: a pattern without a
//! `/` is tested against each entry's file name at any depth, so
//! `node_modules` prunes every `node_modules` directory and
//! `firebase-debug.*.log` catches dated logs anywhere in the tree. A
//! pattern containing `/` is tested against the path relative to the root.
//! Wildcards match dotfiles.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

/// A regular file found under the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Full path on disk.
    pub path: PathBuf,
    /// Path relative to the root, `/`-separated.
    pub name: String,
    /// Unix permission bits.
    pub mode: u32,
}

/// Lists the files under a directory, honoring ignore patterns.
pub trait FileLister {
    fn list_files(&self, root: &Path, ignore: &[String]) -> Result<Vec<FileEntry>, WalkError>;
}

/// [`FileLister`] backed by `walkdir` and `globset`.
///
/// Directory contents are visited in file-name order, depth first, so the
/// listing is stable for a given tree. Symbolic links are followed; a
/// dangling link fails the listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobLister;

impl FileLister for GlobLister {
    fn list_files(&self, root: &Path, ignore: &[String]) -> Result<Vec<FileEntry>, WalkError> {
        let matcher = IgnoreMatcher::new(ignore)?;
        let mut files = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !matcher.is_ignored(root, entry.path()));

        for entry in walker {
            let entry = entry.map_err(|e| WalkError::Read {
                root: root.to_path_buf(),
                source: e,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let metadata = entry.metadata().map_err(|e| WalkError::Read {
                root: root.to_path_buf(),
                source: e,
            })?;
            let name = relative_name(root, entry.path()).ok_or_else(|| WalkError::NonUtf8Name {
                path: entry.path().to_path_buf(),
            })?;
            tracing::trace!(file = %name, "listed");

            files.push(FileEntry {
                path: entry.into_path(),
                name,
                mode: permission_bits(&metadata),
            });
        }

        Ok(files)
    }
}

struct IgnoreMatcher {
    base_names: GlobSet,
    paths: GlobSet,
}

impl IgnoreMatcher {
    fn new(patterns: &[String]) -> Result<Self, WalkError> {
        let mut base_names = GlobSetBuilder::new();
        let mut paths = GlobSetBuilder::new();

        for pattern in patterns {
            let trimmed = pattern.trim_start_matches("./").trim_end_matches('/');
            let glob = GlobBuilder::new(trimmed)
                .literal_separator(true)
                .build()
                .map_err(|e| WalkError::Pattern {
                    pattern: pattern.clone(),
                    source: e,
                })?;
            if trimmed.contains('/') {
                paths.add(glob);
            } else {
                base_names.add(glob);
            }
        }

        let build = |builder: GlobSetBuilder| {
            builder.build().map_err(|e| WalkError::Pattern {
                pattern: patterns.join(", "),
                source: e,
            })
        };

        Ok(Self {
            base_names: build(base_names)?,
            paths: build(paths)?,
        })
    }

    fn is_ignored(&self, root: &Path, path: &Path) -> bool {
        if path
            .file_name()
            .is_some_and(|name| self.base_names.is_match(name))
        {
            return true;
        }
        !self.paths.is_empty()
            && relative_name(root, path).is_some_and(|name| self.paths.is_match(name))
    }
}

/// `None` when any component is not valid UTF-8.
fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

#[cfg(unix)]
fn permission_bits(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &std::fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    #[error("invalid ignore pattern {pattern:?}")]
    Pattern {
        pattern: String,
        source: globset::Error,
    },
    #[error("file name is not valid UTF-8: {path}")]
    NonUtf8Name { path: PathBuf },
    #[error("failed to read source tree at {root}")]
    Read {
        root: PathBuf,
        source: walkdir::Error,
    },
}
