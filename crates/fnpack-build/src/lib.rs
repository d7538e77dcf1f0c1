//! Source packaging and upload preparation for fnpack.
//!
//! # Packaging pipeline
//!
//! ```text
//! fnpack package
//!   1. Isolate   ── optional: run the isolate command, package its output
//!   2. List      ── FileLister::list_files(source, ignore)
//!   3. Hash      ── ContentHasher::hash_file(path) per file, in listing order
//!   4. Archive   ── zip entry per file + .runtimeconfig.json
//!   5. Finalize  ── zip central directory written, file synced
//! ```
//!
//! # Fingerprint
//!
//! The fingerprint is every per-file hash in listing order, followed by
//! the canonical JSON of the runtime config when one is supplied, joined
//! with `.`. It changes whenever a file's content, the set of packaged
//! files, or the config's content changes, and is stable under config
//! key reordering.

pub mod archive;
pub mod hash;
pub mod isolate;
pub mod package;
pub mod upload;
pub mod walk;

pub use archive::{ArchiveError, ZipArchiveWriter};
pub use hash::{ContentHasher, Sha256Hasher, sha256_hex};
pub use isolate::{CommandIsolator, IsolateError, Isolator};
pub use package::{
    CONFIG_DEST_FILE, PackageError, PackagedSource, Packager, SourceError, SystemTempFiles,
    TempFileProvider, format_size,
};
pub use upload::{UploadError, prepare_functions_upload};
pub use walk::{FileEntry, FileLister, GlobLister, WalkError};
