use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Streams entries into a deflate-compressed zip file.
pub struct ZipArchiveWriter {
    zip: ZipWriter<File>,
    path: PathBuf,
}

impl ZipArchiveWriter {
    /// `path` is where `file` lives; it is only used in error reports.
    pub fn new(file: File, path: impl Into<PathBuf>) -> Self {
        Self {
            zip: ZipWriter::new(file),
            path: path.into(),
        }
    }

    /// Copies the file at `source` into the archive as `name`.
    pub fn add_file(&mut self, source: &Path, name: &str, mode: u32) -> Result<(), ArchiveError> {
        let mut input = File::open(source).map_err(|e| ArchiveError::ReadSource {
            path: source.to_path_buf(),
            source: e,
        })?;

        self.zip
            .start_file(name, options(mode))
            .map_err(|e| ArchiveError::Entry {
                name: name.to_owned(),
                source: e,
            })?;
        std::io::copy(&mut input, &mut self.zip).map_err(|e| ArchiveError::Write {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(())
    }

    /// Adds an entry whose content is held in memory.
    pub fn add_inline(&mut self, name: &str, bytes: &[u8], mode: u32) -> Result<(), ArchiveError> {
        self.zip
            .start_file(name, options(mode))
            .map_err(|e| ArchiveError::Entry {
                name: name.to_owned(),
                source: e,
            })?;
        self.zip.write_all(bytes).map_err(|e| ArchiveError::Write {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Writes the central directory and syncs the file to disk.
    ///
    /// Returns the archive size in bytes. The archive is complete only once
    /// both steps succeed.
    pub fn finish(self) -> Result<u64, ArchiveError> {
        let file = self.zip.finish().map_err(|e| ArchiveError::Finalize {
            path: self.path.clone(),
            source: e,
        })?;
        file.sync_all().map_err(|e| ArchiveError::Write {
            path: self.path.clone(),
            source: e,
        })?;
        let size = file.metadata().map_err(|e| ArchiveError::Write {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(size.len())
    }
}

fn options(mode: u32) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(mode)
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to read {path} for archiving")]
    ReadSource {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to add archive entry {name}")]
    Entry {
        name: String,
        source: zip::result::ZipError,
    },
    #[error("failed to write archive {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to finalize archive {path}")]
    Finalize {
        path: PathBuf,
        source: zip::result::ZipError,
    },
}
