use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Produces a content-derived hash for a file on disk.
pub trait ContentHasher {
    fn hash_file(&self, path: &Path) -> std::io::Result<String>;
}

/// Lowercase hex SHA-256 of the file's bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn hash_file(&self, path: &Path) -> std::io::Result<String> {
        let mut file = std::fs::File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = [0_u8; 8192];

        loop {
            let read = file.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        Ok(hex::encode(hasher.finalize()))
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
