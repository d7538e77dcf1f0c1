use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid ignore pattern {pattern:?}: {reason}")]
    InvalidIgnorePattern {
        pattern: String,
        reason: &'static str,
    },

    // ── Runtime config file ──
    #[error("failed to read runtime config from {path}")]
    RuntimeConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("runtime config at {path} is not valid JSON")]
    RuntimeConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },
}
