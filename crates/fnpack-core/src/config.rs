use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "fnpack.toml";

/// fnpack.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FnpackConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub functions: FunctionsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Cloud project ID, required for fetching runtime config
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionsConfig {
    /// Functions source directory, relative to the project directory
    #[serde(default = "default_source")]
    pub source: PathBuf,
    /// Glob patterns excluded from the package.
    /// When None, `node_modules` and `.git` are excluded.
    #[serde(default)]
    pub ignore: Option<Vec<String>>,
    /// Run the isolation command and package its output instead of `source`
    #[serde(default)]
    pub isolate: bool,
    /// Program and arguments of the isolation command
    #[serde(default = "default_isolate_command")]
    pub isolate_command: Vec<String>,
    /// Directory (relative to `source`) the isolation command writes to
    #[serde(default = "default_isolate_output")]
    pub isolate_output: PathBuf,
    /// Local JSON file whose contents are injected as runtime config
    #[serde(default)]
    pub runtime_config: Option<PathBuf>,
}

impl Default for FunctionsConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            ignore: None,
            isolate: false,
            isolate_command: default_isolate_command(),
            isolate_output: default_isolate_output(),
            runtime_config: None,
        }
    }
}

impl FunctionsConfig {
    /// Reject ignore patterns that can never match anything meaningful.
    pub fn validate(&self) -> crate::Result<()> {
        for pattern in self.ignore.iter().flatten() {
            if pattern.trim().is_empty() {
                return Err(crate::Error::InvalidIgnorePattern {
                    pattern: pattern.clone(),
                    reason: "pattern is empty",
                });
            }
            if pattern.contains('\0') {
                return Err(crate::Error::InvalidIgnorePattern {
                    pattern: pattern.clone(),
                    reason: "pattern contains a NUL byte",
                });
            }
        }
        Ok(())
    }
}

impl FnpackConfig {
    /// Load from fnpack.toml at the given path, or return defaults if not found.
    pub fn load(project_dir: &Path) -> crate::Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                path: config_path.clone(),
                source: e,
            })?;
        let config: Self = toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
            path: config_path,
            source: e,
        })?;
        config.functions.validate()?;
        Ok(config)
    }
}

/// Read a runtime config JSON document from disk.
///
/// Key order is preserved as written so the file injected into the
/// archive mirrors the input.
pub fn load_runtime_config(path: &Path) -> crate::Result<serde_json::Value> {
    let content =
        std::fs::read_to_string(path).map_err(|e| crate::Error::RuntimeConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
    serde_json::from_str(&content).map_err(|e| crate::Error::RuntimeConfigParse {
        path: path.to_path_buf(),
        source: e,
    })
}

fn default_source() -> PathBuf {
    PathBuf::from("functions")
}

fn default_isolate_command() -> Vec<String> {
    vec!["npx".to_owned(), "isolate".to_owned()]
}

fn default_isolate_output() -> PathBuf {
    PathBuf::from("isolate")
}
