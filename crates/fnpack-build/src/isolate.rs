use std::path::{Path, PathBuf};
use std::process::Stdio;

use fnpack_core::FunctionsConfig;

/// Produces a pruned copy of the functions source to package instead of
/// the source directory itself.
///
/// Production code uses [`CommandIsolator`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait Isolator: Send + Sync {
    /// Returns the directory holding the isolated source.
    async fn isolate(&self) -> Result<PathBuf, IsolateError>;
}

/// Runs an external isolation tool (e.g. `npx isolate`) in the source
/// directory and picks up the tree it writes.
#[derive(Debug, Clone)]
pub struct CommandIsolator {
    source_dir: PathBuf,
    command: Vec<String>,
    output_dir: PathBuf,
}

impl CommandIsolator {
    pub fn new(
        source_dir: impl Into<PathBuf>,
        command: Vec<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            command,
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(source_dir: &Path, config: &FunctionsConfig) -> Self {
        Self::new(
            source_dir,
            config.isolate_command.clone(),
            config.isolate_output.clone(),
        )
    }
}

impl Isolator for CommandIsolator {
    async fn isolate(&self) -> Result<PathBuf, IsolateError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or(IsolateError::EmptyCommand)?;

        let output = tokio::process::Command::new(program)
            .args(args)
            .current_dir(&self.source_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| IsolateError::Spawn {
                program: program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IsolateError::Failed {
                status: output.status.to_string(),
                stderr: stderr.trim().to_owned(),
            });
        }

        let isolated = self.source_dir.join(&self.output_dir);
        if !isolated.is_dir() {
            return Err(IsolateError::MissingOutput(isolated));
        }
        Ok(isolated)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IsolateError {
    #[error("isolate command is empty; set [functions].isolate_command in fnpack.toml")]
    EmptyCommand,
    #[error("failed to execute isolate command `{program}`")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("isolate command exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("isolate command did not produce {0}")]
    MissingOutput(PathBuf),
}
