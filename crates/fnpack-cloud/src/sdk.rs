//! Data Connect client SDK scaffolding.
//!
//! ```text
//! fnpack sdk
//!   1. Write   ── <connector dir>/connector.yaml
//!   2. Generate ── <emulator> generate --config_dir=<dir> --connector_id=<id>
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::executor::{RealExecutor, ToolError, ToolExecutor};

/// File name of the connector definition inside a connector directory.
pub const CONNECTOR_YAML: &str = "connector.yaml";

/// Overrides the emulator binary used for code generation.
pub const EMULATOR_BINARY_ENV: &str = "DATACONNECT_EMULATOR_BINARY_PATH";

const DEFAULT_EMULATOR_BINARY: &str = "dataconnect-emulator";

const IOS_SETUP_URL: &str =
    "https://firebase.google.com/docs/data-connect/gp/ios-sdk#set-client";

/// Everything needed to scaffold one connector's SDK.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkInfo {
    pub connector_yaml_contents: String,
    pub connector_info: ConnectorInfo,
    #[serde(default)]
    pub display_ios_warning: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorInfo {
    pub connector: Connector,
    /// Directory holding `connector.yaml`.
    pub directory: PathBuf,
    pub connector_yaml: ConnectorYaml,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub name: String,
    #[serde(default)]
    pub source: ConnectorSource,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectorSource {
    #[serde(default)]
    pub files: Vec<SourceFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorYaml {
    pub connector_id: String,
    #[serde(default)]
    pub generate: Option<GenerateConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateConfig {
    pub javascript_sdk: Option<SdkTarget>,
    pub swift_sdk: Option<SdkTarget>,
    pub kotlin_sdk: Option<SdkTarget>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkTarget {
    pub output_dir: String,
    pub package: String,
}

impl ConnectorYaml {
    /// Renders the connector definition as YAML.
    pub fn render(&self) -> String {
        let mut out = format!("connectorId: {}\n", quote(&self.connector_id));

        let Some(generate) = &self.generate else {
            return out;
        };
        let targets = [
            ("javascriptSdk", &generate.javascript_sdk),
            ("swiftSdk", &generate.swift_sdk),
            ("kotlinSdk", &generate.kotlin_sdk),
        ];
        if targets.iter().all(|(_, target)| target.is_none()) {
            return out;
        }

        out.push_str("generate:\n");
        for (key, target) in targets {
            if let Some(target) = target {
                out.push_str(&format!("  {key}:\n"));
                out.push_str(&format!("    outputDir: {}\n", quote(&target.output_dir)));
                out.push_str(&format!("    package: {}\n", quote(&target.package)));
            }
        }
        out
    }
}

/// Double-quotes a YAML scalar unless it is plainly safe.
fn quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'));
    if plain {
        value.to_owned()
    } else {
        format!("{value:?}")
    }
}

/// Runs the Data Connect SDK code generator.
///
/// Production code uses [`EmulatorGenerator`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait ConnectorGenerator: Send + Sync {
    async fn generate(&self, config_dir: &Path, connector_id: &str) -> Result<(), ToolError>;
}

/// Generates SDKs with the Data Connect emulator binary.
pub struct EmulatorGenerator<E: ToolExecutor = RealExecutor> {
    executor: E,
    binary: String,
}

impl EmulatorGenerator<RealExecutor> {
    /// Uses `$DATACONNECT_EMULATOR_BINARY_PATH`, or `dataconnect-emulator` from `PATH`.
    pub fn new() -> Self {
        let binary = std::env::var(EMULATOR_BINARY_ENV)
            .ok()
            .filter(|path| !path.is_empty())
            .unwrap_or_else(|| DEFAULT_EMULATOR_BINARY.to_owned());
        Self::with_executor(RealExecutor, binary)
    }
}

impl Default for EmulatorGenerator<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ToolExecutor> EmulatorGenerator<E> {
    pub fn with_executor(executor: E, binary: impl Into<String>) -> Self {
        Self {
            executor,
            binary: binary.into(),
        }
    }
}

impl<E: ToolExecutor> ConnectorGenerator for EmulatorGenerator<E> {
    async fn generate(&self, config_dir: &Path, connector_id: &str) -> Result<(), ToolError> {
        let args = vec![
            "generate".to_owned(),
            format!("--config_dir={}", config_dir.display()),
            format!("--connector_id={connector_id}"),
        ];
        self.executor.exec_streaming(&self.binary, &args).await
    }
}

/// Writes the connector definition and generates its SDK code.
pub async fn actuate<G: ConnectorGenerator>(
    info: &SdkInfo,
    generator: &G,
) -> Result<(), SdkError> {
    let connector = &info.connector_info;
    let yaml_path = connector.directory.join(CONNECTOR_YAML);

    std::fs::write(&yaml_path, &info.connector_yaml_contents).map_err(|e| SdkError::Write {
        path: yaml_path.clone(),
        source: e,
    })?;
    tracing::info!("Wrote new config to {}", yaml_path.display());

    let connector_id = &connector.connector_yaml.connector_id;
    generator
        .generate(&connector.directory, connector_id)
        .await
        .map_err(|e| SdkError::Generate {
            connector_id: connector_id.clone(),
            source: e,
        })?;
    tracing::info!("Generated SDK code for {connector_id}");

    let has_swift = connector
        .connector_yaml
        .generate
        .as_ref()
        .is_some_and(|g| g.swift_sdk.is_some());
    if has_swift && info.display_ios_warning {
        tracing::warn!(
            "Please follow the instructions here to add your generated sdk to your Xcode project: {IOS_SETUP_URL}"
        );
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to generate SDK for connector '{connector_id}'")]
    Generate {
        connector_id: String,
        source: ToolError,
    },
}
