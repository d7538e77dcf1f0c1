//! Cloud-facing collaborators for fnpack.
//!
//! - [`runtime_config`]: fetches and materializes Cloud Runtime Config
//!   values into the object injected as `.runtimeconfig.json`.
//! - [`sdk`]: writes a Data Connect `connector.yaml` and runs the
//!   emulator's SDK code generator.
//!
//! External tools (`gcloud`, the Data Connect emulator) run through
//! [`ToolExecutor`] so both can be mocked in tests.

pub mod executor;
pub mod runtime_config;
pub mod sdk;

pub use executor::{RealExecutor, ToolError, ToolExecutor};
pub use runtime_config::{
    ApiError, HttpRuntimeConfigApi, RuntimeConfigApi, RuntimeConfigError, RuntimeVariable,
    get_functions_config, materialize_all,
};
pub use sdk::{
    ConnectorGenerator, ConnectorInfo, ConnectorYaml, EmulatorGenerator, SdkError, SdkInfo,
    actuate,
};
