//! Core types and configuration for fnpack.
//!
//! This crate defines the `fnpack.toml` schema ([`FnpackConfig`]), the
//! runtime-config canonicalization used for fingerprinting
//! ([`canonical`]), and shared error types.

pub mod canonical;
pub mod config;
pub mod error;

pub use canonical::{SortedConfig, canonical_json, to_sorted_key_value_array};
pub use config::{FnpackConfig, FunctionsConfig, ProjectConfig, load_runtime_config};
pub use error::{Error, Result};
