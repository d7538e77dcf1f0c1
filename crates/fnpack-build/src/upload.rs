use std::path::Path;

use fnpack_core::FunctionsConfig;
use serde_json::Value;

use crate::hash::ContentHasher;
use crate::isolate::{IsolateError, Isolator};
use crate::package::{PackageError, PackagedSource, Packager, TempFileProvider};
use crate::walk::FileLister;

/// Packages the functions source for upload.
///
/// With `config.isolate` set, the isolator runs first and its output is
/// packaged in place of `source_dir`. An isolation failure aborts the
/// upload; the original source is never packaged as a fallback.
pub async fn prepare_functions_upload<I, L, H, T>(
    packager: &Packager<L, H, T>,
    isolator: Option<&I>,
    source_dir: &Path,
    config: &FunctionsConfig,
    runtime_config: Option<&Value>,
) -> Result<PackagedSource, UploadError>
where
    I: Isolator,
    L: FileLister,
    H: ContentHasher,
    T: TempFileProvider,
{
    if !config.isolate {
        return Ok(packager.package_source(source_dir, config, runtime_config)?);
    }

    let isolator = isolator.ok_or(UploadError::IsolatorUnavailable)?;
    tracing::info!("functions: Start isolating the source folder...");

    let isolated_dir = match isolator.isolate().await {
        Ok(dir) => dir,
        Err(e) => {
            tracing::info!("functions: +++ Failed to isolate: {e}");
            return Err(e.into());
        }
    };
    tracing::info!("functions: Finished isolation at {}", isolated_dir.display());

    Ok(packager.package_source(&isolated_dir, config, runtime_config)?)
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Package(#[from] PackageError),
    #[error(transparent)]
    Isolation(#[from] IsolateError),
    #[error("source isolation is enabled but no isolator is available")]
    IsolatorUnavailable,
}
