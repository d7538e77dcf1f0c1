use std::path::{Path, PathBuf};

use fnpack_build::{CommandIsolator, Packager, format_size, prepare_functions_upload};
use fnpack_cloud::{HttpRuntimeConfigApi, get_functions_config};
use fnpack_core::{FnpackConfig, load_runtime_config};
use serde_json::Value;

/// Package the functions source and report the archive and fingerprint.
pub async fn package(
    dir: Option<PathBuf>,
    runtime_config_file: Option<PathBuf>,
    fetch_config: bool,
) -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let config = FnpackConfig::load(&project_dir)?;

    let source_dir = dir.unwrap_or_else(|| project_dir.join(&config.functions.source));
    if !source_dir.is_dir() {
        anyhow::bail!(
            "functions source directory {} not found; set [functions].source in fnpack.toml or pass --dir",
            source_dir.display()
        );
    }

    let runtime_config =
        resolve_runtime_config(&project_dir, &config, runtime_config_file, fetch_config).await?;

    tracing::debug!(
        source = %source_dir.display(),
        isolate = config.functions.isolate,
        runtime_config = runtime_config.is_some(),
        "preparing functions upload"
    );
    let packager = Packager::new();
    let isolator = CommandIsolator::from_config(&source_dir, &config.functions);
    let packaged = prepare_functions_upload(
        &packager,
        Some(&isolator),
        &source_dir,
        &config.functions,
        runtime_config.as_ref(),
    )
    .await?;

    println!(
        "Packaged {} ({})",
        source_dir.display(),
        format_size(packaged.archive_size)
    );
    println!("  archive: {}", packaged.path_to_source.display());
    println!("  hash:    {}", packaged.hash);
    Ok(())
}

/// `--runtime-config` wins over `--fetch-config`, which wins over
/// `[functions].runtime_config`.
async fn resolve_runtime_config(
    project_dir: &Path,
    config: &FnpackConfig,
    runtime_config_file: Option<PathBuf>,
    fetch_config: bool,
) -> anyhow::Result<Option<Value>> {
    if let Some(path) = runtime_config_file {
        return Ok(Some(load_runtime_config(&path)?));
    }

    if fetch_config {
        let project_id = config.project.id.as_deref().ok_or_else(|| {
            anyhow::anyhow!("project id not set in fnpack.toml; set [project].id to use --fetch-config")
        })?;
        let api = HttpRuntimeConfigApi::new();
        let values = get_functions_config(&api, project_id).await?;
        return Ok(Some(Value::Object(values)));
    }

    match &config.functions.runtime_config {
        Some(path) => Ok(Some(load_runtime_config(&project_dir.join(path))?)),
        None => Ok(None),
    }
}
