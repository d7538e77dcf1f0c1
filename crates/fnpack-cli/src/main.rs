mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fnpack_build::PackageError;

#[derive(Parser)]
#[command(
    name = "fnpack",
    about = "Package serverless functions source and scaffold Data Connect SDKs"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter fnpack.toml
    Init,
    /// Zip the functions source and print its fingerprint
    Package {
        /// Source directory (defaults to [functions].source)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// JSON file injected as .runtimeconfig.json
        #[arg(long, conflicts_with = "fetch_config")]
        runtime_config: Option<PathBuf>,
        /// Fetch runtime config from Cloud Runtime Config
        #[arg(long)]
        fetch_config: bool,
    },
    /// Write connector.yaml and generate a Data Connect SDK
    Sdk {
        /// Connector directory (created if missing)
        #[arg(long)]
        connector_dir: PathBuf,
        /// Connector ID
        #[arg(long)]
        connector_id: String,
        /// SDK platform to generate
        #[arg(long, value_enum)]
        platform: Option<commands::SdkPlatform>,
        /// Output directory of the generated SDK, relative to the connector
        #[arg(long, requires = "platform")]
        output_dir: Option<String>,
        /// Package name of the generated SDK
        #[arg(long, requires = "platform")]
        package: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:?}");
        let code = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<PackageError>())
            .map_or(1, PackageError::exit_code);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init => commands::init_project().await?,
        Commands::Package {
            dir,
            runtime_config,
            fetch_config,
        } => commands::package(dir, runtime_config, fetch_config).await?,
        Commands::Sdk {
            connector_dir,
            connector_id,
            platform,
            output_dir,
            package,
        } => {
            commands::sdk(commands::SdkArgs {
                connector_dir,
                connector_id,
                platform,
                output_dir,
                package,
            })
            .await?
        }
    }

    Ok(())
}
