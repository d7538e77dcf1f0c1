use std::path::PathBuf;

use fnpack_cloud::sdk::{
    Connector, ConnectorInfo, ConnectorSource, ConnectorYaml, EmulatorGenerator, GenerateConfig,
    SdkInfo, SdkTarget, actuate,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SdkPlatform {
    Js,
    Swift,
    Kotlin,
}

pub struct SdkArgs {
    pub connector_dir: PathBuf,
    pub connector_id: String,
    pub platform: Option<SdkPlatform>,
    pub output_dir: Option<String>,
    pub package: Option<String>,
}

/// Write connector.yaml for a connector and run the SDK generator.
pub async fn sdk(args: SdkArgs) -> anyhow::Result<()> {
    std::fs::create_dir_all(&args.connector_dir)?;

    let generate = args.platform.map(|platform| {
        let target = SdkTarget {
            output_dir: args
                .output_dir
                .clone()
                .unwrap_or_else(|| default_output_dir(platform).to_owned()),
            package: args
                .package
                .clone()
                .unwrap_or_else(|| default_package(platform, &args.connector_id)),
        };
        match platform {
            SdkPlatform::Js => GenerateConfig {
                javascript_sdk: Some(target),
                ..Default::default()
            },
            SdkPlatform::Swift => GenerateConfig {
                swift_sdk: Some(target),
                ..Default::default()
            },
            SdkPlatform::Kotlin => GenerateConfig {
                kotlin_sdk: Some(target),
                ..Default::default()
            },
        }
    });

    let connector_yaml = ConnectorYaml {
        connector_id: args.connector_id.clone(),
        generate,
    };
    let name = args
        .connector_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.connector_id.clone());

    let info = SdkInfo {
        connector_yaml_contents: connector_yaml.render(),
        connector_info: ConnectorInfo {
            connector: Connector {
                name,
                source: ConnectorSource::default(),
            },
            directory: args.connector_dir.clone(),
            connector_yaml,
        },
        display_ios_warning: args.platform == Some(SdkPlatform::Swift),
    };

    actuate(&info, &EmulatorGenerator::new()).await?;

    println!("Generated SDK for connector '{}'", args.connector_id);
    Ok(())
}

fn default_output_dir(platform: SdkPlatform) -> &'static str {
    match platform {
        SdkPlatform::Js => "../../dataconnect-generated/js",
        SdkPlatform::Swift => "../../dataconnect-generated/swift",
        SdkPlatform::Kotlin => "../../dataconnect-generated/kotlin",
    }
}

fn default_package(platform: SdkPlatform, connector_id: &str) -> String {
    match platform {
        SdkPlatform::Js => format!("@firebasegen/{connector_id}-connector"),
        SdkPlatform::Swift => format!("{}Connector", upper_first(connector_id)),
        SdkPlatform::Kotlin => format!("connectors.{}", connector_id.replace('-', "_")),
    }
}

fn upper_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
