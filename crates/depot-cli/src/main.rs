//! Depot CLI: resolve, push and inspect versioned assets.
//!
//! Configuration comes from the environment (see `AssetsConfig::from_env`);
//! a `.env` file in the working directory is honored.

use anyhow::Context;
use clap::{Parser, Subcommand};
use depot_core::AssetsConfig;
use depot_manager::{AssetVersion, AssetsManager};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "depot", about = "Versioned asset store CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an asset reference into a local cached path
    Fetch {
        /// Asset reference, e.g. `models/x:1.2[vocab/tokens.txt]`
        reference: String,
    },
    /// List the remote versions of an asset, highest first
    List {
        /// Asset name
        name: String,
    },
    /// Upload a file as a new asset version
    Push {
        /// Path to the file to upload
        file: std::path::PathBuf,
        /// Asset name
        name: String,
        /// Version as `major.minor`
        version: String,
    },
    /// Check whether an exact asset version exists remotely
    Exists {
        /// Asset name
        name: String,
        /// Version as `major.minor`
        version: String,
    },
    /// Delete a remote asset version
    Delete {
        /// Asset name
        name: String,
        /// Version as `major.minor`
        version: String,
    },
}

fn parse_version(raw: &str) -> anyhow::Result<AssetVersion> {
    raw.parse()
        .map_err(|_| anyhow::anyhow!("Invalid version `{raw}`, expected `major.minor`"))
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let config = AssetsConfig::from_env().context("Failed to read assets configuration")?;
    let manager = AssetsManager::from_config(&config)
        .context("Failed to create assets manager. Check STORAGE_PROVIDER and WORKING_DIR")?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch { reference } => {
            let fetched = manager.fetch(&reference).await?;
            print_json(&fetched)?;
        }
        Commands::List { name } => {
            let versions: Vec<String> = manager
                .list_versions(&name)
                .await?
                .iter()
                .map(|v| v.to_string())
                .collect();
            print_json(&serde_json::json!({ "name": name, "versions": versions }))?;
        }
        Commands::Push {
            file,
            name,
            version,
        } => {
            let version = parse_version(&version)?;
            let key = manager.push(&file, &name, &version).await?;
            print_json(&serde_json::json!({ "name": name, "version": version, "key": key }))?;
        }
        Commands::Exists { name, version } => {
            let version = parse_version(&version)?;
            let exists = manager.exists(&name, &version).await?;
            print_json(&serde_json::json!({ "name": name, "version": version, "exists": exists }))?;
        }
        Commands::Delete { name, version } => {
            let version = parse_version(&version)?;
            manager.delete(&name, &version).await?;
            print_json(&serde_json::json!({ "success": true, "name": name, "version": version }))?;
        }
    }

    Ok(())
}
