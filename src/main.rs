use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cloud_storage_client::{StorageClient, StorageOptions};

/// Move files between the local disk and the configured storage container.
///
/// Configuration comes from `STORAGE_*` environment variables (a `.env` file is honoured).
#[derive(Parser)]
#[command(name = "storage-cli", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the container if it does not exist
    Init,
    /// Upload a local file
    Upload { local: PathBuf, dest: String },
    /// Download an object into a local file
    Download { dest: String, local: PathBuf },
    /// Remove an object
    Remove { dest: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cloud_storage_client=debug,storage_cli=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let options = StorageOptions::from_env()?;
    let client = StorageClient::new(options)?;

    tracing::debug!(
        "Using {} container {}",
        client.provider(),
        client.config().container
    );

    match cli.command {
        Command::Init => {
            client.init().await?;
        }
        Command::Upload { local, dest } => {
            let result = client.upload(&local, &dest).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Download { dest, local } => {
            let metadata = client.download(&dest, &local).await?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        Command::Remove { dest } => {
            client.remove(&dest).await?;
        }
    }

    Ok(())
}
