//! Block Profit - Main Entry Point
//!
//! `train` fits and writes the pipeline artifact, `serve` (the default)
//! runs the prediction form, `sample` writes a synthetic block model.

use clap::Parser;
use block_profit::cli::{cmd_sample, cmd_serve, cmd_train, Cli, Commands};
use block_profit::server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "block_profit=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Train { data, output }) => {
            cmd_train(&data, &output)?;
        }
        Some(Commands::Sample { rows, seed, output }) => {
            cmd_sample(rows, seed, &output)?;
        }
        Some(Commands::Serve { host, port, model }) => {
            cmd_serve(ServerConfig { host, port, model_path: model }).await?;
        }
        None => {
            cmd_serve(ServerConfig::default()).await?;
        }
    }

    Ok(())
}
