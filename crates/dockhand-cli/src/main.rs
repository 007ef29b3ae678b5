//! Dockhand CLI entrypoint.

use clap::Parser;

mod commands;
mod config;
mod deploy;
mod handlers;

use commands::{Commands, VaultCommands};
use config::CliConfig;

#[derive(Parser)]
#[command(name = "dockhand")]
#[command(author, version, about = "Dockhand secret sync command-line interface", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = CliConfig::load().unwrap_or_default();

    match cli.command {
        Commands::Sync {
            stack,
            env,
            redeploy,
        } => handlers::sync(&config, &stack, env, redeploy).await?,
        Commands::SyncAll { redeploy } => handlers::sync_all(&config, redeploy).await?,
        Commands::Vault { command } => match command {
            VaultCommands::Test => handlers::vault_test(&config).await?,
            VaultCommands::Show => handlers::vault_show(&config).await?,
        },
    }

    Ok(())
}
