//! CLI command definitions.

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Sync secrets for one stack
    Sync {
        /// Stack name as registered in the dashboard
        stack: String,
        /// Environment id to scope the synced variables to
        #[arg(long)]
        env: Option<String>,
        /// Redeploy the stack when changed secrets carry the redeploy flag
        #[arg(long)]
        redeploy: bool,
    },
    /// Sync secrets for every Git-backed stack
    SyncAll {
        /// Redeploy stacks whose changed secrets carry the redeploy flag
        #[arg(long)]
        redeploy: bool,
    },
    /// Vault connection management
    Vault {
        #[command(subcommand)]
        command: VaultCommands,
    },
}

#[derive(Subcommand)]
pub enum VaultCommands {
    /// Probe the configured Vault server
    Test,
    /// Print the stored Vault settings with credentials masked
    Show,
}
