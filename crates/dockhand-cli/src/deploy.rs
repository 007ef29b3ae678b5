//! Compose redeploy action.

use async_trait::async_trait;
use dockhand_core::ports::DeployTrigger;
use dockhand_core::sync::GitStack;
use dockhand_core::{Error, Result};
use tokio::process::Command;
use tracing::info;

/// Redeploys a stack by running `docker compose up -d` in its directory.
#[derive(Debug, Default)]
pub struct ComposeDeployTrigger;

impl ComposeDeployTrigger {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DeployTrigger for ComposeDeployTrigger {
    async fn redeploy(&self, stack: &GitStack) -> Result<()> {
        let Some(dir) = &stack.directory else {
            return Err(Error::Deploy(format!(
                "stack \"{}\" has no working directory",
                stack.name
            )));
        };

        info!(stack = %stack.name, "redeploying via docker compose");
        let status = Command::new("docker")
            .args(["compose", "up", "-d"])
            .current_dir(dir)
            .status()
            .await?;

        if !status.success() {
            return Err(Error::Deploy(format!(
                "docker compose exited with {status} for stack \"{}\"",
                stack.name
            )));
        }
        Ok(())
    }
}
