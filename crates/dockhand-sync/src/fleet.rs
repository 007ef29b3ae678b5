//! Fleet-wide synchronization.

use crate::orchestrator::StackSyncer;
use dockhand_core::ports::StackRegistry;
use dockhand_core::sync::SyncResult;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

/// Runs the per-stack sync across every Git-backed stack. One stack's
/// failure never aborts the sweep; every stack gets an entry in the
/// result map.
pub struct FleetSyncer {
    stacks: Arc<dyn StackRegistry>,
    syncer: Arc<StackSyncer>,
}

impl FleetSyncer {
    pub fn new(stacks: Arc<dyn StackRegistry>, syncer: Arc<StackSyncer>) -> Self {
        Self { stacks, syncer }
    }

    pub async fn sync_all_stack_secrets(&self) -> BTreeMap<String, SyncResult> {
        let mut results = BTreeMap::new();

        let stacks = match self.stacks.list_git_stacks().await {
            Ok(stacks) => stacks,
            Err(e) => {
                error!(error = %e, "could not list stacks for fleet sync");
                return results;
            }
        };

        for stack in stacks {
            let result = match &stack.directory {
                Some(dir) => {
                    self.syncer
                        .sync_stack_secrets(&stack.name, dir, stack.environment_id)
                        .await
                }
                None => SyncResult::fail(format!(
                    "stack \"{}\" has no resolvable working directory",
                    stack.name
                )),
            };
            results.insert(stack.name, result);
        }

        info!(stacks = results.len(), "fleet secret sync complete");
        results
    }
}
