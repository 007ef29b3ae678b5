//! Per-stack secret synchronization.
//!
//! The orchestrator never fails: every error on the way folds into the
//! returned [`SyncResult`] so a fleet sweep can keep going.

use crate::discovery::find_manifest;
use crate::resolver::resolve_effective;
use dockhand_core::ids::EnvironmentId;
use dockhand_core::manifest::{ParsedManifest, SecretManifest};
use dockhand_core::ports::{EnvVarStore, SecretCipher, StackRegistry, VaultSettingsStore};
use dockhand_core::sync::{SecretEnvVar, SyncResult};
use dockhand_core::vault::VaultSettings;
use dockhand_core::{Error, Result};
use dockhand_vault::{VaultClient, VaultSession};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Upper bound on one stack's sync pass, so a hung store or server can
/// never stall a fleet sweep.
const STACK_SYNC_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs the secret sync pipeline for a single stack.
pub struct StackSyncer {
    settings: Arc<dyn VaultSettingsStore>,
    stacks: Arc<dyn StackRegistry>,
    env_vars: Arc<dyn EnvVarStore>,
    cipher: Arc<dyn SecretCipher>,
}

impl StackSyncer {
    pub fn new(
        settings: Arc<dyn VaultSettingsStore>,
        stacks: Arc<dyn StackRegistry>,
        env_vars: Arc<dyn EnvVarStore>,
        cipher: Arc<dyn SecretCipher>,
    ) -> Self {
        Self {
            settings,
            stacks,
            env_vars,
            cipher,
        }
    }

    /// Synchronize one stack's secrets from Vault into the env-var store.
    pub async fn sync_stack_secrets(
        &self,
        stack_name: &str,
        stack_dir: &Path,
        environment_id: Option<EnvironmentId>,
    ) -> SyncResult {
        let sync = self.run_sync(stack_name, stack_dir, environment_id);
        match tokio::time::timeout(STACK_SYNC_TIMEOUT, sync).await {
            Ok(result) => result,
            Err(_) => SyncResult::fail(format!(
                "secret sync for stack \"{stack_name}\" timed out after {}s",
                STACK_SYNC_TIMEOUT.as_secs()
            )),
        }
    }

    async fn run_sync(
        &self,
        stack_name: &str,
        stack_dir: &Path,
        environment_id: Option<EnvironmentId>,
    ) -> SyncResult {
        // Environment scope is best-effort: an unresolvable environment
        // makes the synced variables environment-agnostic, it does not
        // fail the sync.
        let environment_id = match environment_id {
            Some(id) => Some(id),
            None => match self.stacks.environment_for_stack(stack_name).await {
                Ok(id) => id,
                Err(e) => {
                    warn!(stack = %stack_name, error = %e, "could not resolve environment, syncing without scope");
                    None
                }
            },
        };

        let manifest = match self.load_manifest(stack_dir).await {
            Ok(Some(manifest)) => manifest,
            Ok(None) => return SyncResult::skip(),
            Err(e) => return SyncResult::fail(e.to_string()),
        };

        let settings = match self.settings.get().await {
            Ok(Some(settings)) if settings.enabled => settings,
            Ok(Some(_)) => {
                return SyncResult::fail(
                    "Vault sync is disabled; enable it in the Vault settings first",
                );
            }
            Ok(None) => {
                return SyncResult::fail(
                    "Vault is not configured; configure Vault before syncing secrets",
                );
            }
            Err(e) => return SyncResult::fail(format!("could not load Vault settings: {e}")),
        };

        let parsed = manifest.normalize(&settings.default_path);

        let session = match self.connect(&settings, &parsed).await {
            Ok(session) => session,
            Err(e) => return SyncResult::fail(e.to_string()),
        };

        // Prior values drive the change diff. Failing to load them must
        // never suppress a needed redeploy, so the fallback classifies
        // every incoming secret as changed.
        let existing: HashMap<String, String> =
            match self.env_vars.list(stack_name, environment_id).await {
                Ok(vars) => vars.into_iter().map(|v| (v.name, v.value)).collect(),
                Err(e) => {
                    warn!(stack = %stack_name, error = %e, "could not load stored secrets for comparison, treating all as changed");
                    HashMap::new()
                }
            };

        let mut errors = Vec::new();
        let mut fetched: Vec<SecretEnvVar> = Vec::new();
        let mut changed: Vec<String> = Vec::new();
        let mut trigger_redeploy: Vec<String> = Vec::new();

        for group in &parsed.secrets_by_path {
            let keys: Vec<String> = group.secrets.iter().map(|s| s.vault_key.clone()).collect();
            let values: HashMap<String, String> =
                match session.get_secrets(&group.path, &keys).await {
                    Ok(pairs) => pairs.into_iter().collect(),
                    Err(e) => {
                        // One unreadable path never aborts the others.
                        errors.push(e.to_string());
                        continue;
                    }
                };

            for binding in &group.secrets {
                let Some(value) = values.get(&binding.vault_key) else {
                    errors.push(
                        Error::SecretNotFound {
                            key: binding.vault_key.clone(),
                            path: group.path.clone(),
                        }
                        .to_string(),
                    );
                    continue;
                };
                if existing.get(&binding.env_var) != Some(value) {
                    changed.push(binding.env_var.clone());
                    if binding.trigger_redeploy {
                        trigger_redeploy.push(binding.env_var.clone());
                    }
                }
                fetched.push(SecretEnvVar {
                    name: binding.env_var.clone(),
                    value: value.clone(),
                    is_secret: true,
                });
            }
        }

        let synced = fetched.len();
        if !fetched.is_empty()
            && let Err(e) = self
                .env_vars
                .put_batch(stack_name, environment_id, &fetched)
                .await
        {
            // Nothing was committed, so nothing may drive a redeploy.
            errors.push(format!("failed to persist synced secrets: {e}"));
            return SyncResult {
                success: false,
                synced: 0,
                skipped: false,
                errors,
                secrets_changed: false,
                trigger_redeploy_secrets: Vec::new(),
            };
        }

        info!(
            stack = %stack_name,
            synced,
            changed = changed.len(),
            redeploy_flagged = trigger_redeploy.len(),
            "secret sync complete"
        );

        SyncResult {
            success: errors.is_empty(),
            synced,
            skipped: false,
            errors,
            secrets_changed: !changed.is_empty(),
            trigger_redeploy_secrets: trigger_redeploy,
        }
    }

    async fn load_manifest(&self, stack_dir: &Path) -> Result<Option<SecretManifest>> {
        let Some(path) = find_manifest(stack_dir).await else {
            return Ok(None);
        };
        let raw = tokio::fs::read_to_string(&path).await?;
        SecretManifest::parse(&raw).map(Some)
    }

    async fn connect(
        &self,
        settings: &VaultSettings,
        parsed: &ParsedManifest,
    ) -> Result<VaultSession> {
        let effective = resolve_effective(settings, parsed, self.cipher.as_ref())?;
        let client = VaultClient::new(&effective)?;
        client.authenticate(&effective.credentials).await
    }
}
