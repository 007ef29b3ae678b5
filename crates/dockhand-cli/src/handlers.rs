//! Command handlers.

use crate::config::CliConfig;
use crate::deploy::ComposeDeployTrigger;
use anyhow::{Context, Result, bail};
use dockhand_core::ids::EnvironmentId;
use dockhand_core::ports::{DeployTrigger, SecretCipher, StackRegistry, VaultSettingsStore};
use dockhand_core::sync::{GitStack, SyncResult};
use dockhand_core::vault::{EffectiveVaultConfig, VaultCredentials};
use dockhand_store::{AesGcmCipher, FileEnvVarStore, FileStackRegistry, FileVaultSettingsStore};
use dockhand_sync::{FleetSyncer, StackSyncer};
use dockhand_vault::VaultClient;
use std::sync::Arc;

struct Services {
    settings: Arc<FileVaultSettingsStore>,
    stacks: Arc<FileStackRegistry>,
    syncer: Arc<StackSyncer>,
}

fn build_services(config: &CliConfig) -> Result<Services> {
    let master_key = std::env::var(&config.master_key_env)
        .with_context(|| format!("{} is not set", config.master_key_env))?;
    let cipher: Arc<dyn SecretCipher> = Arc::new(AesGcmCipher::from_master_key(&master_key));
    let settings = Arc::new(FileVaultSettingsStore::new(config.settings_path()));
    let stacks = Arc::new(FileStackRegistry::new(config.stacks_path()));
    let env_vars = Arc::new(FileEnvVarStore::new(config.env_vars_path(), cipher.clone()));
    let syncer = Arc::new(StackSyncer::new(
        settings.clone(),
        stacks.clone(),
        env_vars,
        cipher,
    ));
    Ok(Services {
        settings,
        stacks,
        syncer,
    })
}

async fn lookup_stack(services: &Services, stack_name: &str) -> Result<GitStack> {
    services
        .stacks
        .list_git_stacks()
        .await?
        .into_iter()
        .find(|stack| stack.name == stack_name)
        .with_context(|| format!("stack \"{stack_name}\" is not a registered Git stack"))
}

fn report(stack_name: &str, result: &SyncResult) {
    if result.skipped {
        println!("{stack_name}: no secrets manifest, nothing to sync");
        return;
    }
    let status = if result.success { "ok" } else { "failed" };
    println!(
        "{stack_name}: {status}, {} secret(s) synced, changed: {}",
        result.synced, result.secrets_changed
    );
    if !result.trigger_redeploy_secrets.is_empty() {
        println!(
            "{stack_name}: redeploy-flagged changes: {}",
            result.trigger_redeploy_secrets.join(", ")
        );
    }
    for error in &result.errors {
        eprintln!("{stack_name}: error: {error}");
    }
}

async fn maybe_redeploy(stack: &GitStack, result: &SyncResult) -> Result<()> {
    if !result.should_redeploy() {
        return Ok(());
    }
    ComposeDeployTrigger::new().redeploy(stack).await?;
    println!("{}: redeployed", stack.name);
    Ok(())
}

pub async fn sync(
    config: &CliConfig,
    stack_name: &str,
    env: Option<String>,
    redeploy: bool,
) -> Result<()> {
    let services = build_services(config)?;
    let stack = lookup_stack(&services, stack_name).await?;
    let environment_id = match env {
        Some(raw) => Some(
            raw.parse::<EnvironmentId>()
                .with_context(|| format!("\"{raw}\" is not a valid environment id"))?,
        ),
        None => None,
    };
    let Some(dir) = stack.directory.clone() else {
        bail!("stack \"{stack_name}\" has no working directory");
    };

    let result = services
        .syncer
        .sync_stack_secrets(stack_name, &dir, environment_id)
        .await;
    report(stack_name, &result);

    if redeploy {
        maybe_redeploy(&stack, &result).await?;
    }
    if !result.success {
        bail!("secret sync for \"{stack_name}\" completed with errors");
    }
    Ok(())
}

pub async fn sync_all(config: &CliConfig, redeploy: bool) -> Result<()> {
    let services = build_services(config)?;
    let fleet = FleetSyncer::new(services.stacks.clone(), services.syncer.clone());

    let results = fleet.sync_all_stack_secrets().await;
    if results.is_empty() {
        println!("no Git-backed stacks registered");
        return Ok(());
    }

    let stacks = services.stacks.list_git_stacks().await?;
    let mut failures = 0;
    for (stack_name, result) in &results {
        report(stack_name, result);
        if !result.success {
            failures += 1;
        }
        if redeploy
            && let Some(stack) = stacks.iter().find(|s| &s.name == stack_name)
        {
            maybe_redeploy(stack, result).await?;
        }
    }

    if failures > 0 {
        bail!("{failures} of {} stack(s) failed to sync", results.len());
    }
    Ok(())
}

pub async fn vault_test(config: &CliConfig) -> Result<()> {
    let services = build_services(config)?;
    let Some(settings) = services.settings.get().await? else {
        bail!("Vault is not configured");
    };

    // The health probe is unauthenticated; only the transport settings
    // matter, so no credentials are decrypted here.
    let effective = EffectiveVaultConfig {
        address: settings.address.clone(),
        namespace: settings.namespace.clone(),
        default_path: settings.default_path.clone(),
        skip_tls_verify: settings.skip_tls_verify,
        request_timeout_secs: settings.request_timeout_secs,
        credentials: VaultCredentials::Token {
            token: String::new(),
        },
    };
    let client = VaultClient::new(&effective)?;

    let probe = client.test_connection().await;
    if probe.success {
        match probe.version {
            Some(version) => println!(
                "Vault reachable at {} (version {version})",
                settings.address
            ),
            None => println!("Vault reachable at {}", settings.address),
        }
        Ok(())
    } else {
        bail!(
            "Vault unreachable at {}: {}",
            settings.address,
            probe.error.unwrap_or_else(|| "unknown error".to_string())
        )
    }
}

pub async fn vault_show(config: &CliConfig) -> Result<()> {
    let services = build_services(config)?;
    let Some(settings) = services.settings.get().await? else {
        bail!("Vault is not configured");
    };

    println!("address:          {}", settings.address);
    println!(
        "namespace:        {}",
        settings.namespace.as_deref().unwrap_or("-")
    );
    println!("default path:     {}", settings.default_path);
    println!("auth method:      {:?}", settings.auth_method);
    println!("token:            {}", mask(settings.token.as_deref()));
    println!(
        "role_id:          {}",
        settings.role_id.as_deref().unwrap_or("-")
    );
    println!("secret_id:        {}", mask(settings.secret_id.as_deref()));
    println!(
        "kube_role:        {}",
        settings.kube_role.as_deref().unwrap_or("-")
    );
    println!("skip TLS verify:  {}", settings.skip_tls_verify);
    println!("enabled:          {}", settings.enabled);
    Ok(())
}

fn mask(value: Option<&str>) -> &'static str {
    match value {
        Some(_) => "***",
        None => "-",
    }
}
