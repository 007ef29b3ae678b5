//! JSON-file-backed implementations of the persistence ports.
//!
//! The dashboard's relational store is out of scope here; these adapters
//! keep the same contracts on flat JSON files so the pipeline runs
//! standalone. Batch writes land in a temp file first and are renamed
//! into place, so a crash never truncates existing data.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dockhand_core::ids::EnvironmentId;
use dockhand_core::ports::{EnvVarStore, SecretCipher, StackRegistry, VaultSettingsStore};
use dockhand_core::sync::{GitStack, SecretEnvVar};
use dockhand_core::vault::VaultSettings;
use dockhand_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| {
            Error::Serialization(format!("{} is not valid JSON: {e}", path.display()))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::Persistence(format!(
            "could not read {}: {e}",
            path.display()
        ))),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(value)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            Error::Persistence(format!("could not create {}: {e}", parent.display()))
        })?;
    }
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, raw)
        .await
        .map_err(|e| Error::Persistence(format!("could not write {}: {e}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| Error::Persistence(format!("could not replace {}: {e}", path.display())))?;
    Ok(())
}

/// Single-record store for the global Vault settings.
pub struct FileVaultSettingsStore {
    path: PathBuf,
}

impl FileVaultSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl VaultSettingsStore for FileVaultSettingsStore {
    async fn get(&self) -> Result<Option<VaultSettings>> {
        read_json(&self.path).await
    }

    async fn save(&self, settings: &VaultSettings) -> Result<()> {
        write_json(&self.path, settings).await
    }

    async fn delete(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Persistence(format!(
                "could not delete {}: {e}",
                self.path.display()
            ))),
        }
    }
}

/// One stack as registered in the dashboard's stacks file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackRecord {
    pub name: String,
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// True for stacks deployed from a Git checkout.
    #[serde(default)]
    pub git: bool,
    #[serde(default)]
    pub environment_id: Option<EnvironmentId>,
}

/// Stack registry backed by a JSON list.
pub struct FileStackRegistry {
    path: PathBuf,
}

impl FileStackRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn records(&self) -> Result<Vec<StackRecord>> {
        Ok(read_json(&self.path).await?.unwrap_or_default())
    }
}

#[async_trait]
impl StackRegistry for FileStackRegistry {
    async fn list_git_stacks(&self) -> Result<Vec<GitStack>> {
        Ok(self
            .records()
            .await?
            .into_iter()
            .filter(|record| record.git)
            .map(|record| GitStack {
                name: record.name,
                directory: record.directory,
                environment_id: record.environment_id,
            })
            .collect())
    }

    async fn environment_for_stack(&self, stack_name: &str) -> Result<Option<EnvironmentId>> {
        Ok(self
            .records()
            .await?
            .into_iter()
            .find(|record| record.name == stack_name)
            .and_then(|record| record.environment_id))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEnvVar {
    stack: String,
    #[serde(default)]
    environment_id: Option<EnvironmentId>,
    name: String,
    /// Ciphertext when `is_secret`, plaintext otherwise.
    value: String,
    is_secret: bool,
    updated_at: DateTime<Utc>,
}

/// Env-var store backed by a JSON list, encrypting flagged values at rest.
pub struct FileEnvVarStore {
    path: PathBuf,
    cipher: Arc<dyn SecretCipher>,
}

impl FileEnvVarStore {
    pub fn new(path: impl Into<PathBuf>, cipher: Arc<dyn SecretCipher>) -> Self {
        Self {
            path: path.into(),
            cipher,
        }
    }

    async fn records(&self) -> Result<Vec<StoredEnvVar>> {
        Ok(read_json(&self.path).await?.unwrap_or_default())
    }
}

#[async_trait]
impl EnvVarStore for FileEnvVarStore {
    async fn list(
        &self,
        stack_name: &str,
        environment_id: Option<EnvironmentId>,
    ) -> Result<Vec<SecretEnvVar>> {
        let mut vars = Vec::new();
        for record in self.records().await? {
            if record.stack != stack_name || record.environment_id != environment_id {
                continue;
            }
            let value = if record.is_secret {
                self.cipher.decrypt(&record.value)?
            } else {
                record.value
            };
            vars.push(SecretEnvVar {
                name: record.name,
                value,
                is_secret: record.is_secret,
            });
        }
        Ok(vars)
    }

    async fn put_batch(
        &self,
        stack_name: &str,
        environment_id: Option<EnvironmentId>,
        vars: &[SecretEnvVar],
    ) -> Result<()> {
        let mut records = self.records().await?;
        let now = Utc::now();

        for var in vars {
            let value = if var.is_secret {
                self.cipher.encrypt(&var.value)?
            } else {
                var.value.clone()
            };
            let updated = StoredEnvVar {
                stack: stack_name.to_string(),
                environment_id,
                name: var.name.clone(),
                value,
                is_secret: var.is_secret,
                updated_at: now,
            };
            match records.iter_mut().find(|record| {
                record.stack == stack_name
                    && record.environment_id == environment_id
                    && record.name == var.name
            }) {
                Some(record) => *record = updated,
                None => records.push(updated),
            }
        }

        write_json(&self.path, &records).await
    }
}
