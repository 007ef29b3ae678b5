//! Secrets manifest model.
//!
//! Each Git-backed stack may carry a small YAML manifest naming which
//! Vault secrets map to which environment variables. The manifest is
//! duck-typed on the authoring side (a secret is either a bare string or
//! a mapping), so parsing validates every item eagerly and normalization
//! produces the path-grouped form the sync pipeline consumes.

use crate::error::{Error, Result};
use crate::vault::{VaultAuthMethod, VaultAuthOverride, kv2_path};
use serde::{Deserialize, Serialize};

/// Manifest filenames probed in a stack directory, in order of precedence.
pub const MANIFEST_FILE_NAMES: [&str; 4] =
    [".secrets.yaml", ".secrets.yml", "secrets.yaml", "secrets.yml"];

/// A parsed secrets manifest, shape-validated but not yet normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretManifest {
    #[serde(default)]
    pub vault: Option<VaultBlock>,
    pub secrets: Vec<SecretItem>,
}

/// The optional `vault` block overriding parts of the global settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultBlock {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub auth: Option<AuthBlock>,
    /// Manifest-wide default for the redeploy flag.
    #[serde(default, rename = "triggerRedeploy")]
    pub trigger_redeploy: bool,
}

/// The `vault.auth` block. An override only takes effect when `method`
/// is present; credential fields alone are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthBlock {
    #[serde(default)]
    pub method: Option<VaultAuthMethod>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub role_id: Option<String>,
    #[serde(default)]
    pub secret_id: Option<String>,
    #[serde(default)]
    pub kube_role: Option<String>,
}

/// One item of the `secrets` list: a bare string or an entry mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecretItem {
    Name(String),
    Entry(SecretEntry),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretEntry {
    /// Environment variable the secret is written to.
    pub name: String,
    /// Vault field name; defaults to the lowercased `name`.
    #[serde(default)]
    pub key: Option<String>,
    /// Full-path override for this secret only.
    #[serde(default)]
    pub path: Option<String>,
    /// Tri-state: unset inherits the manifest-wide default. Never defaulted
    /// to false here, or the override hierarchy collapses.
    #[serde(default, rename = "triggerRedeploy")]
    pub trigger_redeploy: Option<bool>,
}

/// A single `vault key -> env var` binding with its resolved redeploy flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretBinding {
    pub env_var: String,
    pub vault_key: String,
    pub trigger_redeploy: bool,
}

/// Bindings grouped by their resolved Vault path, in first-appearance order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathGroup {
    pub path: String,
    pub secrets: Vec<SecretBinding>,
}

/// The normalized form consumed by the sync orchestrator.
#[derive(Debug, Clone)]
pub struct ParsedManifest {
    /// Effective base path, KV v2 normalized.
    pub vault_path: String,
    pub vault_address: Option<String>,
    pub vault_namespace: Option<String>,
    pub auth_override: Option<VaultAuthOverride>,
    pub trigger_redeploy_default: bool,
    pub secrets_by_path: Vec<PathGroup>,
}

impl SecretManifest {
    /// Parse a raw manifest document.
    ///
    /// Fails when the document root is not a mapping, `secrets` is missing
    /// or not a list, or any item has a shape that is neither a string nor
    /// an entry mapping.
    pub fn parse(raw: &str) -> Result<Self> {
        let doc: serde_yaml::Value = serde_yaml::from_str(raw)
            .map_err(|e| Error::Manifest(format!("not valid YAML: {e}")))?;
        if !doc.is_mapping() {
            return Err(Error::Manifest(
                "document root must be a mapping".to_string(),
            ));
        }

        let vault = match doc.get("vault") {
            Some(value) => Some(
                serde_yaml::from_value::<VaultBlock>(value.clone())
                    .map_err(|e| Error::Manifest(format!("invalid vault block: {e}")))?,
            ),
            None => None,
        };

        let items = doc
            .get("secrets")
            .ok_or_else(|| Error::Manifest("missing \"secrets\" list".to_string()))?
            .as_sequence()
            .ok_or_else(|| Error::Manifest("\"secrets\" must be a list".to_string()))?;

        let mut secrets = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            secrets.push(parse_secret_item(index, item)?);
        }

        Ok(Self { vault, secrets })
    }

    /// Normalize into the path-grouped form, resolving per-secret paths,
    /// keys, and redeploy flags against the manifest-wide defaults.
    pub fn normalize(&self, default_path: &str) -> ParsedManifest {
        let vault = self.vault.as_ref();
        let base_path = vault
            .and_then(|v| v.path.as_deref())
            .unwrap_or(default_path);
        let trigger_default = vault.is_some_and(|v| v.trigger_redeploy);

        let mut groups: Vec<PathGroup> = Vec::new();
        for item in &self.secrets {
            let (env_var, vault_key, path, flag) = match item {
                SecretItem::Name(name) => {
                    (name.to_uppercase(), name.to_lowercase(), None, None)
                }
                SecretItem::Entry(entry) => (
                    entry.name.clone(),
                    entry
                        .key
                        .clone()
                        .unwrap_or_else(|| entry.name.to_lowercase()),
                    entry.path.as_deref(),
                    entry.trigger_redeploy,
                ),
            };
            let resolved_path = kv2_path(path.unwrap_or(base_path));
            let binding = SecretBinding {
                env_var,
                vault_key,
                trigger_redeploy: flag.unwrap_or(trigger_default),
            };
            match groups.iter_mut().find(|g| g.path == resolved_path) {
                Some(group) => group.secrets.push(binding),
                None => groups.push(PathGroup {
                    path: resolved_path,
                    secrets: vec![binding],
                }),
            }
        }

        let auth_override = vault.and_then(|v| v.auth.as_ref()).and_then(|auth| {
            auth.method.map(|method| VaultAuthOverride {
                method,
                token: auth.token.clone(),
                role_id: auth.role_id.clone(),
                secret_id: auth.secret_id.clone(),
                kube_role: auth.kube_role.clone(),
            })
        });

        ParsedManifest {
            vault_path: kv2_path(base_path),
            vault_address: vault.and_then(|v| v.address.clone()),
            vault_namespace: vault.and_then(|v| v.namespace.clone()),
            auth_override,
            trigger_redeploy_default: trigger_default,
            secrets_by_path: groups,
        }
    }
}

fn parse_secret_item(index: usize, item: &serde_yaml::Value) -> Result<SecretItem> {
    match item {
        serde_yaml::Value::String(name) => Ok(SecretItem::Name(name.clone())),
        serde_yaml::Value::Mapping(_) => serde_yaml::from_value::<SecretEntry>(item.clone())
            .map(SecretItem::Entry)
            .map_err(|e| Error::Manifest(format!("secret entry {index}: {e}"))),
        other => {
            let rendered = serde_yaml::to_string(other).unwrap_or_default();
            Err(Error::Manifest(format!(
                "secret entry {index} must be a string or a mapping, got: {}",
                rendered.trim()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_string_expands() {
        let manifest = SecretManifest::parse("secrets:\n  - db_pass\n").unwrap();
        let parsed = manifest.normalize("secret/app");
        let binding = &parsed.secrets_by_path[0].secrets[0];
        assert_eq!(binding.env_var, "DB_PASS");
        assert_eq!(binding.vault_key, "db_pass");
        assert!(!binding.trigger_redeploy);
    }

    #[test]
    fn test_entry_key_defaults_to_lowercased_name() {
        let manifest =
            SecretManifest::parse("secrets:\n  - name: API_TOKEN\n").unwrap();
        let parsed = manifest.normalize("secret/app");
        let binding = &parsed.secrets_by_path[0].secrets[0];
        assert_eq!(binding.env_var, "API_TOKEN");
        assert_eq!(binding.vault_key, "api_token");
    }

    #[test]
    fn test_base_path_gets_data_segment() {
        let manifest = SecretManifest::parse("secrets:\n  - name: X\n    key: y\n").unwrap();
        let parsed = manifest.normalize("secret/app");
        assert_eq!(parsed.vault_path, "secret/data/app");
        assert_eq!(parsed.secrets_by_path[0].path, "secret/data/app");
    }

    #[test]
    fn test_secrets_grouped_by_resolved_path() {
        let raw = r#"
secrets:
  - name: A
  - name: B
    path: secret/data/other
  - name: C
"#;
        let manifest = SecretManifest::parse(raw).unwrap();
        let parsed = manifest.normalize("secret/app");
        assert_eq!(parsed.secrets_by_path.len(), 2);
        assert_eq!(parsed.secrets_by_path[0].path, "secret/data/app");
        assert_eq!(
            parsed.secrets_by_path[0]
                .secrets
                .iter()
                .map(|s| s.env_var.as_str())
                .collect::<Vec<_>>(),
            vec!["A", "C"]
        );
        assert_eq!(parsed.secrets_by_path[1].path, "secret/data/other");
    }

    #[test]
    fn test_rejects_non_mapping_root() {
        let err = SecretManifest::parse("- just\n- a\n- list\n").unwrap_err();
        assert!(err.to_string().contains("mapping"));
    }

    #[test]
    fn test_rejects_missing_secrets() {
        let err = SecretManifest::parse("vault:\n  path: secret/app\n").unwrap_err();
        assert!(err.to_string().contains("secrets"));
    }

    #[test]
    fn test_rejects_scalar_item_naming_it() {
        let err = SecretManifest::parse("secrets:\n  - 42\n").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("secret entry 0"));
        assert!(message.contains("42"));
    }

    #[test]
    fn test_rejects_entry_without_name() {
        let err = SecretManifest::parse("secrets:\n  - key: lonely\n").unwrap_err();
        assert!(err.to_string().contains("secret entry 0"));
    }

    #[test]
    fn test_auth_override_requires_method() {
        let raw = r#"
vault:
  auth:
    token: plaintext
secrets: []
"#;
        let manifest = SecretManifest::parse(raw).unwrap();
        assert!(manifest.normalize("secret/app").auth_override.is_none());
    }

    #[test]
    fn test_empty_secrets_list_is_valid() {
        let manifest = SecretManifest::parse("secrets: []\n").unwrap();
        let parsed = manifest.normalize("secret/app");
        assert!(parsed.secrets_by_path.is_empty());
    }
}
