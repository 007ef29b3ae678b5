//! Vault connection settings and effective configuration.

use serde::{Deserialize, Serialize};

/// Global Vault connection settings. One active record, persisted by the
/// dashboard and consumed by every sync pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultSettings {
    /// Server address, e.g. `https://vault.example.com:8200`.
    pub address: String,
    /// Enterprise namespace, sent as a routing header when present.
    #[serde(default)]
    pub namespace: Option<String>,
    /// KV v2 mount plus logical path used when a manifest declares none.
    pub default_path: String,
    pub auth_method: VaultAuthMethod,
    /// Stored encrypted at rest.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub role_id: Option<String>,
    /// Stored encrypted at rest.
    #[serde(default)]
    pub secret_id: Option<String>,
    #[serde(default)]
    pub kube_role: Option<String>,
    #[serde(default)]
    pub skip_tls_verify: bool,
    /// Gate for whether secret sync may run at all.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultAuthMethod {
    Token,
    #[serde(rename = "approle")]
    AppRole,
    Kubernetes,
}

/// Authentication override declared in a manifest's `vault.auth` block.
/// Credentials here come from the Git repository in plaintext and bypass
/// the stored, encrypted credentials entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultAuthOverride {
    pub method: VaultAuthMethod,
    pub token: Option<String>,
    pub role_id: Option<String>,
    pub secret_id: Option<String>,
    pub kube_role: Option<String>,
}

/// The merged configuration actually used to authenticate one sync pass.
/// Credentials are already decrypted.
#[derive(Debug, Clone)]
pub struct EffectiveVaultConfig {
    pub address: String,
    pub namespace: Option<String>,
    pub default_path: String,
    pub skip_tls_verify: bool,
    pub request_timeout_secs: u64,
    pub credentials: VaultCredentials,
}

#[derive(Clone, PartialEq, Eq)]
pub enum VaultCredentials {
    Token { token: String },
    AppRole { role_id: String, secret_id: String },
    Kubernetes { role: String },
}

impl std::fmt::Debug for VaultCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VaultCredentials::Token { .. } => f.debug_struct("Token").finish_non_exhaustive(),
            VaultCredentials::AppRole { role_id, .. } => f
                .debug_struct("AppRole")
                .field("role_id", role_id)
                .finish_non_exhaustive(),
            VaultCredentials::Kubernetes { role } => {
                f.debug_struct("Kubernetes").field("role", role).finish()
            }
        }
    }
}

/// Normalize a KV path to the v2 convention.
///
/// The v2 secret engine requires the literal `data` segment between the
/// mount and the logical key; a path lacking it gets the segment injected
/// after the mount. Already-normalized paths pass through unchanged.
pub fn kv2_path(raw: &str) -> String {
    let path = raw.trim_matches('/');
    if path.contains("/data/") || path.ends_with("/data") {
        return path.to_string();
    }
    match path.split_once('/') {
        Some((mount, rest)) => format!("{mount}/data/{rest}"),
        None => format!("{path}/data"),
    }
}
