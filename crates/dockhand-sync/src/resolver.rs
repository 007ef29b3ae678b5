//! Effective configuration resolution.
//!
//! Merges the global Vault settings with a manifest's overrides into the
//! configuration used to authenticate one sync pass. Manifest-declared
//! address, namespace, and auth win over the global settings; the default
//! path and the TLS bypass always come from the global settings.

use dockhand_core::manifest::ParsedManifest;
use dockhand_core::ports::SecretCipher;
use dockhand_core::vault::{
    EffectiveVaultConfig, VaultAuthMethod, VaultAuthOverride, VaultCredentials, VaultSettings,
};
use dockhand_core::{Error, Result};
use url::Url;

pub fn resolve_effective(
    settings: &VaultSettings,
    parsed: &ParsedManifest,
    cipher: &dyn SecretCipher,
) -> Result<EffectiveVaultConfig> {
    let address = parsed
        .vault_address
        .clone()
        .unwrap_or_else(|| settings.address.clone());
    Url::parse(&address)
        .map_err(|e| Error::Configuration(format!("invalid Vault address \"{address}\": {e}")))?;

    let namespace = parsed
        .vault_namespace
        .clone()
        .or_else(|| settings.namespace.clone());

    let credentials = match &parsed.auth_override {
        Some(auth) => credentials_from_override(auth)?,
        None => credentials_from_settings(settings, cipher)?,
    };

    Ok(EffectiveVaultConfig {
        address,
        namespace,
        default_path: settings.default_path.clone(),
        skip_tls_verify: settings.skip_tls_verify,
        request_timeout_secs: settings.request_timeout_secs,
        credentials,
    })
}

/// Manifest credentials arrive in plaintext from the Git checkout and are
/// used as-is.
fn credentials_from_override(auth: &VaultAuthOverride) -> Result<VaultCredentials> {
    match auth.method {
        VaultAuthMethod::Token => auth
            .token
            .clone()
            .map(|token| VaultCredentials::Token { token })
            .ok_or_else(|| {
                Error::Configuration(
                    "manifest auth override uses the token method but provides no token"
                        .to_string(),
                )
            }),
        VaultAuthMethod::AppRole => match (auth.role_id.clone(), auth.secret_id.clone()) {
            (Some(role_id), Some(secret_id)) => {
                Ok(VaultCredentials::AppRole { role_id, secret_id })
            }
            _ => Err(Error::Configuration(
                "manifest auth override uses the approle method but is missing role_id or secret_id"
                    .to_string(),
            )),
        },
        VaultAuthMethod::Kubernetes => auth
            .kube_role
            .clone()
            .map(|role| VaultCredentials::Kubernetes { role })
            .ok_or_else(|| {
                Error::Configuration(
                    "manifest auth override uses the kubernetes method but provides no kube_role"
                        .to_string(),
                )
            }),
    }
}

/// Stored `token` and `secret_id` are encrypted at rest and decrypted here,
/// immediately before client construction. A decryption failure fails the
/// sync; falling back to the ciphertext would authenticate with garbage.
fn credentials_from_settings(
    settings: &VaultSettings,
    cipher: &dyn SecretCipher,
) -> Result<VaultCredentials> {
    match settings.auth_method {
        VaultAuthMethod::Token => {
            let stored = settings.token.as_deref().ok_or_else(|| {
                Error::Configuration("token auth is configured but no token is stored".to_string())
            })?;
            let token = cipher.decrypt(stored).map_err(|e| {
                Error::Crypto(format!("stored Vault token could not be decrypted: {e}"))
            })?;
            Ok(VaultCredentials::Token { token })
        }
        VaultAuthMethod::AppRole => {
            let role_id = settings.role_id.clone().ok_or_else(|| {
                Error::Configuration(
                    "approle auth is configured but no role_id is stored".to_string(),
                )
            })?;
            let stored = settings.secret_id.as_deref().ok_or_else(|| {
                Error::Configuration(
                    "approle auth is configured but no secret_id is stored".to_string(),
                )
            })?;
            let secret_id = cipher.decrypt(stored).map_err(|e| {
                Error::Crypto(format!("stored secret_id could not be decrypted: {e}"))
            })?;
            Ok(VaultCredentials::AppRole { role_id, secret_id })
        }
        VaultAuthMethod::Kubernetes => settings
            .kube_role
            .clone()
            .map(|role| VaultCredentials::Kubernetes { role })
            .ok_or_else(|| {
                Error::Configuration(
                    "kubernetes auth is configured but no kube_role is stored".to_string(),
                )
            }),
    }
}
