//! Vault HTTP client and authenticated session.

use crate::kv::flatten_secret_data;
use dockhand_core::vault::{EffectiveVaultConfig, VaultCredentials, kv2_path};
use dockhand_core::{Error, Result};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Well-known location of the in-cluster service account token.
const SERVICE_ACCOUNT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Reply shape shared by the Vault login endpoints.
#[derive(Debug, Deserialize)]
struct AuthReply {
    #[serde(default)]
    auth: Option<AuthInfo>,
}

#[derive(Debug, Deserialize)]
struct AuthInfo {
    #[serde(default)]
    client_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VaultErrorBody {
    errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct HealthReply {
    #[serde(default)]
    version: Option<String>,
}

/// Result of the unauthenticated reachability probe. Always returned,
/// never an error.
#[derive(Debug, Clone)]
pub struct ConnectionReport {
    pub success: bool,
    pub version: Option<String>,
    pub error: Option<String>,
}

/// An unauthenticated handle to one Vault server. Turning it into
/// something that can read secrets goes through one of the
/// `authenticate_*` exchanges.
pub struct VaultClient {
    http: Client,
    address: String,
    namespace: Option<String>,
}

impl VaultClient {
    pub fn new(config: &EffectiveVaultConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .danger_accept_invalid_certs(config.skip_tls_verify)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            address: config.address.trim_end_matches('/').to_string(),
            namespace: config.namespace.clone(),
        })
    }

    /// Authenticate with whichever method the effective configuration
    /// carries.
    pub async fn authenticate(&self, credentials: &VaultCredentials) -> Result<VaultSession> {
        match credentials {
            VaultCredentials::Token { token } => self.authenticate_token(token).await,
            VaultCredentials::AppRole { role_id, secret_id } => {
                self.authenticate_approle(role_id, secret_id).await
            }
            VaultCredentials::Kubernetes { role } => self.authenticate_kubernetes(role).await,
        }
    }

    /// Adopt a pre-issued token, validating it with a self-lookup before
    /// anything is fetched with it.
    pub async fn authenticate_token(&self, token: &str) -> Result<VaultSession> {
        let response = self
            .request(Method::GET, "auth/token/lookup-self", Some(token))
            .send()
            .await
            .map_err(|e| Error::Auth(format!("token lookup failed: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::Auth(format!(
                "token lookup failed: {}",
                error_detail(response).await
            )));
        }
        debug!(address = %self.address, "token authentication succeeded");
        Ok(self.session(token.to_string()))
    }

    /// Exchange an approle `(role_id, secret_id)` pair for a session token.
    pub async fn authenticate_approle(
        &self,
        role_id: &str,
        secret_id: &str,
    ) -> Result<VaultSession> {
        let response = self
            .request(Method::POST, "auth/approle/login", None)
            .json(&json!({ "role_id": role_id, "secret_id": secret_id }))
            .send()
            .await
            .map_err(|e| Error::Auth(format!("approle login failed: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::Auth(format!(
                "approle login failed: {}",
                error_detail(response).await
            )));
        }
        let reply: AuthReply = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("approle login reply unreadable: {e}")))?;
        let token = issued_token(reply)
            .ok_or_else(|| Error::Auth("approle login returned no client token".to_string()))?;
        debug!(address = %self.address, "approle authentication succeeded");
        Ok(self.session(token))
    }

    /// Authenticate with the pod's service account token. Outside a
    /// cluster the token file is unreadable, which surfaces as an auth
    /// failure rather than a panic.
    pub async fn authenticate_kubernetes(&self, role: &str) -> Result<VaultSession> {
        let jwt = read_service_account_token(Path::new(SERVICE_ACCOUNT_TOKEN_PATH)).await?;
        self.kubernetes_login(role, &jwt).await
    }

    /// Exchange a service account JWT for a session token.
    pub async fn kubernetes_login(&self, role: &str, jwt: &str) -> Result<VaultSession> {
        let response = self
            .request(Method::POST, "auth/kubernetes/login", None)
            .json(&json!({ "role": role, "jwt": jwt }))
            .send()
            .await
            .map_err(|e| Error::Auth(format!("kubernetes login failed: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::Auth(format!(
                "kubernetes login failed: {}",
                error_detail(response).await
            )));
        }
        let reply: AuthReply = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("kubernetes login reply unreadable: {e}")))?;
        let token = issued_token(reply)
            .ok_or_else(|| Error::Auth("kubernetes login returned no client token".to_string()))?;
        debug!(address = %self.address, "kubernetes authentication succeeded");
        Ok(self.session(token))
    }

    /// Unauthenticated reachability probe. Never fails; the report carries
    /// either the server version or the error detail.
    pub async fn test_connection(&self) -> ConnectionReport {
        match self.request(Method::GET, "sys/health", None).send().await {
            Ok(response) if response.status().is_success() => {
                let version = response
                    .json::<HealthReply>()
                    .await
                    .ok()
                    .and_then(|health| health.version);
                ConnectionReport {
                    success: true,
                    version,
                    error: None,
                }
            }
            Ok(response) => ConnectionReport {
                success: false,
                version: None,
                error: Some(error_detail(response).await),
            },
            Err(e) => ConnectionReport {
                success: false,
                version: None,
                error: Some(e.to_string()),
            },
        }
    }

    fn request(&self, method: Method, api_path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}/v1/{}", self.address, api_path);
        let mut req = self.http.request(method, &url);
        if let Some(namespace) = &self.namespace {
            req = req.header("X-Vault-Namespace", namespace);
        }
        if let Some(token) = token {
            req = req.header("X-Vault-Token", token);
        }
        req
    }

    fn session(&self, token: String) -> VaultSession {
        VaultSession {
            http: self.http.clone(),
            address: self.address.clone(),
            namespace: self.namespace.clone(),
            token,
        }
    }
}

impl std::fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClient")
            .field("address", &self.address)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// An authenticated Vault session. Immutable; constructed only by a
/// successful authentication exchange and dropped at the end of the pass.
pub struct VaultSession {
    http: Client,
    address: String,
    namespace: Option<String>,
    token: String,
}

impl VaultSession {
    /// Read every field of the secret at `path` as strings. The path is
    /// KV v2 normalized before the request.
    pub async fn read_secret(&self, path: &str) -> Result<HashMap<String, String>> {
        let path = kv2_path(path);
        let response = self
            .request(Method::GET, &path)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("read of \"{path}\" failed: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::Transport(format!(
                "read of \"{path}\" failed: {}",
                error_detail(response).await
            )));
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("read of \"{path}\" returned invalid JSON: {e}")))?;
        Ok(flatten_secret_data(&body))
    }

    /// Fetch the requested keys from one secret. Keys absent from the
    /// secret are logged and omitted; callers decide whether an omission
    /// is an error.
    pub async fn get_secrets(&self, path: &str, keys: &[String]) -> Result<Vec<(String, String)>> {
        let data = self.read_secret(path).await?;
        let mut found = Vec::with_capacity(keys.len());
        for key in keys {
            match data.get(key) {
                Some(value) => found.push((key.clone(), value.clone())),
                None => warn!(key = %key, path = %path, "secret key not present at path"),
            }
        }
        Ok(found)
    }

    fn request(&self, method: Method, api_path: &str) -> RequestBuilder {
        let url = format!("{}/v1/{}", self.address, api_path);
        let mut req = self
            .http
            .request(method, &url)
            .header("X-Vault-Token", &self.token);
        if let Some(namespace) = &self.namespace {
            req = req.header("X-Vault-Namespace", namespace);
        }
        req
    }
}

impl std::fmt::Debug for VaultSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSession")
            .field("address", &self.address)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

fn issued_token(reply: AuthReply) -> Option<String> {
    reply.auth.and_then(|auth| auth.client_token)
}

/// Upstream error bodies arrive as `{"errors": [...]}` or raw text; either
/// way the detail is reported together with the HTTP status.
async fn error_detail(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<VaultErrorBody>(&body)
        .map(|parsed| parsed.errors.join("; "))
        .unwrap_or(body);
    if detail.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {detail}")
    }
}

async fn read_service_account_token(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map(|token| token.trim().to_string())
        .map_err(|e| {
            Error::Auth(format!(
                "service account token unreadable at {}: {e}",
                path.display()
            ))
        })
}
