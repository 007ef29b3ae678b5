//! Port traits (hexagonal architecture).
//!
//! These traits define the interfaces between the sync pipeline and its
//! external collaborators: the dashboard datastore, the encryption
//! primitive, and the deploy action.

use crate::Result;
use crate::ids::EnvironmentId;
use crate::sync::{GitStack, SecretEnvVar};
use crate::vault::VaultSettings;
use async_trait::async_trait;

/// Persisted global Vault settings. Exactly one record.
#[async_trait]
pub trait VaultSettingsStore: Send + Sync {
    async fn get(&self) -> Result<Option<VaultSettings>>;

    async fn save(&self, settings: &VaultSettings) -> Result<()>;

    async fn delete(&self) -> Result<()>;
}

/// Registry of stacks managed by the dashboard.
#[async_trait]
pub trait StackRegistry: Send + Sync {
    /// All Git-backed stacks, for fleet-wide sync.
    async fn list_git_stacks(&self) -> Result<Vec<GitStack>>;

    /// Environment the stack's source deploys into, when known.
    async fn environment_for_stack(&self, stack_name: &str) -> Result<Option<EnvironmentId>>;
}

/// Store for per-stack environment variables, scoped by
/// `(stack, environment)`. Implementations encrypt flagged values at rest.
#[async_trait]
pub trait EnvVarStore: Send + Sync {
    /// Current plaintext values in scope.
    async fn list(
        &self,
        stack_name: &str,
        environment_id: Option<EnvironmentId>,
    ) -> Result<Vec<SecretEnvVar>>;

    /// Upsert the given variables as one all-or-nothing batch. Variables
    /// outside the batch are left untouched.
    async fn put_batch(
        &self,
        stack_name: &str,
        environment_id: Option<EnvironmentId>,
        vars: &[SecretEnvVar],
    ) -> Result<()>;
}

/// Symmetric encryption primitive for values and credentials at rest.
pub trait SecretCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String>;

    fn decrypt(&self, ciphertext: &str) -> Result<String>;
}

/// Redeploys a stack after flagged secret changes.
#[async_trait]
pub trait DeployTrigger: Send + Sync {
    async fn redeploy(&self, stack: &GitStack) -> Result<()>;
}
