//! Sync outcome and stored-variable types.

use crate::ids::EnvironmentId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of one stack's secret sync pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: bool,
    /// Number of secrets written to the store.
    pub synced: usize,
    /// True iff the stack carries no secrets manifest at all.
    pub skipped: bool,
    pub errors: Vec<String>,
    pub secrets_changed: bool,
    /// Changed secrets whose resolved redeploy flag is set.
    pub trigger_redeploy_secrets: Vec<String>,
}

impl SyncResult {
    /// The benign "no secrets managed for this stack" outcome.
    pub fn skip() -> Self {
        Self {
            success: true,
            skipped: true,
            ..Self::default()
        }
    }

    /// A terminal failure before anything was written.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            errors: vec![message.into()],
            ..Self::default()
        }
    }

    /// A stack redeploys iff at least one changed secret carries the
    /// redeploy flag. Unchanged secrets never trigger, even when flagged.
    pub fn should_redeploy(&self) -> bool {
        !self.trigger_redeploy_secrets.is_empty()
    }
}

/// One environment variable attached to a stack. The value is plaintext
/// here; stores encrypt flagged values at rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretEnvVar {
    pub name: String,
    pub value: String,
    pub is_secret: bool,
}

/// A Git-backed stack known to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitStack {
    pub name: String,
    /// Local working directory of the stack's checkout, when resolvable.
    pub directory: Option<PathBuf>,
    pub environment_id: Option<EnvironmentId>,
}
