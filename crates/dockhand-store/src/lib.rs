//! File-backed port adapters and the secret cipher for Dockhand.

pub mod crypto;
pub mod file;

pub use crypto::AesGcmCipher;
pub use file::{FileEnvVarStore, FileStackRegistry, FileVaultSettingsStore};
