//! Error types for the Dockhand secrets pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Manifest errors
    #[error("Invalid secrets manifest: {0}")]
    Manifest(String),

    // Configuration errors
    #[error("Vault configuration error: {0}")]
    Configuration(String),

    // Vault errors
    #[error("Vault authentication failed: {0}")]
    Auth(String),

    #[error("Secret \"{key}\" not found at path \"{path}\"")]
    SecretNotFound { key: String, path: String },

    #[error("Vault request failed: {0}")]
    Transport(String),

    // Store errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    // Deploy errors
    #[error("Redeploy failed: {0}")]
    Deploy(String),

    // Infrastructure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
