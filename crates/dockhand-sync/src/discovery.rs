//! Manifest discovery.

use dockhand_core::manifest::MANIFEST_FILE_NAMES;
use std::path::{Path, PathBuf};

/// Probe a stack directory for its secrets manifest.
///
/// The first existing candidate wins. No candidate at all means the stack
/// does not manage secrets, which is not an error.
pub async fn find_manifest(stack_dir: &Path) -> Option<PathBuf> {
    for name in MANIFEST_FILE_NAMES {
        let candidate = stack_dir.join(name);
        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_manifest_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_manifest(dir.path()).await.is_none());
    }

    #[tokio::test]
    async fn test_hidden_yaml_wins_over_plain() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("secrets.yaml"), "secrets: []\n")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join(".secrets.yaml"), "secrets: []\n")
            .await
            .unwrap();
        let found = find_manifest(dir.path()).await.unwrap();
        assert_eq!(found.file_name().unwrap(), ".secrets.yaml");
    }

    #[tokio::test]
    async fn test_yml_extension_is_probed() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("secrets.yml"), "secrets: []\n")
            .await
            .unwrap();
        let found = find_manifest(dir.path()).await.unwrap();
        assert_eq!(found.file_name().unwrap(), "secrets.yml");
    }
}
