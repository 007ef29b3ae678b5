//! AES-256-GCM secret cipher.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine as _, engine::general_purpose};
use dockhand_core::ports::SecretCipher;
use dockhand_core::{Error, Result};

/// Cipher for values and credentials at rest. Output is
/// base64(nonce || ciphertext).
pub struct AesGcmCipher {
    cipher: Aes256Gcm,
}

impl AesGcmCipher {
    /// Create a cipher from a 32-byte key.
    pub fn new(key: &[u8; 32]) -> Self {
        let cipher = Aes256Gcm::new_from_slice(key).expect("valid key length");
        Self { cipher }
    }

    /// Create from a master key string (hashed to 32 bytes).
    pub fn from_master_key(master_key: &str) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(master_key.as_bytes());
        let key: [u8; 32] = hasher.finalize().into();
        Self::new(&key)
    }
}

impl SecretCipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        let nonce_bytes: [u8; 12] = rand::random();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| Error::Crypto(format!("encryption failed: {e}")))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend_from_slice(&ciphertext);
        Ok(general_purpose::STANDARD.encode(combined))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let combined = general_purpose::STANDARD
            .decode(ciphertext)
            .map_err(|e| Error::Crypto(format!("ciphertext is not valid base64: {e}")))?;
        if combined.len() < 12 {
            return Err(Error::Crypto("ciphertext too short".to_string()));
        }
        let (nonce_bytes, payload) = combined.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, payload)
            .map_err(|e| Error::Crypto(format!("decryption failed: {e}")))?;

        String::from_utf8(plaintext)
            .map_err(|e| Error::Crypto(format!("decrypted value is not valid UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let cipher = AesGcmCipher::from_master_key("test-master-key");
        let encrypted = cipher.encrypt("hunter2").unwrap();
        assert_ne!(encrypted, "hunter2");
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), "hunter2");
    }

    #[test]
    fn test_nonces_differ_between_calls() {
        let cipher = AesGcmCipher::from_master_key("test-master-key");
        let a = cipher.encrypt("same").unwrap();
        let b = cipher.encrypt("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails_loudly() {
        let encrypted = AesGcmCipher::from_master_key("key-one")
            .encrypt("secret")
            .unwrap();
        let err = AesGcmCipher::from_master_key("key-two")
            .decrypt(&encrypted)
            .unwrap_err();
        assert!(err.to_string().contains("decryption failed"));
    }

    #[test]
    fn test_garbage_input_rejected() {
        let cipher = AesGcmCipher::from_master_key("test-master-key");
        assert!(cipher.decrypt("not base64 at all!").is_err());
        assert!(cipher.decrypt("AAAA").is_err());
    }
}
