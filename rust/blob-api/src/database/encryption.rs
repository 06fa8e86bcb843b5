//! Provider API key encryption using AES-256-GCM.
//!
//! Ciphertext is stored base64-encoded with the random 12-byte nonce
//! prepended.

use std::path::Path;

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;

const KEY_SIZE: usize = 32;

const NONCE_SIZE: usize = 12;

/// Encrypts and decrypts stored provider keys.
pub struct KeyManager {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("cipher", &"<redacted>")
            .finish()
    }
}

impl KeyManager {
    /// Load the key file at `key_path`, generating it on first use.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or written, or holds a key of the
    /// wrong size.
    pub fn new(key_path: &Path) -> Result<Self> {
        let key = load_or_generate_key(key_path)?;
        Ok(Self::from_key(key))
    }

    pub fn from_key(key: [u8; KEY_SIZE]) -> Self {
        Self {
            cipher: Aes256Gcm::new(&key.into()),
        }
    }

    /// Manager with a random key that is never persisted.
    pub fn ephemeral() -> Self {
        let mut key = [0u8; KEY_SIZE];
        rand::rng().fill_bytes(&mut key);
        Self::from_key(key)
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| anyhow::anyhow!("Encryption failed: {e}"))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend_from_slice(&ciphertext);
        Ok(general_purpose::STANDARD.encode(combined))
    }

    pub fn decrypt(&self, encrypted: &str) -> Result<String> {
        let combined = general_purpose::STANDARD
            .decode(encrypted)
            .context("Invalid base64")?;
        if combined.len() < NONCE_SIZE {
            anyhow::bail!("Invalid encrypted data: too short");
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| anyhow::anyhow!("Decryption failed: {e}"))?;

        String::from_utf8(plaintext).context("Invalid UTF-8 in decrypted data")
    }
}

fn load_or_generate_key(path: &Path) -> Result<[u8; KEY_SIZE]> {
    if path.exists() {
        let encoded =
            std::fs::read_to_string(path).context("Failed to read encryption key file")?;
        let bytes = general_purpose::STANDARD
            .decode(encoded.trim())
            .context("Invalid base64 in key file")?;
        let key: [u8; KEY_SIZE] = bytes.as_slice().try_into().map_err(|_| {
            anyhow::anyhow!("Invalid key size: expected {KEY_SIZE}, got {}", bytes.len())
        })?;
        return Ok(key);
    }

    let mut key = [0u8; KEY_SIZE];
    rand::rng().fill_bytes(&mut key);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create key directory")?;
    }
    std::fs::write(path, general_purpose::STANDARD.encode(key))
        .context("Failed to write encryption key file")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .context("Failed to set key file permissions")?;
    }

    tracing::info!(path = %path.display(), "Generated new encryption key");
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_key_file_is_reused() {
        let dir = tempdir().expect("Failed to create temp dir");
        let key_path = dir.path().join("keys").join("encryption.key");

        let encrypted = KeyManager::new(&key_path)
            .expect("first manager")
            .encrypt("AIzaSy-test-key")
            .expect("encrypt");

        let reopened = KeyManager::new(&key_path).expect("second manager");
        assert_eq!(reopened.decrypt(&encrypted).expect("decrypt"), "AIzaSy-test-key");
    }

    #[test]
    fn test_nonce_differs_per_call() {
        let km = KeyManager::ephemeral();
        let a = km.encrypt("same").expect("encrypt");
        let b = km.encrypt("same").expect("encrypt");
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let encrypted = KeyManager::ephemeral().encrypt("secret").expect("encrypt");
        assert!(KeyManager::ephemeral().decrypt(&encrypted).is_err());
        assert!(KeyManager::ephemeral().decrypt("AAA").is_err());
    }

    #[test]
    fn test_bad_key_file_rejected() {
        let dir = tempdir().expect("Failed to create temp dir");
        let key_path = dir.path().join("short.key");
        std::fs::write(&key_path, general_purpose::STANDARD.encode([1u8; 8])).expect("write");

        let err = KeyManager::new(&key_path).expect_err("short key");
        assert!(err.to_string().contains("Invalid key size"));
    }
}
