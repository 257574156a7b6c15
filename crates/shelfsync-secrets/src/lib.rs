//! ShelfSync Secrets - at-rest encryption for Audiobookshelf and Hardcover
//! API tokens.
//!
//! Implements [`ISecretStore`] using AES-256-GCM with a process-local key
//! loaded from (or generated into) a key file on disk. Unlike the OS
//! keyring used elsewhere for interactive desktop tooling, a daemon that
//! may run headless on a server cannot rely on a logged-in session keyring
//! being available, so the key lives in a file whose permissions the
//! daemon is responsible for restricting.

use std::{
    fs,
    path::{Path, PathBuf},
};

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use anyhow::Context;
use secrecy::{ExposeSecret, Secret};
use shelfsync_core::ports::secret_store::ISecretStore;
use tracing::{debug, info};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Default location for the encryption key file, relative to the daemon's
/// data directory: `<data_dir>/secret.key`.
pub fn default_key_path(data_dir: &Path) -> PathBuf {
    data_dir.join("secret.key")
}

/// AES-256-GCM backed implementation of [`ISecretStore`].
///
/// Ciphertext blobs are `nonce || tag || encrypted_bytes`, so each blob is
/// self-describing and does not depend on blob order or an external nonce
/// counter.
pub struct AeadSecretStore {
    cipher: Aes256Gcm,
}

impl AeadSecretStore {
    /// Loads the key from `key_path`, generating and persisting a new
    /// random key if the file does not yet exist.
    pub fn load_or_generate(key_path: &Path) -> anyhow::Result<Self> {
        let key_bytes = if key_path.exists() {
            debug!(path = %key_path.display(), "loading existing secret key");
            let raw = fs::read(key_path)
                .with_context(|| format!("failed to read secret key at {}", key_path.display()))?;
            if raw.len() != KEY_LEN {
                anyhow::bail!(
                    "secret key at {} has unexpected length {} (expected {KEY_LEN})",
                    key_path.display(),
                    raw.len()
                );
            }
            raw
        } else {
            info!(path = %key_path.display(), "generating new secret key");
            if let Some(parent) = key_path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create directory {}", parent.display()))?;
            }
            let key = Aes256Gcm::generate_key(&mut OsRng);
            let bytes = key.to_vec();
            fs::write(key_path, &bytes)
                .with_context(|| format!("failed to write secret key to {}", key_path.display()))?;
            restrict_permissions(key_path)?;
            bytes
        };

        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Builds a store directly from raw key bytes, primarily for tests.
    pub fn from_key_bytes(key_bytes: &[u8; KEY_LEN]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o600);
    fs::set_permissions(path, perms)
        .with_context(|| format!("failed to restrict permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

#[async_trait::async_trait]
impl ISecretStore for AeadSecretStore {
    async fn encrypt(&self, plaintext: &Secret<String>) -> anyhow::Result<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.expose_secret().as_bytes())
            .map_err(|_| anyhow::anyhow!("token encryption failed"))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(nonce.as_slice());
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> anyhow::Result<Secret<String>> {
        if ciphertext.len() < NONCE_LEN {
            anyhow::bail!("ciphertext too short to contain a nonce");
        }
        let (nonce_bytes, encrypted) = ciphertext.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, encrypted)
            .map_err(|_| anyhow::anyhow!("token decryption failed: invalid key or tampered ciphertext"))?;

        let text = String::from_utf8(plaintext).context("decrypted token is not valid UTF-8")?;
        Ok(Secret::new(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> AeadSecretStore {
        AeadSecretStore::from_key_bytes(&[7u8; KEY_LEN])
    }

    #[tokio::test]
    async fn round_trips_a_token() {
        let store = test_store();
        let token = Secret::new("hc_token_abc123".to_string());
        let blob = store.encrypt(&token).await.unwrap();
        let recovered = store.decrypt(&blob).await.unwrap();
        assert_eq!(recovered.expose_secret(), token.expose_secret());
    }

    #[tokio::test]
    async fn distinct_encryptions_use_distinct_nonces() {
        let store = test_store();
        let token = Secret::new("same-token".to_string());
        let blob_a = store.encrypt(&token).await.unwrap();
        let blob_b = store.encrypt(&token).await.unwrap();
        assert_ne!(blob_a, blob_b);
    }

    #[tokio::test]
    async fn tampered_ciphertext_fails_to_decrypt() {
        let store = test_store();
        let token = Secret::new("abs_token_xyz".to_string());
        let mut blob = store.encrypt(&token).await.unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0xFF;
        assert!(store.decrypt(&blob).await.is_err());
    }

    #[tokio::test]
    async fn truncated_ciphertext_fails_to_decrypt() {
        let store = test_store();
        assert!(store.decrypt(&[0u8; 4]).await.is_err());
    }

    #[tokio::test]
    async fn wrong_key_fails_to_decrypt() {
        let store_a = AeadSecretStore::from_key_bytes(&[1u8; KEY_LEN]);
        let store_b = AeadSecretStore::from_key_bytes(&[2u8; KEY_LEN]);
        let token = Secret::new("cross-key-test".to_string());
        let blob = store_a.encrypt(&token).await.unwrap();
        assert!(store_b.decrypt(&blob).await.is_err());
    }

    #[test]
    fn load_or_generate_creates_and_reuses_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = default_key_path(dir.path());
        assert!(!key_path.exists());

        let store_a = AeadSecretStore::load_or_generate(&key_path).unwrap();
        assert!(key_path.exists());

        let store_b = AeadSecretStore::load_or_generate(&key_path).unwrap();

        let token = Secret::new("persisted-key-check".to_string());
        let blob = futures_block_on_encrypt(&store_a, &token);
        let recovered = futures_block_on_decrypt(&store_b, &blob);
        assert_eq!(recovered.expose_secret(), token.expose_secret());
    }

    #[test]
    fn load_or_generate_rejects_wrong_length_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = default_key_path(dir.path());
        fs::write(&key_path, b"too-short").unwrap();
        assert!(AeadSecretStore::load_or_generate(&key_path).is_err());
    }

    fn futures_block_on_encrypt(store: &AeadSecretStore, plaintext: &Secret<String>) -> Vec<u8> {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(store.encrypt(plaintext))
            .unwrap()
    }

    fn futures_block_on_decrypt(store: &AeadSecretStore, ciphertext: &[u8]) -> Secret<String> {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(store.decrypt(ciphertext))
            .unwrap()
    }
}
