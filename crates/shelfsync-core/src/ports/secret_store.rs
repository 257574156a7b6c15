//! Secret store port (driven/secondary port)
//!
//! Encrypts/decrypts API tokens at rest using authenticated symmetric
//! encryption with a process-local key. Implemented by `shelfsync-secrets`.

use secrecy::Secret;

#[async_trait::async_trait]
pub trait ISecretStore: Send + Sync {
    /// Encrypts `plaintext` and returns an opaque ciphertext blob suitable
    /// for storage alongside a `Profile` record.
    async fn encrypt(&self, plaintext: &Secret<String>) -> anyhow::Result<Vec<u8>>;

    /// Decrypts a ciphertext blob previously produced by [`encrypt`]. Must
    /// fail (not panic) on a tampered AEAD tag.
    ///
    /// [`encrypt`]: ISecretStore::encrypt
    async fn decrypt(&self, ciphertext: &[u8]) -> anyhow::Result<Secret<String>>;
}
