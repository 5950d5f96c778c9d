//! Persistence for encrypted user API keys.
//!
//! Stores only ever see the `iv:authTag:ciphertext` encoding produced by the
//! secret codec; plaintext keys never reach this layer.

mod memory;
mod postgres;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Encrypted API key storage keyed by user id.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Backend name reported by the health endpoint.
    fn kind(&self) -> &'static str;

    /// Fetch the encrypted key for `user_id`, if one is stored.
    async fn get(&self, user_id: &str) -> Result<Option<String>, StoreError>;

    /// Replace the encrypted key for `user_id`.
    async fn put(&self, user_id: &str, encrypted: &str) -> Result<(), StoreError>;

    /// Remove the key for `user_id`. Returns `false` if none was stored.
    async fn delete(&self, user_id: &str) -> Result<bool, StoreError>;
}
