use super::{CredentialStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;

/// Process-local store, used when no database is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    keys: DashMap<String, String>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self.keys.get(user_id).map(|entry| entry.value().clone()))
    }

    async fn put(&self, user_id: &str, encrypted: &str) -> Result<(), StoreError> {
        self.keys.insert(user_id.to_string(), encrypted.to_string());
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<bool, StoreError> {
        Ok(self.keys.remove(user_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_overwrites_and_delete_removes() -> Result<(), StoreError> {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.get("u1").await?, None);

        store.put("u1", "aa:bb:cc").await?;
        store.put("u1", "dd:ee:ff").await?;
        assert_eq!(store.get("u1").await?.as_deref(), Some("dd:ee:ff"));
        assert_eq!(store.get("u2").await?, None);

        assert!(store.delete("u1").await?);
        assert!(!store.delete("u1").await?);
        assert_eq!(store.get("u1").await?, None);
        Ok(())
    }
}
