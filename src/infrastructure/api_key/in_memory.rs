//! In-memory API key repository implementation

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::api_key::{ApiKey, ApiKeyId, ApiKeyRepository};
use crate::domain::DomainError;

#[derive(Debug, Default)]
struct Store {
    keys: HashMap<ApiKeyId, ApiKey>,
    prefix_index: HashMap<String, ApiKeyId>,
}

/// In-memory implementation of ApiKeyRepository
#[derive(Debug, Default)]
pub struct InMemoryApiKeyRepository {
    store: RwLock<Store>,
}

impl InMemoryApiKeyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn find_enabled_by_prefix(&self, prefix: &str) -> Result<Option<ApiKey>, DomainError> {
        let store = self.store.read().await;

        Ok(store
            .prefix_index
            .get(prefix)
            .and_then(|id| store.keys.get(id))
            .filter(|key| key.is_enabled())
            .cloned())
    }

    async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError> {
        let mut store = self.store.write().await;

        if store.prefix_index.contains_key(api_key.prefix()) {
            return Err(DomainError::conflict(format!(
                "API key with prefix '{}' already exists",
                api_key.prefix()
            )));
        }

        if store.keys.contains_key(api_key.id()) {
            return Err(DomainError::conflict(format!(
                "API key with ID '{}' already exists",
                api_key.id()
            )));
        }

        store
            .prefix_index
            .insert(api_key.prefix().to_string(), *api_key.id());
        store.keys.insert(*api_key.id(), api_key.clone());

        Ok(api_key)
    }

    async fn update_last_used(
        &self,
        id: &ApiKeyId,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut store = self.store.write().await;

        let key = store
            .keys
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found(format!("API key '{}' not found", id)))?;
        key.record_usage(at);

        Ok(())
    }

    async fn list(&self) -> Result<Vec<ApiKey>, DomainError> {
        let store = self.store.read().await;

        let mut keys: Vec<ApiKey> = store.keys.values().cloned().collect();
        keys.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

        Ok(keys)
    }

    async fn disable(&self, id: &ApiKeyId) -> Result<(), DomainError> {
        let mut store = self.store.write().await;

        let key = store
            .keys
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found(format!("API key '{}' not found", id)))?;
        key.disable();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_find_by_prefix() {
        let repo = InMemoryApiKeyRepository::new();
        let key = ApiKey::new("abcd1234", "hash", "agent");

        repo.create(key.clone()).await.unwrap();

        let found = repo.find_enabled_by_prefix("abcd1234").await.unwrap();
        assert_eq!(found.map(|k| *k.id()), Some(*key.id()));
        assert!(repo.find_enabled_by_prefix("zzzz9999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_prefix_conflicts() {
        let repo = InMemoryApiKeyRepository::new();
        repo.create(ApiKey::new("abcd1234", "hash-a", "first"))
            .await
            .unwrap();

        let result = repo.create(ApiKey::new("abcd1234", "hash-b", "second")).await;

        assert!(matches!(result, Err(DomainError::Conflict { .. })));
        let found = repo.find_enabled_by_prefix("abcd1234").await.unwrap().unwrap();
        assert_eq!(found.description(), "first");
    }

    #[tokio::test]
    async fn test_disabled_key_is_hidden() {
        let repo = InMemoryApiKeyRepository::new();
        let key = repo
            .create(ApiKey::new("abcd1234", "hash", "agent"))
            .await
            .unwrap();

        repo.disable(key.id()).await.unwrap();

        assert!(repo.find_enabled_by_prefix("abcd1234").await.unwrap().is_none());
        let listed = repo.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].is_enabled());
    }

    #[tokio::test]
    async fn test_disable_unknown_is_not_found() {
        let repo = InMemoryApiKeyRepository::new();
        let result = repo.disable(&ApiKeyId::new()).await;

        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_update_last_used() {
        let repo = InMemoryApiKeyRepository::new();
        let key = repo
            .create(ApiKey::new("abcd1234", "hash", "agent"))
            .await
            .unwrap();
        let at = Utc::now();

        repo.update_last_used(key.id(), at).await.unwrap();

        let found = repo.find_enabled_by_prefix("abcd1234").await.unwrap().unwrap();
        assert_eq!(found.last_used_at(), Some(at));
    }
}
