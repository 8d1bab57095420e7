//! API Key service
//!
//! Provides high-level operations for API key management.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::api_key::{ApiKey, ApiKeyId, ApiKeyRepository};
use crate::domain::DomainError;

use super::generator::ApiKeyGenerator;

/// Result of creating a new API key
#[derive(Debug)]
pub struct CreateApiKeyResult {
    /// The API key entity (without the secret)
    pub api_key: ApiKey,
    /// The full key (only returned once)
    pub full_key: String,
}

/// API Key service for managing API keys
#[derive(Clone)]
pub struct ApiKeyService {
    repository: Arc<dyn ApiKeyRepository>,
    generator: ApiKeyGenerator,
}

impl std::fmt::Debug for ApiKeyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyService")
            .field("generator", &self.generator)
            .finish()
    }
}

impl ApiKeyService {
    /// Create a new API key service
    pub fn new(repository: Arc<dyn ApiKeyRepository>) -> Self {
        Self {
            repository,
            generator: ApiKeyGenerator::default(),
        }
    }

    /// Create with a custom generator
    pub fn with_generator(mut self, generator: ApiKeyGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Create a new API key. A prefix collision fails with `Conflict`.
    pub async fn create(
        &self,
        description: impl Into<String>,
        product_id: Option<Uuid>,
    ) -> Result<CreateApiKeyResult, DomainError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(DomainError::validation("description is required"));
        }

        let generated = self.generator.generate();
        let api_key = ApiKey::new(&generated.prefix, &generated.hash, description)
            .with_product_id(product_id);

        let created = self.repository.create(api_key).await?;

        info!(id = %created.id(), prefix = %created.prefix(), "API key created");

        Ok(CreateApiKeyResult {
            api_key: created,
            full_key: generated.key,
        })
    }

    /// List all API keys, newest first
    pub async fn list(&self) -> Result<Vec<ApiKey>, DomainError> {
        self.repository.list().await
    }

    /// Revoke an API key by disabling it
    pub async fn revoke(&self, id: &ApiKeyId) -> Result<(), DomainError> {
        self.repository.disable(id).await?;

        info!(id = %id, "API key revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api_key::MockApiKeyRepository;
    use crate::infrastructure::api_key::{verify_key, InMemoryApiKeyRepository};

    fn create_service() -> ApiKeyService {
        ApiKeyService::new(Arc::new(InMemoryApiKeyRepository::new()))
    }

    #[tokio::test]
    async fn test_create_api_key() {
        let service = create_service();
        let product = Uuid::new_v4();

        let result = service.create("Billing agent", Some(product)).await.unwrap();

        assert!(result.full_key.starts_with("lm_"));
        assert!(result.full_key.contains(result.api_key.prefix()));
        assert!(verify_key(&result.full_key, result.api_key.key_hash()));
        assert_eq!(result.api_key.product_id(), Some(product));
        assert!(result.api_key.is_enabled());
    }

    #[tokio::test]
    async fn test_create_requires_description() {
        let service = create_service();

        let result = service.create("  ", None).await;

        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_prefix_collision_is_conflict() {
        let mut repository = MockApiKeyRepository::new();
        repository
            .expect_create()
            .returning(|_| Err(DomainError::conflict("API key with prefix already exists")));

        let service = ApiKeyService::new(Arc::new(repository));
        let result = service.create("agent", None).await;

        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_list_and_revoke() {
        let service = create_service();
        let first = service.create("first", None).await.unwrap();
        service.create("second", None).await.unwrap();

        service.revoke(first.api_key.id()).await.unwrap();

        let keys = service.list().await.unwrap();
        assert_eq!(keys.len(), 2);
        let revoked = keys
            .iter()
            .find(|k| k.id() == first.api_key.id())
            .unwrap();
        assert!(!revoked.is_enabled());
    }

    #[tokio::test]
    async fn test_revoke_unknown_is_not_found() {
        let result = create_service().revoke(&ApiKeyId::new()).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }
}
