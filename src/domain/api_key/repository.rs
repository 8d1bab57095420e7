//! API key repository trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::entity::{ApiKey, ApiKeyId};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Repository trait for API key storage
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    /// Look up an enabled key by prefix. Disabled keys are indistinguishable from absent ones.
    async fn find_enabled_by_prefix(&self, prefix: &str) -> Result<Option<ApiKey>, DomainError>;

    /// Insert a new key; a duplicate prefix yields `Conflict`
    async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError>;

    /// Best-effort usage bookkeeping
    async fn update_last_used(&self, id: &ApiKeyId, at: DateTime<Utc>)
        -> Result<(), DomainError>;

    /// List all keys, newest first
    async fn list(&self) -> Result<Vec<ApiKey>, DomainError>;

    /// Mark a key unusable; an unknown id yields `NotFound`
    async fn disable(&self, id: &ApiKeyId) -> Result<(), DomainError>;
}
