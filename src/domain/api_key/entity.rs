//! API key entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainError;

/// Opaque API key identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKeyId(Uuid);

impl ApiKeyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ApiKeyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ApiKeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ApiKeyId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| DomainError::validation(format!("Invalid API key id '{}'", s)))
    }
}

/// A stored API key. Only the hash of the full secret is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKey {
    id: ApiKeyId,
    key_hash: String,
    prefix: String,
    description: String,
    product_id: Option<Uuid>,
    is_enabled: bool,
    created_at: DateTime<Utc>,
    last_used_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    pub fn new(
        prefix: impl Into<String>,
        key_hash: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: ApiKeyId::new(),
            key_hash: key_hash.into(),
            prefix: prefix.into(),
            description: description.into(),
            product_id: None,
            is_enabled: true,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    /// Rebuild a key from persisted columns
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: ApiKeyId,
        key_hash: String,
        prefix: String,
        description: String,
        product_id: Option<Uuid>,
        is_enabled: bool,
        created_at: DateTime<Utc>,
        last_used_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            key_hash,
            prefix,
            description,
            product_id,
            is_enabled,
            created_at,
            last_used_at,
        }
    }

    pub fn with_product_id(mut self, product_id: Option<Uuid>) -> Self {
        self.product_id = product_id;
        self
    }

    pub fn id(&self) -> &ApiKeyId {
        &self.id
    }

    pub fn key_hash(&self) -> &str {
        &self.key_hash
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn product_id(&self) -> Option<Uuid> {
        self.product_id
    }

    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_used_at(&self) -> Option<DateTime<Utc>> {
        self.last_used_at
    }

    pub fn disable(&mut self) {
        self.is_enabled = false;
    }

    pub fn record_usage(&mut self, at: DateTime<Utc>) {
        self.last_used_at = Some(at);
    }
}

/// Identity attached to a request after successful authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedKey {
    pub id: ApiKeyId,
    pub prefix: String,
    pub product_id: Option<Uuid>,
}

impl From<&ApiKey> for AuthenticatedKey {
    fn from(key: &ApiKey) -> Self {
        Self {
            id: key.id,
            prefix: key.prefix.clone(),
            product_id: key.product_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_key_is_enabled_and_unused() {
        let key = ApiKey::new("abcd1234", "hash", "billing agent");

        assert!(key.is_enabled());
        assert!(key.last_used_at().is_none());
        assert_eq!(key.prefix(), "abcd1234");
        assert_eq!(key.description(), "billing agent");
    }

    #[test]
    fn test_disable() {
        let mut key = ApiKey::new("abcd1234", "hash", "agent");
        key.disable();

        assert!(!key.is_enabled());
    }

    #[test]
    fn test_authenticated_key_from_api_key() {
        let product = Uuid::new_v4();
        let key = ApiKey::new("abcd1234", "hash", "agent").with_product_id(Some(product));

        let identity = AuthenticatedKey::from(&key);

        assert_eq!(identity.id, *key.id());
        assert_eq!(identity.prefix, "abcd1234");
        assert_eq!(identity.product_id, Some(product));
    }
}
