//! PostgreSQL API key repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::api_key::{ApiKey, ApiKeyId, ApiKeyRepository};
use crate::domain::DomainError;
use crate::infrastructure::storage::{is_unique_violation, storage_error};

/// PostgreSQL implementation of ApiKeyRepository
#[derive(Debug, Clone)]
pub struct PostgresApiKeyRepository {
    pool: PgPool,
}

impl PostgresApiKeyRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApiKeyRepository for PostgresApiKeyRepository {
    async fn find_enabled_by_prefix(&self, prefix: &str) -> Result<Option<ApiKey>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, key_hash, prefix, description, product_id, is_enabled,
                   created_at, last_used_at
            FROM api_keys
            WHERE prefix = $1 AND is_enabled = TRUE
            "#,
        )
        .bind(prefix)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to get API key by prefix", e))?;

        match row {
            Some(row) => Ok(Some(row_to_api_key(&row)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO api_keys (id, key_hash, prefix, description, product_id, is_enabled,
                                  created_at, last_used_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(api_key.id().as_uuid())
        .bind(api_key.key_hash())
        .bind(api_key.prefix())
        .bind(api_key.description())
        .bind(api_key.product_id())
        .bind(api_key.is_enabled())
        .bind(api_key.created_at())
        .bind(api_key.last_used_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::conflict(format!(
                    "API key with prefix '{}' already exists",
                    api_key.prefix()
                ))
            } else {
                storage_error("Failed to create API key", e)
            }
        })?;

        Ok(api_key)
    }

    async fn update_last_used(
        &self,
        id: &ApiKeyId,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        sqlx::query("UPDATE api_keys SET last_used_at = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to update API key last used", e))?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<ApiKey>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, key_hash, prefix, description, product_id, is_enabled,
                   created_at, last_used_at
            FROM api_keys
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to list API keys", e))?;

        rows.iter().map(row_to_api_key).collect()
    }

    async fn disable(&self, id: &ApiKeyId) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE api_keys SET is_enabled = FALSE WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to disable API key", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("API key '{}' not found", id)));
        }

        Ok(())
    }
}

fn row_to_api_key(row: &PgRow) -> Result<ApiKey, DomainError> {
    let decode = |e: sqlx::Error| DomainError::storage(format!("Failed to decode API key row: {}", e));
    let id: Uuid = row.try_get("id").map_err(decode)?;

    Ok(ApiKey::from_parts(
        ApiKeyId::from_uuid(id),
        row.try_get("key_hash").map_err(decode)?,
        row.try_get("prefix").map_err(decode)?,
        row.try_get("description").map_err(decode)?,
        row.try_get("product_id").map_err(decode)?,
        row.try_get("is_enabled").map_err(decode)?,
        row.try_get("created_at").map_err(decode)?,
        row.try_get("last_used_at").map_err(decode)?,
    ))
}
