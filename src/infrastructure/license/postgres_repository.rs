//! PostgreSQL license repository implementation

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgRow, Postgres};
use sqlx::{QueryBuilder, Row};
use uuid::Uuid;

use crate::domain::license::{
    DashboardSummary, ExpiringLicense, License, LicenseId, LicensePage, LicenseRepository,
    LicenseStatus, ListParams,
};
use crate::domain::DomainError;
use crate::infrastructure::storage::{is_unique_violation, storage_error};

const COLUMNS: &str = "id, license_key, status, type, product_name, customer_name, \
                       customer_email, metadata, issued_at, expires_at, created_at, updated_at";

/// PostgreSQL implementation of LicenseRepository
#[derive(Debug, Clone)]
pub struct PostgresLicenseRepository {
    pool: PgPool,
}

impl PostgresLicenseRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LicenseRepository for PostgresLicenseRepository {
    async fn create(&self, license: License) -> Result<License, DomainError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO licenses (id, license_key, status, type, product_name, customer_name,
                                  customer_email, metadata, issued_at, expires_at,
                                  created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(license.id().as_uuid())
        .bind(license.license_key())
        .bind(license.status().as_str())
        .bind(license.license_type())
        .bind(license.product_name())
        .bind(license.customer_name())
        .bind(license.customer_email())
        .bind(license.metadata().cloned())
        .bind(license.issued_at())
        .bind(license.expires_at())
        .bind(license.created_at())
        .bind(license.updated_at())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::conflict("License key already exists")
            } else {
                storage_error("Failed to create license", e)
            }
        })?;

        row_to_license(&row)
    }

    async fn find_by_id(&self, id: &LicenseId) -> Result<Option<License>, DomainError> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM licenses WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to get license", e))?;

        row.as_ref().map(row_to_license).transpose()
    }

    async fn find_by_key(&self, license_key: &str) -> Result<Option<License>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM licenses WHERE license_key = $1"
        ))
        .bind(license_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to get license by key", e))?;

        row.as_ref().map(row_to_license).transpose()
    }

    async fn list(&self, params: &ListParams) -> Result<LicensePage, DomainError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM licenses WHERE TRUE");
        push_filters(&mut count, params);

        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to count licenses", e))?;

        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM licenses WHERE TRUE"));
        push_filters(&mut query, params);
        query
            .push(format_args!(
                " ORDER BY {} {}, id ASC LIMIT ",
                params.sort_by.column(),
                params.sort_order.keyword()
            ))
            .push_bind(i64::from(params.limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(params.offset).unwrap_or(i64::MAX));

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to list licenses", e))?;

        let items = rows
            .iter()
            .map(row_to_license)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LicensePage {
            items,
            total: total.max(0) as u64,
        })
    }

    async fn update_status(
        &self,
        id: &LicenseId,
        status: LicenseStatus,
    ) -> Result<(), DomainError> {
        let result =
            sqlx::query("UPDATE licenses SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id.as_uuid())
                .bind(status.as_str())
                .execute(&self.pool)
                .await
                .map_err(|e| storage_error("Failed to update license status", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("License '{}' not found", id)));
        }

        Ok(())
    }

    async fn update_metadata(&self, id: &LicenseId, metadata: &Value) -> Result<(), DomainError> {
        let result =
            sqlx::query("UPDATE licenses SET metadata = $2, updated_at = NOW() WHERE id = $1")
                .bind(id.as_uuid())
                .bind(metadata)
                .execute(&self.pool)
                .await
                .map_err(|e| storage_error("Failed to update license metadata", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("License '{}' not found", id)));
        }

        Ok(())
    }

    async fn update(&self, license: &License) -> Result<License, DomainError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE licenses
            SET type = $2, product_name = $3, customer_name = $4, customer_email = $5,
                expires_at = $6, metadata = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(license.id().as_uuid())
        .bind(license.license_type())
        .bind(license.product_name())
        .bind(license.customer_name())
        .bind(license.customer_email())
        .bind(license.expires_at())
        .bind(license.metadata().cloned())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to update license", e))?;

        match row {
            Some(row) => row_to_license(&row),
            None => Err(DomainError::not_found(format!(
                "License '{}' not found",
                license.id()
            ))),
        }
    }

    async fn dashboard_summary(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<DashboardSummary, DomainError> {
        let horizon = now + window;

        let status_counts: HashMap<LicenseStatus, u64> = self
            .grouped_counts("status")
            .await?
            .into_iter()
            .map(|(status, count)| -> Result<(LicenseStatus, u64), DomainError> {
                Ok((status.parse()?, count))
            })
            .collect::<Result<_, _>>()?;
        let type_counts = self.grouped_counts("type").await?;
        let product_counts = self.grouped_counts("product_name").await?;

        let expiring_soon: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM licenses
            WHERE status = 'active' AND expires_at BETWEEN $1 AND $2
            "#,
        )
        .bind(now)
        .bind(horizon)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to count expiring licenses", e))?;

        let next = sqlx::query(
            r#"
            SELECT license_key, expires_at, product_name FROM licenses
            WHERE status = 'active' AND expires_at BETWEEN $1 AND $2
            ORDER BY expires_at ASC
            LIMIT 1
            "#,
        )
        .bind(now)
        .bind(horizon)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to get next expiring license", e))?;

        let next_to_expire = next
            .map(|row| -> Result<ExpiringLicense, DomainError> {
                Ok(ExpiringLicense {
                    license_key: row.try_get("license_key").map_err(decode_error)?,
                    expires_at: row.try_get("expires_at").map_err(decode_error)?,
                    product_name: row.try_get("product_name").map_err(decode_error)?,
                })
            })
            .transpose()?;

        Ok(DashboardSummary {
            total: status_counts.values().sum(),
            status_counts,
            type_counts,
            product_counts,
            expiring_soon: expiring_soon.max(0) as u64,
            next_to_expire,
        })
    }
}

impl PostgresLicenseRepository {
    /// `column` is always one of a fixed set of identifiers
    async fn grouped_counts(
        &self,
        column: &'static str,
    ) -> Result<HashMap<String, u64>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {column} AS label, COUNT(*) AS count FROM licenses GROUP BY {column}"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to aggregate licenses", e))?;

        rows.iter()
            .map(|row| -> Result<(String, u64), DomainError> {
                let label: String = row.try_get("label").map_err(decode_error)?;
                let count: i64 = row.try_get("count").map_err(decode_error)?;
                Ok((label, count.max(0) as u64))
            })
            .collect()
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, params: &ListParams) {
    if let Some(status) = params.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }

    if let Some(email) = &params.customer_email {
        builder.push(" AND customer_email = ").push_bind(email.clone());
    }

    if let Some(product) = &params.product_name {
        builder.push(" AND product_name = ").push_bind(product.clone());
    }

    if let Some(license_type) = &params.license_type {
        builder.push(" AND type = ").push_bind(license_type.clone());
    }
}

fn decode_error(e: sqlx::Error) -> DomainError {
    DomainError::storage(format!("Failed to decode license row: {}", e))
}

fn row_to_license(row: &PgRow) -> Result<License, DomainError> {
    let id: Uuid = row.try_get("id").map_err(decode_error)?;
    let status: String = row.try_get("status").map_err(decode_error)?;
    let status = status
        .parse::<LicenseStatus>()
        .map_err(|_| DomainError::storage(format!("Unknown license status '{}' in store", status)))?;

    Ok(License::from_parts(
        LicenseId::from_uuid(id),
        row.try_get("license_key").map_err(decode_error)?,
        status,
        row.try_get("type").map_err(decode_error)?,
        row.try_get("product_name").map_err(decode_error)?,
        row.try_get("customer_name").map_err(decode_error)?,
        row.try_get("customer_email").map_err(decode_error)?,
        row.try_get("metadata").map_err(decode_error)?,
        row.try_get("issued_at").map_err(decode_error)?,
        row.try_get("expires_at").map_err(decode_error)?,
        row.try_get("created_at").map_err(decode_error)?,
        row.try_get("updated_at").map_err(decode_error)?,
    ))
}
