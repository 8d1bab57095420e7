//! License repository trait and query types

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;

use super::entity::{License, LicenseId, LicenseStatus};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;
/// Largest offset the store can bind (a signed 64-bit value)
pub const MAX_OFFSET: u64 = i64::MAX as u64;

/// Columns licenses can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Id,
    #[default]
    CreatedAt,
    UpdatedAt,
    ExpiresAt,
    IssuedAt,
    CustomerName,
    CustomerEmail,
    ProductName,
    Type,
    Status,
}

impl SortField {
    /// Parse a user-supplied column name; unknown names yield `None`
    pub fn parse(value: &str) -> Option<Self> {
        let field = match value {
            "id" => Self::Id,
            "created_at" => Self::CreatedAt,
            "updated_at" => Self::UpdatedAt,
            "expires_at" => Self::ExpiresAt,
            "issued_at" => Self::IssuedAt,
            "customer_name" => Self::CustomerName,
            "customer_email" => Self::CustomerEmail,
            "product_name" => Self::ProductName,
            "type" => Self::Type,
            "status" => Self::Status,
            _ => return None,
        };
        Some(field)
    }

    pub fn column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::ExpiresAt => "expires_at",
            Self::IssuedAt => "issued_at",
            Self::CustomerName => "customer_name",
            Self::CustomerEmail => "customer_email",
            Self::ProductName => "product_name",
            Self::Type => "type",
            Self::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filtered, sorted page request over licenses.
///
/// Missing values compare greater than present ones: last when ascending,
/// first when descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub status: Option<LicenseStatus>,
    pub customer_email: Option<String>,
    pub product_name: Option<String>,
    pub license_type: Option<String>,
    pub limit: u32,
    pub offset: u64,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            status: None,
            customer_email: None,
            product_name: None,
            license_type: None,
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl ListParams {
    /// Page of active licenses ordered by soonest expiry
    pub fn active_by_expiry(limit: u32, offset: u64) -> Self {
        Self {
            status: Some(LicenseStatus::Active),
            limit,
            offset,
            sort_by: SortField::ExpiresAt,
            sort_order: SortOrder::Asc,
            ..Self::default()
        }
    }
}

/// One page of licenses plus the total number of matching rows
#[derive(Debug, Clone, PartialEq)]
pub struct LicensePage {
    pub items: Vec<License>,
    pub total: u64,
}

/// The license closest to expiry within the dashboard window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringLicense {
    pub license_key: String,
    pub expires_at: DateTime<Utc>,
    pub product_name: String,
}

/// Aggregated counts for the operator dashboard
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardSummary {
    pub total: u64,
    pub status_counts: HashMap<LicenseStatus, u64>,
    pub type_counts: HashMap<String, u64>,
    pub product_counts: HashMap<String, u64>,
    pub expiring_soon: u64,
    pub next_to_expire: Option<ExpiringLicense>,
}

/// Repository for license persistence
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LicenseRepository: Send + Sync {
    /// Inserts a new license; a duplicate `license_key` yields `Conflict`
    async fn create(&self, license: License) -> Result<License, DomainError>;

    async fn find_by_id(&self, id: &LicenseId) -> Result<Option<License>, DomainError>;

    async fn find_by_key(&self, license_key: &str) -> Result<Option<License>, DomainError>;

    async fn list(&self, params: &ListParams) -> Result<LicensePage, DomainError>;

    /// Sets the status of one license. Idempotent; an unknown id yields `NotFound`.
    async fn update_status(&self, id: &LicenseId, status: LicenseStatus)
        -> Result<(), DomainError>;

    /// Replaces the whole metadata blob of one license
    async fn update_metadata(&self, id: &LicenseId, metadata: &Value) -> Result<(), DomainError>;

    /// Writes the editable fields of an existing license
    async fn update(&self, license: &License) -> Result<License, DomainError>;

    /// Counts for the dashboard; "expiring soon" covers active licenses in `[now, now + window]`
    async fn dashboard_summary(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<DashboardSummary, DomainError>;
}
