//! In-memory license repository implementation

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::domain::license::{
    DashboardSummary, ExpiringLicense, License, LicenseId, LicensePage, LicenseRepository,
    LicenseStatus, ListParams, SortField, SortOrder,
};
use crate::domain::DomainError;

#[derive(Debug, Default)]
struct Store {
    licenses: HashMap<LicenseId, License>,
    key_index: HashMap<String, LicenseId>,
}

/// In-memory implementation of LicenseRepository
#[derive(Debug, Default)]
pub struct InMemoryLicenseRepository {
    store: RwLock<Store>,
}

impl InMemoryLicenseRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LicenseRepository for InMemoryLicenseRepository {
    async fn create(&self, license: License) -> Result<License, DomainError> {
        let mut store = self.store.write().await;

        if store.key_index.contains_key(license.license_key()) {
            return Err(DomainError::conflict("License key already exists"));
        }

        if store.licenses.contains_key(license.id()) {
            return Err(DomainError::conflict(format!(
                "License with id '{}' already exists",
                license.id()
            )));
        }

        store
            .key_index
            .insert(license.license_key().to_string(), *license.id());
        store.licenses.insert(*license.id(), license.clone());

        Ok(license)
    }

    async fn find_by_id(&self, id: &LicenseId) -> Result<Option<License>, DomainError> {
        let store = self.store.read().await;
        Ok(store.licenses.get(id).cloned())
    }

    async fn find_by_key(&self, license_key: &str) -> Result<Option<License>, DomainError> {
        let store = self.store.read().await;

        Ok(store
            .key_index
            .get(license_key)
            .and_then(|id| store.licenses.get(id))
            .cloned())
    }

    async fn list(&self, params: &ListParams) -> Result<LicensePage, DomainError> {
        let store = self.store.read().await;

        let mut matching: Vec<&License> = store
            .licenses
            .values()
            .filter(|license| matches_filters(license, params))
            .collect();

        matching.sort_by(|a, b| {
            let ordering = compare_by(a, b, params.sort_by);
            let ordering = match params.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            };
            ordering.then_with(|| a.id().cmp(b.id()))
        });

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(params.offset).unwrap_or(usize::MAX))
            .take(params.limit as usize)
            .cloned()
            .collect();

        Ok(LicensePage { items, total })
    }

    async fn update_status(
        &self,
        id: &LicenseId,
        status: LicenseStatus,
    ) -> Result<(), DomainError> {
        let mut store = self.store.write().await;

        let license = store
            .licenses
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found(format!("License '{}' not found", id)))?;
        license.set_status(status);

        Ok(())
    }

    async fn update_metadata(&self, id: &LicenseId, metadata: &Value) -> Result<(), DomainError> {
        let mut store = self.store.write().await;

        let license = store
            .licenses
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found(format!("License '{}' not found", id)))?;
        license.set_metadata(Some(metadata.clone()));

        Ok(())
    }

    async fn update(&self, license: &License) -> Result<License, DomainError> {
        let mut store = self.store.write().await;

        let current = store.licenses.get_mut(license.id()).ok_or_else(|| {
            DomainError::not_found(format!("License '{}' not found", license.id()))
        })?;

        current.set_license_type(license.license_type());
        current.set_product_name(license.product_name());
        current.set_customer_name(license.customer_name().map(str::to_string));
        current.set_customer_email(license.customer_email().map(str::to_string));
        current.set_expires_at(license.expires_at());
        current.set_metadata(license.metadata().cloned());

        Ok(current.clone())
    }

    async fn dashboard_summary(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<DashboardSummary, DomainError> {
        let store = self.store.read().await;
        let horizon = now + window;
        let mut summary = DashboardSummary {
            total: store.licenses.len() as u64,
            ..DashboardSummary::default()
        };

        for license in store.licenses.values() {
            *summary.status_counts.entry(license.status()).or_default() += 1;
            *summary
                .type_counts
                .entry(license.license_type().to_string())
                .or_default() += 1;
            *summary
                .product_counts
                .entry(license.product_name().to_string())
                .or_default() += 1;

            let Some(expires_at) = license.expires_at() else {
                continue;
            };

            if license.status() != LicenseStatus::Active || expires_at < now || expires_at > horizon
            {
                continue;
            }

            summary.expiring_soon += 1;

            let is_sooner = summary
                .next_to_expire
                .as_ref()
                .is_none_or(|next| expires_at < next.expires_at);

            if is_sooner {
                summary.next_to_expire = Some(ExpiringLicense {
                    license_key: license.license_key().to_string(),
                    expires_at,
                    product_name: license.product_name().to_string(),
                });
            }
        }

        Ok(summary)
    }
}

fn matches_filters(license: &License, params: &ListParams) -> bool {
    params.status.is_none_or(|status| license.status() == status)
        && params
            .customer_email
            .as_deref()
            .is_none_or(|email| license.customer_email() == Some(email))
        && params
            .product_name
            .as_deref()
            .is_none_or(|product| license.product_name() == product)
        && params
            .license_type
            .as_deref()
            .is_none_or(|license_type| license.license_type() == license_type)
}

fn compare_by(a: &License, b: &License, field: SortField) -> Ordering {
    match field {
        SortField::Id => a.id().cmp(b.id()),
        SortField::CreatedAt => a.created_at().cmp(&b.created_at()),
        SortField::UpdatedAt => a.updated_at().cmp(&b.updated_at()),
        SortField::ExpiresAt => nulls_greatest(a.expires_at(), b.expires_at()),
        SortField::IssuedAt => nulls_greatest(a.issued_at(), b.issued_at()),
        SortField::CustomerName => nulls_greatest(a.customer_name(), b.customer_name()),
        SortField::CustomerEmail => nulls_greatest(a.customer_email(), b.customer_email()),
        SortField::ProductName => a.product_name().cmp(b.product_name()),
        SortField::Type => a.license_type().cmp(b.license_type()),
        SortField::Status => a.status().as_str().cmp(b.status().as_str()),
    }
}

/// Missing values compare greater than present ones, as in PostgreSQL.
/// They come last ascending and first descending.
fn nulls_greatest<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
