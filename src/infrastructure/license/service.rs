//! License service for operator-facing administration

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::license::{
    DashboardSummary, License, LicenseId, LicensePage, LicenseRepository, LicenseStatus,
    ListParams, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
use crate::domain::DomainError;

/// Window used for the dashboard's "expiring soon" count
pub const EXPIRING_SOON_DAYS: i64 = 30;

/// Request for issuing a new license
#[derive(Debug, Clone)]
pub struct CreateLicenseRequest {
    pub license_type: String,
    pub product_name: String,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub metadata: Option<Value>,
    pub expires_at: Option<DateTime<Utc>>,
    pub initial_status: Option<LicenseStatus>,
}

/// Partial update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct UpdateLicenseRequest {
    pub license_type: Option<String>,
    pub product_name: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: Option<Value>,
}

impl UpdateLicenseRequest {
    pub fn is_empty(&self) -> bool {
        self.license_type.is_none()
            && self.product_name.is_none()
            && self.customer_name.is_none()
            && self.customer_email.is_none()
            && self.expires_at.is_none()
            && self.metadata.is_none()
    }
}

/// Clamp a requested page size to `1..=MAX_PAGE_LIMIT`
pub fn clamp_limit(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT)
}

#[derive(Clone)]
pub struct LicenseService {
    repository: Arc<dyn LicenseRepository>,
}

impl std::fmt::Debug for LicenseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseService").finish_non_exhaustive()
    }
}

impl LicenseService {
    pub fn new(repository: Arc<dyn LicenseRepository>) -> Self {
        Self { repository }
    }

    /// Issue a license with a freshly generated key
    pub async fn create(&self, request: CreateLicenseRequest) -> Result<License, DomainError> {
        require_non_empty("type", &request.license_type)?;
        require_non_empty("product_name", &request.product_name)?;

        if let Some(metadata) = &request.metadata {
            require_object(metadata)?;
        }

        if let Some(expires_at) = request.expires_at {
            if expires_at <= Utc::now() {
                return Err(DomainError::validation("expires_at must be in the future"));
            }
        }

        let status = request.initial_status.unwrap_or(LicenseStatus::Active);
        let mut license = License::new(
            Uuid::new_v4().to_string(),
            request.license_type,
            request.product_name,
            status,
        )
        .with_customer(request.customer_name, request.customer_email);

        if let Some(metadata) = request.metadata {
            license = license.with_metadata(metadata);
        }

        if let Some(expires_at) = request.expires_at {
            license = license.with_expires_at(expires_at);
        }

        let license = self.repository.create(license).await?;

        info!(
            license_id = %license.id(),
            product = %license.product_name(),
            status = %license.status(),
            "License created"
        );

        Ok(license)
    }

    pub async fn get(&self, id: &LicenseId) -> Result<License, DomainError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("License '{}' not found", id)))
    }

    pub async fn list(&self, mut params: ListParams) -> Result<LicensePage, DomainError> {
        params.limit = params.limit.clamp(1, MAX_PAGE_LIMIT);
        self.repository.list(&params).await
    }

    /// Set any status on an existing license
    pub async fn update_status(
        &self,
        id: &LicenseId,
        status: LicenseStatus,
    ) -> Result<(), DomainError> {
        self.repository.update_status(id, status).await?;

        info!(license_id = %id, status = %status, "License status updated");
        Ok(())
    }

    pub async fn update(
        &self,
        id: &LicenseId,
        request: UpdateLicenseRequest,
    ) -> Result<License, DomainError> {
        let mut license = self.get(id).await?;

        if request.is_empty() {
            debug!(license_id = %id, "Empty license update");
            return Ok(license);
        }

        if let Some(license_type) = request.license_type {
            require_non_empty("type", &license_type)?;
            license.set_license_type(license_type);
        }

        if let Some(product_name) = request.product_name {
            require_non_empty("product_name", &product_name)?;
            license.set_product_name(product_name);
        }

        if let Some(customer_name) = request.customer_name {
            license.set_customer_name(Some(customer_name));
        }

        if let Some(customer_email) = request.customer_email {
            license.set_customer_email(Some(customer_email));
        }

        if let Some(expires_at) = request.expires_at {
            license.set_expires_at(Some(expires_at));
        }

        if let Some(metadata) = request.metadata {
            require_object(&metadata)?;
            license.set_metadata(Some(metadata));
        }

        // The row was just read, so a miss here means it vanished mid-update
        let license = self
            .repository
            .update(&license)
            .await
            .map_err(|e| match e {
                DomainError::NotFound { .. } => {
                    DomainError::update_failed(format!("License '{}' could not be updated", id))
                }
                other => other,
            })?;

        info!(license_id = %id, "License updated");
        Ok(license)
    }

    pub async fn dashboard_summary(&self) -> Result<DashboardSummary, DomainError> {
        self.repository
            .dashboard_summary(Utc::now(), Duration::days(EXPIRING_SOON_DAYS))
            .await
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{} is required", field)));
    }
    Ok(())
}

fn require_object(metadata: &Value) -> Result<(), DomainError> {
    if !metadata.is_object() {
        return Err(DomainError::validation("metadata must be a JSON object"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::license::MockLicenseRepository;
    use crate::infrastructure::license::InMemoryLicenseRepository;
    use serde_json::json;

    fn service() -> LicenseService {
        LicenseService::new(Arc::new(InMemoryLicenseRepository::new()))
    }

    fn create_request(product: &str) -> CreateLicenseRequest {
        CreateLicenseRequest {
            license_type: "subscription".to_string(),
            product_name: product.to_string(),
            customer_name: Some("Acme".to_string()),
            customer_email: Some("ops@acme.test".to_string()),
            metadata: None,
            expires_at: None,
            initial_status: None,
        }
    }

    #[tokio::test]
    async fn test_create_defaults_to_active() {
        let service = service();

        let license = service.create(create_request("Foo")).await.unwrap();

        assert_eq!(license.status(), LicenseStatus::Active);
        assert!(license.issued_at().is_some());
        assert!(Uuid::parse_str(license.license_key()).is_ok());
        assert_eq!(license.customer_name(), Some("Acme"));
    }

    #[tokio::test]
    async fn test_create_pending_is_not_issued() {
        let service = service();
        let request = CreateLicenseRequest {
            initial_status: Some(LicenseStatus::Pending),
            ..create_request("Foo")
        };

        let license = service.create(request).await.unwrap();

        assert_eq!(license.status(), LicenseStatus::Pending);
        assert!(license.issued_at().is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let service = service();

        let blank_product = CreateLicenseRequest {
            product_name: "  ".to_string(),
            ..create_request("Foo")
        };
        assert!(matches!(
            service.create(blank_product).await,
            Err(DomainError::Validation { .. })
        ));

        let array_metadata = CreateLicenseRequest {
            metadata: Some(json!(["features"])),
            ..create_request("Foo")
        };
        assert!(matches!(
            service.create(array_metadata).await,
            Err(DomainError::Validation { .. })
        ));

        let past_expiry = CreateLicenseRequest {
            expires_at: Some(Utc::now() - Duration::minutes(1)),
            ..create_request("Foo")
        };
        assert!(matches!(
            service.create(past_expiry).await,
            Err(DomainError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let result = service().get(&LicenseId::new()).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_clamps_limit() {
        let mut repository = MockLicenseRepository::new();
        repository
            .expect_list()
            .withf(|params| params.limit == MAX_PAGE_LIMIT)
            .returning(|_| {
                Ok(LicensePage {
                    items: vec![],
                    total: 0,
                })
            });
        repository
            .expect_list()
            .withf(|params| params.limit == 1)
            .returning(|_| {
                Ok(LicensePage {
                    items: vec![],
                    total: 0,
                })
            });

        let service = LicenseService::new(Arc::new(repository));

        service
            .list(ListParams {
                limit: 5000,
                ..ListParams::default()
            })
            .await
            .unwrap();
        service
            .list(ListParams {
                limit: 0,
                ..ListParams::default()
            })
            .await
            .unwrap();
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), DEFAULT_PAGE_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(50)), 50);
        assert_eq!(clamp_limit(Some(101)), MAX_PAGE_LIMIT);
    }

    #[tokio::test]
    async fn test_update_status_is_permissive() {
        let service = service();
        let license = service.create(create_request("Foo")).await.unwrap();

        service
            .update_status(license.id(), LicenseStatus::Revoked)
            .await
            .unwrap();
        service
            .update_status(license.id(), LicenseStatus::Active)
            .await
            .unwrap();

        let stored = service.get(license.id()).await.unwrap();
        assert_eq!(stored.status(), LicenseStatus::Active);
        assert_eq!(stored.issued_at(), license.issued_at());
    }

    #[tokio::test]
    async fn test_update_status_unknown_is_not_found() {
        let result = service()
            .update_status(&LicenseId::new(), LicenseStatus::Revoked)
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_partial_update() {
        let service = service();
        let license = service
            .create(CreateLicenseRequest {
                metadata: Some(json!({"features": ["a"], "device_id": "D1"})),
                ..create_request("Foo")
            })
            .await
            .unwrap();

        let updated = service
            .update(
                license.id(),
                UpdateLicenseRequest {
                    product_name: Some("Bar".to_string()),
                    metadata: Some(json!({"features": ["b"]})),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.product_name(), "Bar");
        assert_eq!(updated.license_type(), "subscription");
        assert_eq!(updated.customer_email(), Some("ops@acme.test"));
        assert_eq!(updated.metadata(), Some(&json!({"features": ["b"]})));
        assert_eq!(updated.status(), LicenseStatus::Active);
    }

    #[tokio::test]
    async fn test_update_of_vanished_row_is_update_failed() {
        let existing = License::new("K1", "subscription", "Foo", LicenseStatus::Active);
        let id = *existing.id();

        let mut repository = MockLicenseRepository::new();
        repository
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        repository
            .expect_update()
            .returning(|license| {
                Err(DomainError::not_found(format!(
                    "License '{}' not found",
                    license.id()
                )))
            });

        let result = LicenseService::new(Arc::new(repository))
            .update(
                &id,
                UpdateLicenseRequest {
                    product_name: Some("Bar".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(DomainError::UpdateFailed { .. })));
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let result = service()
            .update(
                &LicenseId::new(),
                UpdateLicenseRequest {
                    product_name: Some("Bar".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_empty_update_returns_current() {
        let service = service();
        let license = service.create(create_request("Foo")).await.unwrap();

        let unchanged = service
            .update(license.id(), UpdateLicenseRequest::default())
            .await
            .unwrap();

        assert_eq!(unchanged, license);
    }

    #[tokio::test]
    async fn test_dashboard_summary_counts() {
        let service = service();
        service
            .create(CreateLicenseRequest {
                expires_at: Some(Utc::now() + Duration::days(3)),
                ..create_request("Foo")
            })
            .await
            .unwrap();
        service
            .create(CreateLicenseRequest {
                expires_at: Some(Utc::now() + Duration::days(90)),
                ..create_request("Bar")
            })
            .await
            .unwrap();
        service
            .create(CreateLicenseRequest {
                initial_status: Some(LicenseStatus::Pending),
                ..create_request("Foo")
            })
            .await
            .unwrap();

        let summary = service.dashboard_summary().await.unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.status_counts.get(&LicenseStatus::Active), Some(&2));
        assert_eq!(summary.product_counts.get("Foo"), Some(&2));
        assert_eq!(summary.expiring_soon, 1);
        assert_eq!(
            summary.next_to_expire.map(|l| l.product_name),
            Some("Foo".to_string())
        );
    }
}
