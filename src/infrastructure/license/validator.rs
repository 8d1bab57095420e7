//! License validation for agents
//!
//! Checks run in a fixed order and stop at the first failing one. A license
//! that fails a check is a normal result carrying a reason; only store
//! failures surface as errors.
//!
//! Two writes happen off the request path through [`BackgroundTasks`]:
//! moving an overdue license to `expired`, and recording `last_validated_at`
//! / `last_ip` in the license metadata. The metadata write merges into the
//! snapshot read during validation, so concurrent validations of the same
//! license can overwrite each other's bookkeeping.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::license::metadata::{self, AgentMetadata};
use crate::domain::license::{
    License, LicenseRepository, LicenseStatus, ValidationReason, ValidationRequest,
    ValidationResult,
};
use crate::domain::DomainError;
use crate::infrastructure::background::BackgroundTasks;
use crate::infrastructure::observability::{
    record_expirations, record_license_validation, ExpirationSource,
};

pub const DEFAULT_EXPIRATION_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_ENRICHMENT_TIMEOUT: Duration = Duration::from_secs(15);

const LAZY_EXPIRE_TASK: &str = "lazy_expire";
const ENRICHMENT_TASK: &str = "metadata_enrichment";

/// Validates license keys presented by agents
#[derive(Clone)]
pub struct LicenseValidator {
    repository: Arc<dyn LicenseRepository>,
    background: BackgroundTasks,
    expiration_timeout: Duration,
    enrichment_timeout: Duration,
}

impl std::fmt::Debug for LicenseValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseValidator")
            .field("expiration_timeout", &self.expiration_timeout)
            .field("enrichment_timeout", &self.enrichment_timeout)
            .finish()
    }
}

impl LicenseValidator {
    pub fn new(repository: Arc<dyn LicenseRepository>, background: BackgroundTasks) -> Self {
        Self {
            repository,
            background,
            expiration_timeout: DEFAULT_EXPIRATION_TIMEOUT,
            enrichment_timeout: DEFAULT_ENRICHMENT_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, expiration: Duration, enrichment: Duration) -> Self {
        self.expiration_timeout = expiration;
        self.enrichment_timeout = enrichment;
        self
    }

    /// Decide whether `request.license_key` currently grants access to `request.product_name`
    pub async fn validate(
        &self,
        request: &ValidationRequest,
    ) -> Result<ValidationResult, DomainError> {
        let result = self.evaluate(request).await?;

        record_license_validation(result.reason.as_str());
        debug!(
            license_id = ?result.license.as_ref().map(|l| l.id().to_string()),
            reason = %result.reason,
            is_valid = result.is_valid,
            "License validated"
        );

        Ok(result)
    }

    async fn evaluate(&self, request: &ValidationRequest) -> Result<ValidationResult, DomainError> {
        let Some(license) = self.repository.find_by_key(&request.license_key).await? else {
            return Ok(ValidationResult::rejected(ValidationReason::NotFound, None));
        };

        if license.product_name() != request.product_name {
            return Ok(ValidationResult::rejected(
                ValidationReason::ProductMismatch,
                Some(license),
            ));
        }

        if let Some(reason) = ValidationReason::for_inactive_status(license.status()) {
            return Ok(ValidationResult::rejected(reason, Some(license)));
        }

        let now = Utc::now();
        if license.is_expired_at(now) {
            self.schedule_expiration(&license);
            return Ok(ValidationResult::rejected(
                ValidationReason::Expired,
                Some(license),
            ));
        }

        let agent = AgentMetadata::from_value(request.metadata.as_ref());
        let bindings = license.metadata_object();

        if let Some(reason) = check_binding(
            bindings,
            metadata::DEVICE_ID,
            agent.device_id.as_deref(),
            ValidationReason::DeviceIdRequired,
            ValidationReason::DeviceIdMismatch,
        ) {
            return Ok(ValidationResult::rejected(reason, Some(license)));
        }

        if let Some(reason) = check_binding(
            bindings,
            metadata::USER_ID,
            agent.user_id.as_deref(),
            ValidationReason::UserIdRequired,
            ValidationReason::UserIdMismatch,
        ) {
            return Ok(ValidationResult::rejected(reason, Some(license)));
        }

        let response_data = metadata::allowed_data(bindings);
        self.schedule_enrichment(&license, now, agent.ip_address);

        Ok(ValidationResult::accepted(license, response_data))
    }

    fn schedule_expiration(&self, license: &License) {
        let repository = self.repository.clone();
        let id = *license.id();

        debug!(license_id = %id, "License past expiry, scheduling expiration");

        self.background
            .spawn(LAZY_EXPIRE_TASK, self.expiration_timeout, async move {
                repository.update_status(&id, LicenseStatus::Expired).await?;
                record_expirations(ExpirationSource::Lazy, 1);
                Ok(())
            });
    }

    fn schedule_enrichment(
        &self,
        license: &License,
        validated_at: DateTime<Utc>,
        last_ip: Option<String>,
    ) {
        let base = license.metadata().cloned();
        let merged = metadata::merge_enrichment(base.as_ref(), validated_at, last_ip.as_deref());

        if base.as_ref() == Some(&merged) {
            return;
        }

        let repository = self.repository.clone();
        let id = *license.id();

        self.background
            .spawn(ENRICHMENT_TASK, self.enrichment_timeout, async move {
                repository.update_metadata(&id, &merged).await
            });
    }
}

/// A binding applies only when the license stores a non-empty value for `key`
fn check_binding(
    license_metadata: Option<&Map<String, Value>>,
    key: &str,
    presented: Option<&str>,
    required: ValidationReason,
    mismatch: ValidationReason,
) -> Option<ValidationReason> {
    let bound = license_metadata.and_then(|object| metadata::non_empty_str(object, key))?;

    match presented {
        None => Some(required),
        Some(value) if value != bound => Some(mismatch),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::license::MockLicenseRepository;
    use crate::infrastructure::license::InMemoryLicenseRepository;
    use chrono::Duration as ChronoDuration;
    use serde_json::json;

    struct Fixture {
        repository: Arc<InMemoryLicenseRepository>,
        background: BackgroundTasks,
        validator: LicenseValidator,
    }

    fn fixture() -> Fixture {
        let repository = Arc::new(InMemoryLicenseRepository::new());
        let background = BackgroundTasks::new(16);
        let validator = LicenseValidator::new(repository.clone(), background.clone());

        Fixture {
            repository,
            background,
            validator,
        }
    }

    async fn seed(fixture: &Fixture, license: License) -> License {
        fixture.repository.create(license).await.unwrap()
    }

    fn active(key: &str, product: &str) -> License {
        License::new(key, "subscription", product, LicenseStatus::Active)
    }

    #[tokio::test]
    async fn test_active_unexpired_license_is_valid() {
        let f = fixture();
        seed(&f, active("K1", "Foo")).await;

        let result = f
            .validator
            .validate(&ValidationRequest::new("K1", "Foo"))
            .await
            .unwrap();

        assert!(result.is_valid);
        assert_eq!(result.reason, ValidationReason::Valid);
        assert_eq!(result.response_data, None);
    }

    #[tokio::test]
    async fn test_unknown_key_is_not_found() {
        let f = fixture();

        let result = f
            .validator
            .validate(&ValidationRequest::new("missing", "Foo"))
            .await
            .unwrap();

        assert!(!result.is_valid);
        assert_eq!(result.reason, ValidationReason::NotFound);
        assert!(result.license.is_none());
    }

    #[tokio::test]
    async fn test_product_mismatch() {
        let f = fixture();
        seed(&f, active("K3", "Bar")).await;

        let result = f
            .validator
            .validate(&ValidationRequest::new("K3", "Foo"))
            .await
            .unwrap();

        assert!(!result.is_valid);
        assert_eq!(result.reason, ValidationReason::ProductMismatch);
    }

    #[tokio::test]
    async fn test_product_match_is_case_sensitive() {
        let f = fixture();
        seed(&f, active("K3", "Foo")).await;

        let result = f
            .validator
            .validate(&ValidationRequest::new("K3", "foo"))
            .await
            .unwrap();

        assert_eq!(result.reason, ValidationReason::ProductMismatch);
    }

    #[tokio::test]
    async fn test_non_active_statuses_report_their_name() {
        let f = fixture();
        let cases = [
            ("P", LicenseStatus::Pending, ValidationReason::Pending),
            ("I", LicenseStatus::Inactive, ValidationReason::Inactive),
            ("E", LicenseStatus::Expired, ValidationReason::Expired),
            ("R", LicenseStatus::Revoked, ValidationReason::Revoked),
        ];

        for (key, status, expected) in cases {
            seed(&f, License::new(key, "trial", "Foo", status)).await;

            let result = f
                .validator
                .validate(&ValidationRequest::new(key, "Foo"))
                .await
                .unwrap();

            assert!(!result.is_valid);
            assert_eq!(result.reason, expected, "status {status}");
        }
    }

    #[tokio::test]
    async fn test_status_checked_before_expiry() {
        let f = fixture();
        let license = License::new("K", "trial", "Foo", LicenseStatus::Revoked)
            .with_expires_at(Utc::now() - ChronoDuration::days(1));
        let license = seed(&f, license).await;

        let result = f
            .validator
            .validate(&ValidationRequest::new("K", "Foo"))
            .await
            .unwrap();
        f.background.drain().await;

        assert_eq!(result.reason, ValidationReason::Revoked);
        let stored = f.repository.find_by_id(license.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), LicenseStatus::Revoked);
    }

    #[tokio::test]
    async fn test_overdue_license_is_expired_lazily() {
        let f = fixture();
        let license =
            seed(&f, active("K2", "Foo").with_expires_at(Utc::now() - ChronoDuration::hours(1)))
                .await;

        let result = f
            .validator
            .validate(&ValidationRequest::new("K2", "Foo"))
            .await
            .unwrap();

        assert!(!result.is_valid);
        assert_eq!(result.reason, ValidationReason::Expired);

        f.background.drain().await;
        let stored = f.repository.find_by_id(license.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), LicenseStatus::Expired);
    }

    #[tokio::test]
    async fn test_future_expiry_is_valid() {
        let f = fixture();
        seed(&f, active("K", "Foo").with_expires_at(Utc::now() + ChronoDuration::days(1))).await;

        let result = f
            .validator
            .validate(&ValidationRequest::new("K", "Foo"))
            .await
            .unwrap();

        assert!(result.is_valid);
    }

    #[tokio::test]
    async fn test_device_binding() {
        let f = fixture();
        seed(&f, active("K", "Foo").with_metadata(json!({"device_id": "D1"}))).await;

        let missing = f
            .validator
            .validate(&ValidationRequest::new("K", "Foo").with_metadata(json!({})))
            .await
            .unwrap();
        assert_eq!(missing.reason, ValidationReason::DeviceIdRequired);

        let empty = f
            .validator
            .validate(&ValidationRequest::new("K", "Foo").with_metadata(json!({"device_id": ""})))
            .await
            .unwrap();
        assert_eq!(empty.reason, ValidationReason::DeviceIdRequired);

        let mismatch = f
            .validator
            .validate(&ValidationRequest::new("K", "Foo").with_metadata(json!({"device_id": "D2"})))
            .await
            .unwrap();
        assert_eq!(mismatch.reason, ValidationReason::DeviceIdMismatch);

        let matched = f
            .validator
            .validate(&ValidationRequest::new("K", "Foo").with_metadata(json!({"device_id": "D1"})))
            .await
            .unwrap();
        assert!(matched.is_valid);
    }

    #[tokio::test]
    async fn test_user_binding_checked_after_device() {
        let f = fixture();
        seed(
            &f,
            active("K", "Foo").with_metadata(json!({"device_id": "D1", "user_id": "U1"})),
        )
        .await;

        let wrong_device = f
            .validator
            .validate(
                &ValidationRequest::new("K", "Foo")
                    .with_metadata(json!({"device_id": "D2", "user_id": "U2"})),
            )
            .await
            .unwrap();
        assert_eq!(wrong_device.reason, ValidationReason::DeviceIdMismatch);

        let no_user = f
            .validator
            .validate(&ValidationRequest::new("K", "Foo").with_metadata(json!({"device_id": "D1"})))
            .await
            .unwrap();
        assert_eq!(no_user.reason, ValidationReason::UserIdRequired);

        let wrong_user = f
            .validator
            .validate(
                &ValidationRequest::new("K", "Foo")
                    .with_metadata(json!({"device_id": "D1", "user_id": "U2"})),
            )
            .await
            .unwrap();
        assert_eq!(wrong_user.reason, ValidationReason::UserIdMismatch);
    }

    #[tokio::test]
    async fn test_empty_stored_binding_is_ignored() {
        let f = fixture();
        seed(&f, active("K", "Foo").with_metadata(json!({"device_id": ""}))).await;

        let result = f
            .validator
            .validate(&ValidationRequest::new("K", "Foo"))
            .await
            .unwrap();

        assert!(result.is_valid);
    }

    #[tokio::test]
    async fn test_success_returns_only_whitelisted_data() {
        let f = fixture();
        seed(
            &f,
            active("K", "Foo").with_metadata(json!({
                "features": ["export", "sso"],
                "limits": {"seats": 10},
                "internal_note": "do not share"
            })),
        )
        .await;

        let result = f
            .validator
            .validate(&ValidationRequest::new("K", "Foo"))
            .await
            .unwrap();

        assert_eq!(
            result.response_data,
            Some(json!({"features": ["export", "sso"], "limits": {"seats": 10}}))
        );
    }

    #[tokio::test]
    async fn test_success_enriches_metadata() {
        let f = fixture();
        let license =
            seed(&f, active("K", "Foo").with_metadata(json!({"custom": "kept"}))).await;

        f.validator
            .validate(
                &ValidationRequest::new("K", "Foo").with_metadata(json!({"ip_address": "10.1.2.3"})),
            )
            .await
            .unwrap();
        f.background.drain().await;

        let stored = f.repository.find_by_id(license.id()).await.unwrap().unwrap();
        let metadata = stored.metadata().unwrap();
        assert_eq!(metadata["custom"], "kept");
        assert_eq!(metadata["last_ip"], "10.1.2.3");
        assert!(metadata["last_validated_at"].is_string());
    }

    #[tokio::test]
    async fn test_rejected_validation_does_not_enrich() {
        let f = fixture();
        let license = seed(&f, active("K", "Bar")).await;

        f.validator
            .validate(&ValidationRequest::new("K", "Foo"))
            .await
            .unwrap();
        f.background.drain().await;

        let stored = f.repository.find_by_id(license.id()).await.unwrap().unwrap();
        assert!(stored.metadata().is_none());
    }

    #[tokio::test]
    async fn test_repeated_validation_is_stable() {
        let f = fixture();
        seed(&f, active("K", "Foo").with_metadata(json!({"features": ["a"]}))).await;
        let request = ValidationRequest::new("K", "Foo");

        let first = f.validator.validate(&request).await.unwrap();
        f.background.drain().await;
        let second = f.validator.validate(&request).await.unwrap();
        f.background.drain().await;

        assert_eq!(first.is_valid, second.is_valid);
        assert_eq!(first.reason, second.reason);
        assert_eq!(first.response_data, second.response_data);
    }

    #[tokio::test]
    async fn test_store_failure_is_an_error() {
        let mut repository = MockLicenseRepository::new();
        repository
            .expect_find_by_key()
            .returning(|_| Err(DomainError::storage("connection refused")));

        let validator = LicenseValidator::new(Arc::new(repository), BackgroundTasks::new(4));
        let result = validator.validate(&ValidationRequest::new("K", "Foo")).await;

        assert!(matches!(result, Err(DomainError::Storage { .. })));
    }

    #[tokio::test]
    async fn test_failed_enrichment_does_not_affect_result() {
        let license = active("K", "Foo");
        let mut repository = MockLicenseRepository::new();
        repository
            .expect_find_by_key()
            .returning(move |_| Ok(Some(license.clone())));
        repository
            .expect_update_metadata()
            .returning(|_, _| Err(DomainError::storage("write failed")));

        let background = BackgroundTasks::new(4);
        let validator = LicenseValidator::new(Arc::new(repository), background.clone());

        let result = validator
            .validate(&ValidationRequest::new("K", "Foo"))
            .await
            .unwrap();
        background.drain().await;

        assert!(result.is_valid);
    }
}
