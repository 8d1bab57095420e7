//! Agent-facing license validation endpoint

use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use validator::Validate;

use crate::api::middleware::RequireApiKey;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, ValidatedJson};
use crate::domain::license::{LicenseStatus, ValidationReason, ValidationRequest, ValidationResult};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ValidateLicenseRequest {
    #[validate(length(min = 1, message = "license_key is required"))]
    pub license_key: String,
    #[validate(length(min = 1, message = "product_name is required"))]
    pub product_name: String,
    /// Agent metadata: `device_id`, `user_id`, `ip_address`
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl From<ValidateLicenseRequest> for ValidationRequest {
    fn from(req: ValidateLicenseRequest) -> Self {
        Self {
            license_key: req.license_key,
            product_name: req.product_name,
            metadata: req.metadata,
        }
    }
}

/// Verdict returned to agents. `status` and `expires_at` are set whenever the key matched a license.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateLicenseResponse {
    pub is_valid: bool,
    pub reason: ValidationReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LicenseStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_data: Option<Value>,
}

impl From<ValidationResult> for ValidateLicenseResponse {
    fn from(result: ValidationResult) -> Self {
        Self {
            is_valid: result.is_valid,
            reason: result.reason,
            status: result.license.as_ref().map(|l| l.status()),
            expires_at: result.license.as_ref().and_then(|l| l.expires_at()),
            allowed_data: result.response_data,
        }
    }
}

/// POST /api/v1/licenses/validate
pub async fn validate_license(
    State(state): State<AppState>,
    RequireApiKey(api_key): RequireApiKey,
    ValidatedJson(request): ValidatedJson<ValidateLicenseRequest>,
) -> Result<Json<ValidateLicenseResponse>, ApiError> {
    debug!(prefix = %api_key.prefix, product = %request.product_name, "Validating license");

    let result = state.validator.validate(&request.into()).await?;

    Ok(Json(result.into()))
}
