//! Validation request and result types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entity::{License, LicenseStatus};

/// Machine-readable outcome of a validation call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationReason {
    Valid,
    NotFound,
    ProductMismatch,
    Pending,
    Inactive,
    Expired,
    Revoked,
    DeviceIdRequired,
    DeviceIdMismatch,
    UserIdRequired,
    UserIdMismatch,
}

impl ValidationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::NotFound => "not_found",
            Self::ProductMismatch => "product_mismatch",
            Self::Pending => "pending",
            Self::Inactive => "inactive",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
            Self::DeviceIdRequired => "device_id_required",
            Self::DeviceIdMismatch => "device_id_mismatch",
            Self::UserIdRequired => "user_id_required",
            Self::UserIdMismatch => "user_id_mismatch",
        }
    }

    /// Reason reported for a license that is not in the active state
    pub fn for_inactive_status(status: LicenseStatus) -> Option<Self> {
        match status {
            LicenseStatus::Active => None,
            LicenseStatus::Pending => Some(Self::Pending),
            LicenseStatus::Inactive => Some(Self::Inactive),
            LicenseStatus::Expired => Some(Self::Expired),
            LicenseStatus::Revoked => Some(Self::Revoked),
        }
    }
}

impl std::fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an agent presents for validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRequest {
    pub license_key: String,
    pub product_name: String,
    pub metadata: Option<Value>,
}

impl ValidationRequest {
    pub fn new(license_key: impl Into<String>, product_name: impl Into<String>) -> Self {
        Self {
            license_key: license_key.into(),
            product_name: product_name.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Ephemeral result of a validation call. A rejected license is a result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub reason: ValidationReason,
    pub license: Option<License>,
    pub response_data: Option<Value>,
}

impl ValidationResult {
    pub fn rejected(reason: ValidationReason, license: Option<License>) -> Self {
        Self {
            is_valid: false,
            reason,
            license,
            response_data: None,
        }
    }

    pub fn accepted(license: License, response_data: Option<Value>) -> Self {
        Self {
            is_valid: true,
            reason: ValidationReason::Valid,
            license: Some(license),
            response_data,
        }
    }
}
