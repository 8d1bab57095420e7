//! Domain layer - licenses, API keys and the errors they share

pub mod api_key;
pub mod error;
pub mod license;

pub use api_key::{ApiKey, ApiKeyId, ApiKeyRepository, AuthFailure, AuthenticatedKey};
pub use error::DomainError;
pub use license::{
    License, LicenseId, LicenseRepository, LicenseStatus, ValidationReason, ValidationRequest,
    ValidationResult,
};
