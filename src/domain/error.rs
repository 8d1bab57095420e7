use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Update failed: {message}")]
    UpdateFailed { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn update_failed(message: impl Into<String>) -> Self {
        Self::UpdateFailed {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// True for failures of the backing store or runtime rather than of the caller's input
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. } | Self::Internal { .. } | Self::Configuration { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("License 'abc' not found");
        assert_eq!(error.to_string(), "Not found: License 'abc' not found");
    }

    #[test]
    fn test_conflict_error() {
        let error = DomainError::conflict("license key already exists");
        assert_eq!(error.to_string(), "Conflict: license key already exists");
    }

    #[test]
    fn test_update_failed_error() {
        let error = DomainError::update_failed("no rows affected");
        assert_eq!(error.to_string(), "Update failed: no rows affected");
    }

    #[test]
    fn test_infrastructure_classification() {
        assert!(DomainError::storage("connection refused").is_infrastructure());
        assert!(DomainError::internal("task panicked").is_infrastructure());
        assert!(!DomainError::validation("bad input").is_infrastructure());
        assert!(!DomainError::not_found("missing").is_infrastructure());
        assert!(!DomainError::conflict("dup").is_infrastructure());
    }
}
