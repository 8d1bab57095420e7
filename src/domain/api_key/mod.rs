//! API key domain
//!
//! Stored keys, the credential format agents present, and the failure
//! taxonomy of authentication.

mod credential;
mod entity;
mod repository;

pub use credential::{
    ApiKeyCredential, AuthFailure, AuthFailureKind, AuthenticationError, CredentialFormat,
    DEFAULT_PREFIX_LENGTH, DEFAULT_SCHEME, DEFAULT_SECRET_LENGTH,
};
pub use entity::{ApiKey, ApiKeyId, AuthenticatedKey};
pub use repository::ApiKeyRepository;

#[cfg(test)]
pub use repository::MockApiKeyRepository;
