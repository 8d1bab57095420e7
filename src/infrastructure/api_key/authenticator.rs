//! API key authentication
//!
//! The verdict comes from a single lookup by prefix and a constant-time hash
//! comparison. Unknown prefixes, disabled keys and wrong secrets are all
//! reported as the same failure.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use crate::domain::api_key::{
    ApiKeyCredential, ApiKeyRepository, AuthFailure, AuthenticatedKey, AuthenticationError,
    CredentialFormat,
};
use crate::infrastructure::background::BackgroundTasks;
use crate::infrastructure::observability::record_api_key_authentication;

use super::generator::verify_key;

pub const DEFAULT_LAST_USED_TIMEOUT: Duration = Duration::from_secs(5);

const LAST_USED_TASK: &str = "api_key_last_used";

#[derive(Clone)]
pub struct ApiKeyAuthenticator {
    repository: Arc<dyn ApiKeyRepository>,
    background: BackgroundTasks,
    format: CredentialFormat,
    last_used_timeout: Duration,
}

impl std::fmt::Debug for ApiKeyAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyAuthenticator")
            .field("format", &self.format)
            .field("last_used_timeout", &self.last_used_timeout)
            .finish()
    }
}

impl ApiKeyAuthenticator {
    pub fn new(repository: Arc<dyn ApiKeyRepository>, background: BackgroundTasks) -> Self {
        Self {
            repository,
            background,
            format: CredentialFormat::default(),
            last_used_timeout: DEFAULT_LAST_USED_TIMEOUT,
        }
    }

    pub fn with_format(mut self, format: CredentialFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_last_used_timeout(mut self, timeout: Duration) -> Self {
        self.last_used_timeout = timeout;
        self
    }

    /// Authenticate the raw value of the API key header
    pub async fn authenticate(
        &self,
        header: Option<&str>,
    ) -> Result<AuthenticatedKey, AuthenticationError> {
        let outcome = self.verify(header).await;

        let label = match &outcome {
            Ok(_) => "success",
            Err(AuthenticationError::Rejected(failure)) => failure.as_str(),
            Err(AuthenticationError::Store(_)) => "error",
        };
        record_api_key_authentication(label);

        outcome
    }

    async fn verify(&self, header: Option<&str>) -> Result<AuthenticatedKey, AuthenticationError> {
        let raw = header.ok_or(AuthFailure::Missing)?;
        let credential = ApiKeyCredential::parse(raw, &self.format)?;

        let Some(key) = self
            .repository
            .find_enabled_by_prefix(credential.prefix())
            .await?
        else {
            debug!(prefix = credential.prefix(), "No enabled API key for prefix");
            return Err(AuthFailure::NotFoundOrDisabled.into());
        };

        if !verify_key(credential.as_str(), key.key_hash()) {
            debug!(prefix = credential.prefix(), "API key hash mismatch");
            return Err(AuthFailure::NotFoundOrDisabled.into());
        }

        let repository = self.repository.clone();
        let id = *key.id();
        self.background
            .spawn(LAST_USED_TASK, self.last_used_timeout, async move {
                repository.update_last_used(&id, Utc::now()).await
            });

        Ok(AuthenticatedKey::from(&key))
    }
}
