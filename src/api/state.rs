//! Application state for shared services

use std::sync::Arc;

use crate::infrastructure::api_key::{ApiKeyAuthenticator, ApiKeyService};
use crate::infrastructure::auth::JwtService;
use crate::infrastructure::license::{LicenseService, LicenseValidator};

/// Services shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub license_service: Arc<LicenseService>,
    pub validator: Arc<LicenseValidator>,
    pub api_key_service: Arc<ApiKeyService>,
    pub authenticator: Arc<ApiKeyAuthenticator>,
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    pub fn new(
        license_service: Arc<LicenseService>,
        validator: Arc<LicenseValidator>,
        api_key_service: Arc<ApiKeyService>,
        authenticator: Arc<ApiKeyAuthenticator>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            license_service,
            validator,
            api_key_service,
            authenticator,
            jwt_service,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
