//! Operator endpoints for managing licenses and API keys

pub mod api_keys;
pub mod dashboard;
pub mod licenses;

use axum::{
    routing::{delete, get, patch},
    Router,
};

use super::state::AppState;

/// Routes guarded by an operator bearer token
pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        // License management
        .route(
            "/licenses",
            get(licenses::list_licenses).post(licenses::create_license),
        )
        .route(
            "/licenses/{id}",
            get(licenses::get_license).patch(licenses::update_license),
        )
        .route("/licenses/{id}/status", patch(licenses::update_license_status))
        // Dashboard
        .route("/dashboard/summary", get(dashboard::get_summary))
        // API key management
        .route(
            "/api-keys",
            get(api_keys::list_api_keys).post(api_keys::create_api_key),
        )
        .route("/api-keys/{id}", delete(api_keys::revoke_api_key))
}
