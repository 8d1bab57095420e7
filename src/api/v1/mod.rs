//! Agent-facing API endpoints

pub mod licenses;

use axum::{routing::post, Router};

use super::state::AppState;

/// Routes called by agents with an API key
pub fn create_v1_router() -> Router<AppState> {
    Router::new().route("/licenses/validate", post(licenses::validate_license))
}
