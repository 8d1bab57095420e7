//! Operator authentication extractor
//!
//! Admin routes require `Authorization: Bearer <jwt>` signed by the
//! identity provider that serves the console.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::infrastructure::auth::OperatorClaims;

/// Extractor that requires a verified operator token
#[derive(Debug, Clone)]
pub struct RequireOperator(pub OperatorClaims);

impl RequireOperator {
    pub fn operator(&self) -> &str {
        self.0.operator()
    }
}

impl FromRequestParts<AppState> for RequireOperator {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Operator token required"))?;

        let claims = state.jwt_service.verify(token).map_err(|e| {
            debug!(error = %e, "Operator token rejected");
            ApiError::unauthorized("Invalid or expired operator token")
        })?;

        Ok(RequireOperator(claims))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
