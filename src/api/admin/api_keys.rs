//! API key management admin endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::api::middleware::RequireOperator;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, ValidatedJson};
use crate::domain::api_key::{ApiKey, ApiKeyId};

/// Request to create a new API key
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateApiKeyRequest {
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    #[serde(default)]
    pub product_id: Option<Uuid>,
}

/// Creation response; the only place the full key ever appears
#[derive(Debug, Clone, Serialize)]
pub struct CreateApiKeyResponse {
    pub id: Uuid,
    pub full_key: String,
    pub prefix: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub prefix: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<Uuid>,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<&ApiKey> for ApiKeyResponse {
    fn from(key: &ApiKey) -> Self {
        Self {
            id: *key.id().as_uuid(),
            prefix: key.prefix().to_string(),
            description: key.description().to_string(),
            product_id: key.product_id(),
            is_enabled: key.is_enabled(),
            created_at: key.created_at(),
            last_used_at: key.last_used_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListApiKeysResponse {
    pub api_keys: Vec<ApiKeyResponse>,
    pub total: usize,
}

/// POST /api/v1/api-keys
pub async fn create_api_key(
    State(state): State<AppState>,
    operator: RequireOperator,
    ValidatedJson(request): ValidatedJson<CreateApiKeyRequest>,
) -> Result<(StatusCode, Json<CreateApiKeyResponse>), ApiError> {
    let result = state
        .api_key_service
        .create(request.description, request.product_id)
        .await?;

    let key = &result.api_key;
    info!(
        operator = %operator.operator(),
        prefix = %key.prefix(),
        "Operator created API key"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateApiKeyResponse {
            id: *key.id().as_uuid(),
            full_key: result.full_key,
            prefix: key.prefix().to_string(),
            description: key.description().to_string(),
            product_id: key.product_id(),
            created_at: key.created_at(),
        }),
    ))
}

/// GET /api/v1/api-keys
pub async fn list_api_keys(
    State(state): State<AppState>,
    RequireOperator(_): RequireOperator,
) -> Result<Json<ListApiKeysResponse>, ApiError> {
    debug!("Listing all API keys");

    let keys = state.api_key_service.list().await?;

    let api_keys: Vec<ApiKeyResponse> = keys.iter().map(ApiKeyResponse::from).collect();
    let total = api_keys.len();

    Ok(Json(ListApiKeysResponse { api_keys, total }))
}

/// DELETE /api/v1/api-keys/{id}
pub async fn revoke_api_key(
    State(state): State<AppState>,
    operator: RequireOperator,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: ApiKeyId = id.parse()?;

    state.api_key_service.revoke(&id).await?;

    info!(operator = %operator.operator(), api_key_id = %id, "Operator revoked API key");

    Ok(StatusCode::NO_CONTENT)
}
