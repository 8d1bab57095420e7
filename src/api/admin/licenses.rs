//! License administration endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::api::middleware::RequireOperator;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, ValidatedJson};
use crate::domain::license::{
    License, LicenseId, LicenseStatus, ListParams, SortField, SortOrder, MAX_OFFSET,
};
use crate::infrastructure::license::{clamp_limit, CreateLicenseRequest, UpdateLicenseRequest};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLicenseBody {
    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "type is required"))]
    pub license_type: String,
    #[validate(length(min = 1, message = "product_name is required"))]
    pub product_name: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    #[validate(email(message = "customer_email must be a valid email"))]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub initial_status: Option<LicenseStatus>,
}

impl From<CreateLicenseBody> for CreateLicenseRequest {
    fn from(body: CreateLicenseBody) -> Self {
        Self {
            license_type: body.license_type,
            product_name: body.product_name,
            customer_name: body.customer_name,
            customer_email: body.customer_email,
            metadata: body.metadata,
            expires_at: body.expires_at,
            initial_status: body.initial_status,
        }
    }
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateLicenseBody {
    #[serde(default, rename = "type")]
    #[validate(length(min = 1, message = "type must not be empty"))]
    pub license_type: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "product_name must not be empty"))]
    pub product_name: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    #[validate(email(message = "customer_email must be a valid email"))]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl From<UpdateLicenseBody> for UpdateLicenseRequest {
    fn from(body: UpdateLicenseBody) -> Self {
        Self {
            license_type: body.license_type,
            product_name: body.product_name,
            customer_name: body.customer_name,
            customer_email: body.customer_email,
            expires_at: body.expires_at,
            metadata: body.metadata,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateStatusBody {
    #[validate(length(min = 1, message = "status is required"))]
    pub status: String,
}

/// Query string for `GET /licenses`. Unknown sort values fall back to the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListLicensesQuery {
    pub status: Option<String>,
    pub customer_email: Option<String>,
    pub product_name: Option<String>,
    #[serde(rename = "type")]
    pub license_type: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ListLicensesQuery {
    fn into_params(self) -> Result<ListParams, ApiError> {
        let status = self
            .status
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<LicenseStatus>())
            .transpose()?;

        let offset = self.offset.unwrap_or(0);
        if offset > MAX_OFFSET {
            return Err(ApiError::bad_request(format!(
                "offset must not exceed {}",
                MAX_OFFSET
            )));
        }

        Ok(ListParams {
            status,
            customer_email: self.customer_email.filter(|s| !s.is_empty()),
            product_name: self.product_name.filter(|s| !s.is_empty()),
            license_type: self.license_type.filter(|s| !s.is_empty()),
            limit: clamp_limit(self.limit),
            offset,
            sort_by: self
                .sort_by
                .as_deref()
                .and_then(SortField::parse)
                .unwrap_or_default(),
            sort_order: self
                .sort_order
                .as_deref()
                .and_then(SortOrder::parse)
                .unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LicenseResponse {
    pub id: Uuid,
    pub license_key: String,
    pub status: LicenseStatus,
    #[serde(rename = "type")]
    pub license_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    pub product_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&License> for LicenseResponse {
    fn from(license: &License) -> Self {
        Self {
            id: *license.id().as_uuid(),
            license_key: license.license_key().to_string(),
            status: license.status(),
            license_type: license.license_type().to_string(),
            customer_name: license.customer_name().map(String::from),
            customer_email: license.customer_email().map(String::from),
            product_name: license.product_name().to_string(),
            metadata: license.metadata().cloned(),
            issued_at: license.issued_at(),
            expires_at: license.expires_at(),
            created_at: license.created_at(),
            updated_at: license.updated_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub total: u64,
    pub limit: u32,
    pub offset: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListLicensesResponse {
    pub data: Vec<LicenseResponse>,
    pub pagination: Pagination,
}

/// POST /api/v1/licenses
pub async fn create_license(
    State(state): State<AppState>,
    operator: RequireOperator,
    ValidatedJson(body): ValidatedJson<CreateLicenseBody>,
) -> Result<(StatusCode, Json<LicenseResponse>), ApiError> {
    let license = state.license_service.create(body.into()).await?;

    info!(
        operator = %operator.operator(),
        license_id = %license.id(),
        "Operator created license"
    );

    Ok((StatusCode::CREATED, Json(LicenseResponse::from(&license))))
}

/// GET /api/v1/licenses
pub async fn list_licenses(
    State(state): State<AppState>,
    RequireOperator(_): RequireOperator,
    Query(query): Query<ListLicensesQuery>,
) -> Result<Json<ListLicensesResponse>, ApiError> {
    let params = query.into_params()?;
    debug!(?params, "Listing licenses");

    let page = state.license_service.list(params.clone()).await?;

    Ok(Json(ListLicensesResponse {
        data: page.items.iter().map(LicenseResponse::from).collect(),
        pagination: Pagination {
            total: page.total,
            limit: params.limit,
            offset: params.offset,
        },
    }))
}

/// GET /api/v1/licenses/{id}
pub async fn get_license(
    State(state): State<AppState>,
    RequireOperator(_): RequireOperator,
    Path(id): Path<String>,
) -> Result<Json<LicenseResponse>, ApiError> {
    let id: LicenseId = id.parse()?;
    let license = state.license_service.get(&id).await?;

    Ok(Json(LicenseResponse::from(&license)))
}

/// PATCH /api/v1/licenses/{id}
pub async fn update_license(
    State(state): State<AppState>,
    operator: RequireOperator,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateLicenseBody>,
) -> Result<Json<LicenseResponse>, ApiError> {
    let id: LicenseId = id.parse()?;
    let license = state.license_service.update(&id, body.into()).await?;

    info!(operator = %operator.operator(), license_id = %id, "Operator updated license");

    Ok(Json(LicenseResponse::from(&license)))
}

/// PATCH /api/v1/licenses/{id}/status
pub async fn update_license_status(
    State(state): State<AppState>,
    operator: RequireOperator,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateStatusBody>,
) -> Result<StatusCode, ApiError> {
    let id: LicenseId = id.parse()?;
    let status: LicenseStatus = body.status.parse()?;

    state.license_service.update_status(&id, status).await?;

    info!(
        operator = %operator.operator(),
        license_id = %id,
        status = %status,
        "Operator changed license status"
    );

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let params = ListLicensesQuery::default().into_params().unwrap();

        assert_eq!(params, ListParams::default());
    }

    #[test]
    fn test_query_unknown_sort_falls_back() {
        let query = ListLicensesQuery {
            sort_by: Some("license_key; DROP TABLE licenses".to_string()),
            sort_order: Some("sideways".to_string()),
            ..Default::default()
        };

        let params = query.into_params().unwrap();

        assert_eq!(params.sort_by, SortField::CreatedAt);
        assert_eq!(params.sort_order, SortOrder::Desc);
    }

    #[test]
    fn test_query_filters_and_paging() {
        let query = ListLicensesQuery {
            status: Some("revoked".to_string()),
            license_type: Some("trial".to_string()),
            customer_email: Some(String::new()),
            limit: Some(1000),
            offset: Some(40),
            sort_by: Some("expires_at".to_string()),
            sort_order: Some("ASC".to_string()),
            ..Default::default()
        };

        let params = query.into_params().unwrap();

        assert_eq!(params.status, Some(LicenseStatus::Revoked));
        assert_eq!(params.license_type.as_deref(), Some("trial"));
        assert_eq!(params.customer_email, None);
        assert_eq!(params.limit, 100);
        assert_eq!(params.offset, 40);
        assert_eq!(params.sort_by, SortField::ExpiresAt);
        assert_eq!(params.sort_order, SortOrder::Asc);
    }

    #[test]
    fn test_query_invalid_status_is_rejected() {
        let query = ListLicensesQuery {
            status: Some("paused".to_string()),
            ..Default::default()
        };

        let err = query.into_params().unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_query_offset_out_of_range_is_rejected() {
        let at_limit = ListLicensesQuery {
            offset: Some(MAX_OFFSET),
            ..Default::default()
        };
        assert_eq!(at_limit.into_params().unwrap().offset, MAX_OFFSET);

        let query = ListLicensesQuery {
            offset: Some(u64::MAX),
            ..Default::default()
        };

        let err = query.into_params().unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_create_body_validation() {
        let body: CreateLicenseBody = serde_json::from_value(serde_json::json!({
            "type": "",
            "product_name": "Agent",
            "customer_email": "not-an-email"
        }))
        .unwrap();

        let errors = body.validate().unwrap_err();
        let fields = errors.field_errors();

        assert_eq!(fields.len(), 2);
        assert!(fields.contains_key("customer_email"));
        assert!(!fields.contains_key("product_name"));
    }

    #[test]
    fn test_license_response_omits_absent_fields() {
        let license = License::new("key-1", "trial", "Agent", LicenseStatus::Pending);

        let json = serde_json::to_value(LicenseResponse::from(&license)).unwrap();

        assert_eq!(json["type"], "trial");
        assert_eq!(json["status"], "pending");
        assert!(json.get("issued_at").is_none());
        assert!(json.get("customer_email").is_none());
    }
}
