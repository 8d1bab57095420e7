//! Operator dashboard summary

use std::collections::BTreeMap;

use axum::extract::State;
use serde::Serialize;

use crate::api::middleware::RequireOperator;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::license::{DashboardSummary, ExpiringLicense, LicenseStatus};
use crate::infrastructure::license::EXPIRING_SOON_DAYS;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummaryResponse {
    pub total_licenses: u64,
    /// Every status is listed, zero when no license has it
    pub status_counts: BTreeMap<&'static str, u64>,
    pub type_counts: BTreeMap<String, u64>,
    pub product_counts: BTreeMap<String, u64>,
    pub expiring_soon: ExpiringSoonSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringSoonSummary {
    pub count: u64,
    pub period_days: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_to_expire: Option<ExpiringLicense>,
}

impl From<DashboardSummary> for DashboardSummaryResponse {
    fn from(summary: DashboardSummary) -> Self {
        let status_counts = LicenseStatus::ALL
            .into_iter()
            .map(|status| {
                let count = summary.status_counts.get(&status).copied().unwrap_or(0);
                (status.as_str(), count)
            })
            .collect();

        Self {
            total_licenses: summary.total,
            status_counts,
            type_counts: summary.type_counts.into_iter().collect(),
            product_counts: summary.product_counts.into_iter().collect(),
            expiring_soon: ExpiringSoonSummary {
                count: summary.expiring_soon,
                period_days: EXPIRING_SOON_DAYS,
                next_to_expire: summary.next_to_expire,
            },
        }
    }
}

/// GET /api/v1/dashboard/summary
pub async fn get_summary(
    State(state): State<AppState>,
    RequireOperator(_): RequireOperator,
) -> Result<Json<DashboardSummaryResponse>, ApiError> {
    let summary = state.license_service.dashboard_summary().await?;

    Ok(Json(summary.into()))
}
