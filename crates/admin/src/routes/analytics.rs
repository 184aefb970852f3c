//! Analytics reports, CSV export and cache control.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{info, instrument};

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::analytics::AnalyticsRequest;
use crate::services::AnalyticsService;
use crate::state::AppState;

/// POST /api/admin/analytics
#[instrument(skip(state, _admin), fields(kind = %request.kind))]
pub async fn report(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(request): Json<AnalyticsRequest>,
) -> Result<impl IntoResponse> {
    let response = AnalyticsService::new(state.pool(), state.analytics_cache())
        .run(&request)
        .await?;
    Ok(Json(response))
}

/// GET /api/admin/analytics/export?type=...
#[instrument(skip(state, _admin), fields(kind = %request.kind))]
pub async fn export(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(request): Query<AnalyticsRequest>,
) -> Result<Response> {
    let csv = AnalyticsService::new(state.pool(), state.analytics_cache())
        .export_csv(&request)
        .await?;

    let (start, end) = request.date_window(Utc::now().date_naive());
    let disposition = format!(
        "attachment; filename=\"analytics-{}-{start}-{end}.csv\"",
        request.kind
    );

    Ok((
        StatusCode::OK,
        [
            ("Content-Type", "text/csv; charset=utf-8"),
            ("Content-Disposition", disposition.as_str()),
        ],
        csv,
    )
        .into_response())
}

/// POST /api/admin/cache/clear
#[instrument(skip(state, _admin))]
pub async fn clear_cache(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let cleared = state.analytics_cache().clear();
    info!(cleared, "Analytics cache cleared");
    Ok(Json(serde_json::json!({ "cleared": cleared })))
}
