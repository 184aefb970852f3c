//! Dashboard route handler.

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Serialize;
use tracing::instrument;

use crate::db::DashboardRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::dashboard::{
    ActivityItem, DashboardQuery, DashboardStats, OrderStatusStat, ProductPerformance,
};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub stats: DashboardStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_stats: Option<Vec<OrderStatusStat>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_performance: Option<Vec<ProductPerformance>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_activity: Option<Vec<ActivityItem>>,
}

/// GET /api/admin/dashboard
#[instrument(skip(state, _admin))]
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse> {
    let repo = DashboardRepository::new(state.pool());

    let stats = repo.stats().await?;
    let order_stats = if query.include_order_stats {
        Some(repo.order_stats().await?)
    } else {
        None
    };
    let product_performance = if query.include_product_performance {
        Some(repo.product_performance().await?)
    } else {
        None
    };
    let recent_activity = if query.include_activity {
        Some(repo.recent_activity(query.activity_limit()).await?)
    } else {
        None
    };

    Ok(Json(DashboardResponse {
        stats,
        order_stats,
        product_performance,
        recent_activity,
    }))
}
