//! Production queue and ingredient requirements.

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::{debug, instrument};

use cozycat_core::{OrderId, OrderStatus};

use crate::db::OrderRepository;
use crate::error::Result;
use crate::middleware::RequireStaff;
use crate::models::StatusUpdate;
use crate::routes::orders::change_order_status;
use crate::services::production::{build_queue, pending_requirements};
use crate::state::AppState;

/// GET /api/operations/production-queue
///
/// Orders waiting for the kitchen, oldest first, each with its ingredient
/// requirements and whether current stock covers them.
#[instrument(skip(state, _staff))]
pub async fn queue(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let repo = OrderRepository::new(state.pool());
    let orders = repo.production_queue().await?;
    let recipes = repo.recipe_lines().await?;

    let entries = build_queue(orders, &recipes);
    debug!(orders = entries.len(), "Production queue built");
    Ok(Json(entries))
}

/// GET /api/operations/production-queue/requirements
#[instrument(skip(state, _staff))]
pub async fn requirements(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let repo = OrderRepository::new(state.pool());
    let pending = repo.details_with_status(&[OrderStatus::Pending]).await?;
    let recipes = repo.recipe_lines().await?;
    Ok(Json(pending_requirements(&pending, &recipes)))
}

/// PATCH /api/operations/orders/{id}/status
#[instrument(skip(state, staff), fields(staff = %staff.id))]
pub async fn update_order_status(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(update): Json<StatusUpdate<OrderStatus>>,
) -> Result<impl IntoResponse> {
    change_order_status(&state, id, update.status, staff.id).await
}
