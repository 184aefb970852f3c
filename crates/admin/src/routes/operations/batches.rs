//! Production batches.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{info, instrument};

use cozycat_core::{BatchId, BatchStatus};

use crate::db::BatchRepository;
use crate::db::batches::BatchChange;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireStaff;
use crate::models::{NewBatch, StatusUpdate};
use crate::services::OperationsEvent;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BatchListQuery {
    pub status: Option<BatchStatus>,
}

/// GET /api/operations/batches
#[instrument(skip(state, _staff))]
pub async fn list(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<BatchListQuery>,
) -> Result<impl IntoResponse> {
    let batches = BatchRepository::new(state.pool()).list(query.status).await?;
    Ok(Json(batches))
}

fn publish_order_change(state: &AppState, change: &BatchChange, staff: cozycat_core::UserId) {
    if let Some(transition) = &change.order {
        state
            .events()
            .publish(OperationsEvent::order_changed(transition, staff));
    }
}

/// POST /api/operations/batches
///
/// Starts cooking: the batch begins `in_progress` and its order moves to
/// `in_production`, deducting ingredient stock.
#[instrument(skip(state, staff, input), fields(staff = %staff.id, order_id = %input.order_id))]
pub async fn create(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Json(input): Json<NewBatch>,
) -> Result<impl IntoResponse> {
    let change = BatchRepository::new(state.pool())
        .create(&input, staff.id)
        .await?;

    info!(batch_number = %change.batch.batch_number, "Batch created");
    add_breadcrumb(
        "batch",
        "created",
        Some(&[("batch_number", &change.batch.batch_number)]),
    );
    if let Some(event) = OperationsEvent::batch_created(&change.batch) {
        state.events().publish(event);
    }
    publish_order_change(&state, &change, staff.id);

    Ok((StatusCode::CREATED, Json(change.batch)))
}

/// PATCH /api/operations/batches/{id}/status
#[instrument(skip(state, staff), fields(staff = %staff.id))]
pub async fn update_status(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<BatchId>,
    Json(update): Json<StatusUpdate<BatchStatus>>,
) -> Result<impl IntoResponse> {
    let change = BatchRepository::new(state.pool())
        .update_status(id, update.status, staff.id)
        .await?;

    info!(
        batch_number = %change.batch.batch_number,
        status = %change.batch.status,
        "Batch status changed"
    );
    state
        .events()
        .publish(OperationsEvent::batch_changed(&change.batch));
    publish_order_change(&state, &change, staff.id);

    Ok(Json(change.batch))
}
