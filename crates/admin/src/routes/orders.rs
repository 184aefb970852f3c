//! Admin order management.

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::{info, instrument};

use cozycat_core::pagination::{Page, PageRequest};
use cozycat_core::{OrderId, OrderStatus};

use crate::db::OrderRepository;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAdmin;
use crate::models::{OrderQuery, StatusUpdate};
use crate::services::OperationsEvent;
use crate::state::AppState;

/// POST /api/admin/orders/paginated
#[instrument(skip(state, _admin))]
pub async fn paginated(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(query): Json<OrderQuery>,
) -> Result<impl IntoResponse> {
    let page = PageRequest::new(query.page, query.limit);
    let (rows, total) = OrderRepository::new(state.pool())
        .paginated(&query, page)
        .await?;
    Ok(Json(Page::new(rows, page, total)))
}

/// GET /api/admin/orders/{id}
#[instrument(skip(state, _admin))]
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<impl IntoResponse> {
    let detail = OrderRepository::new(state.pool()).get_detail(id).await?;
    Ok(Json(detail))
}

/// PATCH /api/admin/orders/{id}/status
#[instrument(skip(state, admin), fields(admin = %admin.id))]
pub async fn update_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(update): Json<StatusUpdate<OrderStatus>>,
) -> Result<impl IntoResponse> {
    change_order_status(&state, id, update.status, admin.id).await
}

/// Shared by the admin and operations status endpoints.
pub(crate) async fn change_order_status(
    state: &AppState,
    id: OrderId,
    next: OrderStatus,
    actor: cozycat_core::UserId,
) -> Result<Json<crate::models::Order>> {
    let transition = OrderRepository::new(state.pool())
        .transition(id, next, actor)
        .await?;

    info!(
        order_number = %transition.order.order_number,
        from = %transition.previous,
        to = %next,
        deducted = transition.deducted.len(),
        "Order status changed"
    );
    add_breadcrumb(
        "order",
        "status changed",
        Some(&[
            ("order_number", &transition.order.order_number),
            ("status", next.as_str()),
        ]),
    );
    state
        .events()
        .publish(OperationsEvent::order_changed(&transition, actor));

    Ok(Json(transition.order))
}
