//! Order lookup: the owner's order page and guest tracking.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use cozycat_core::Phone;

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::OrderDetail;
use crate::models::order::tracking_timeline;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TrackQuery {
    pub order_number: String,
    pub phone: String,
}

fn with_timeline(detail: &OrderDetail) -> serde_json::Value {
    serde_json::json!({
        "order": detail,
        "timeline": tracking_timeline(detail.order.status),
    })
}

/// GET /api/orders/track?order_number=..&phone=..
///
/// Guests look up an order with the phone number they checked out with.
/// A wrong phone and an unknown order number both answer 404.
#[instrument(skip(state, query), fields(order_number = %query.order_number))]
pub async fn track(
    State(state): State<AppState>,
    Query(query): Query<TrackQuery>,
) -> Result<impl IntoResponse> {
    let order_number = query.order_number.trim();
    if order_number.is_empty() {
        return Err(AppError::BadRequest("Order number is required".to_string()));
    }
    let phone = Phone::parse(&query.phone)
        .map_err(|_| AppError::BadRequest("Enter the phone number used at checkout".to_string()))?;

    let detail = OrderRepository::new(state.pool())
        .track(order_number, phone.national_number())
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

    Ok(Json(with_timeline(&detail)))
}

/// GET /api/orders/{order_number}
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_number): Path<String>,
) -> Result<impl IntoResponse> {
    let detail = OrderRepository::new(state.pool())
        .find_for_user(&order_number, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

    Ok(Json(with_timeline(&detail)))
}
