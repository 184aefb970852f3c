//! Deliveries and delivery partners.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, instrument};

use cozycat_core::{DeliveryId, DeliveryPartnerId, DeliveryStatus};

use crate::db::DeliveryRepository;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireStaff;
use crate::models::{AssignPartner, DeliveryFilter, DeliveryPartnerInput, NewDelivery, StatusUpdate};
use crate::services::OperationsEvent;
use crate::state::AppState;

/// GET /api/operations/deliveries?status=&search=
#[instrument(skip(state, _staff))]
pub async fn list(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Query(filter): Query<DeliveryFilter>,
) -> Result<impl IntoResponse> {
    let views = DeliveryRepository::new(state.pool())
        .list_views(&filter)
        .await?;
    Ok(Json(views))
}

/// POST /api/operations/deliveries
#[instrument(skip(state, _staff, input), fields(batch_id = %input.batch_id))]
pub async fn create(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Json(input): Json<NewDelivery>,
) -> Result<impl IntoResponse> {
    let delivery = DeliveryRepository::new(state.pool()).create(&input).await?;

    info!(delivery_number = %delivery.delivery_number, "Delivery created");
    add_breadcrumb(
        "delivery",
        "created",
        Some(&[("delivery_number", &delivery.delivery_number)]),
    );
    state
        .events()
        .publish(OperationsEvent::delivery_created(&delivery));

    Ok((StatusCode::CREATED, Json(delivery)))
}

/// PATCH /api/operations/deliveries/{id}/assign
#[instrument(skip(state, _staff, input), fields(partner_id = %input.delivery_partner_id))]
pub async fn assign(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DeliveryId>,
    Json(input): Json<AssignPartner>,
) -> Result<impl IntoResponse> {
    let delivery = DeliveryRepository::new(state.pool())
        .assign(id, &input)
        .await?;

    info!(delivery_number = %delivery.delivery_number, "Delivery partner assigned");
    state
        .events()
        .publish(OperationsEvent::delivery_changed(&delivery));

    Ok(Json(delivery))
}

/// PATCH /api/operations/deliveries/{id}/status
#[instrument(skip(state, staff), fields(staff = %staff.id))]
pub async fn update_status(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DeliveryId>,
    Json(update): Json<StatusUpdate<DeliveryStatus>>,
) -> Result<impl IntoResponse> {
    let change = DeliveryRepository::new(state.pool())
        .update_status(id, update.status, staff.id)
        .await?;

    info!(
        delivery_number = %change.delivery.delivery_number,
        status = %change.delivery.status,
        "Delivery status changed"
    );
    let events = state.events();
    events.publish(OperationsEvent::delivery_changed(&change.delivery));
    if let Some(transition) = &change.order {
        events.publish(OperationsEvent::order_changed(transition, staff.id));
    }

    Ok(Json(change.delivery))
}

/// GET /api/operations/delivery-partners
#[instrument(skip(state, _staff))]
pub async fn partners(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let partners = DeliveryRepository::new(state.pool()).list_partners().await?;
    Ok(Json(partners))
}

/// POST /api/operations/delivery-partners
#[instrument(skip(state, _staff, input))]
pub async fn create_partner(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Json(input): Json<DeliveryPartnerInput>,
) -> Result<impl IntoResponse> {
    let phone = input.validate()?;
    let partner = DeliveryRepository::new(state.pool())
        .create_partner(&input, &phone)
        .await?;
    Ok((StatusCode::CREATED, Json(partner)))
}

/// PUT /api/operations/delivery-partners/{id}
#[instrument(skip(state, _staff, input))]
pub async fn update_partner(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DeliveryPartnerId>,
    Json(input): Json<DeliveryPartnerInput>,
) -> Result<impl IntoResponse> {
    let phone = input.validate()?;
    let partner = DeliveryRepository::new(state.pool())
        .update_partner(id, &input, &phone)
        .await?;
    Ok(Json(partner))
}
