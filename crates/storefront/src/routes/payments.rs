//! Razorpay payment handlers.
//!
//! The browser opens the Razorpay widget with a gateway order created here,
//! then posts the widget's result back to `verify`.

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use cozycat_core::{PaymentMethod, PaymentStatus};

use crate::db::OrderRepository;
use crate::db::orders::Settlement;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::services::payments::{PaymentError, RazorpayClient};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub order_number: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

fn gateway(state: &AppState) -> Result<&RazorpayClient> {
    state
        .razorpay()
        .ok_or_else(|| AppError::Unavailable("Online payment is not available".to_string()))
}

/// POST /api/payments/razorpay/orders
#[instrument(skip(state, user))]
pub async fn create_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse> {
    let razorpay = gateway(&state)?;
    let orders = OrderRepository::new(state.pool());

    let detail = orders
        .find_for_user(&req.order_number, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
    let order = detail.order;

    if order.payment_method != PaymentMethod::Online {
        return Err(AppError::BadRequest(
            "This order is not paid online".to_string(),
        ));
    }
    if order.payment_status != PaymentStatus::Pending {
        return Err(AppError::Conflict("This order is already paid".to_string()));
    }

    let amount = order
        .total_amount
        .to_paise()
        .ok_or(PaymentError::AmountOutOfRange)?;
    let gateway_order = razorpay.create_order(amount, &order.order_number).await?;
    orders.set_gateway_order(order.id, &gateway_order.id).await?;

    info!(
        order_number = %order.order_number,
        gateway_order_id = %gateway_order.id,
        "Gateway order created"
    );

    Ok(Json(serde_json::json!({
        "key_id": razorpay.key_id(),
        "order": gateway_order,
    })))
}

/// POST /api/payments/razorpay/verify
#[instrument(skip(state, _user, req), fields(gateway_order_id = %req.razorpay_order_id))]
pub async fn verify(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<impl IntoResponse> {
    let razorpay = gateway(&state)?;

    if let Err(e) = razorpay.verify_signature(
        &req.razorpay_order_id,
        &req.razorpay_payment_id,
        &req.razorpay_signature,
    ) {
        warn!("Payment signature mismatch");
        return Err(e.into());
    }

    let payment = razorpay.fetch_payment(&req.razorpay_payment_id).await?;
    if payment.status != "captured" {
        return Err(PaymentError::NotCaptured(payment.status).into());
    }
    if payment.order_id.as_deref() != Some(req.razorpay_order_id.as_str()) {
        return Err(PaymentError::InvalidSignature.into());
    }

    let settlement = OrderRepository::new(state.pool())
        .mark_paid(&req.razorpay_order_id, &payment.id)
        .await?;

    let order = match settlement {
        Settlement::Captured(order) => {
            info!(order_number = %order.order_number, payment_id = %payment.id, "Payment captured");
            add_breadcrumb(
                "payment",
                "Payment captured",
                Some(&[("order_number", order.order_number.as_str())]),
            );
            order
        }
        Settlement::AlreadyPaid(order) => {
            info!(order_number = %order.order_number, "Payment already recorded");
            order
        }
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "order": order,
    })))
}
