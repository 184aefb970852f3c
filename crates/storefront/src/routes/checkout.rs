//! Checkout: turn the session cart into an order.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{error, info, instrument, warn};

use cozycat_core::{AddressId, PaymentMethod, VariantId};

use crate::db::orders::OrderAddress;
use crate::db::{CatalogRepository, CustomerRepository, OrderRepository, RepositoryError};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::models::{Address, AddressInput, CurrentUser, CustomerSnapshot, Order};
use crate::routes::cart::{load_cart, save_cart};
use crate::services::checkout::{
    CheckoutError, CustomerInfo, OrderOptions, PricedOrder, build_order, generate_order_number,
};
use crate::state::AppState;

/// Order-number collisions are retried this many times.
const ORDER_NUMBER_ATTEMPTS: usize = 3;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub customer: CustomerInfo,
    /// A saved address (logged-in customers only).
    pub address_id: Option<AddressId>,
    /// A new address, used when `address_id` is absent.
    pub address: Option<AddressInput>,
    /// Save `address` to the customer's address book.
    #[serde(default)]
    pub save_address: bool,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub preferred_delivery_date: Option<NaiveDate>,
}

fn address_input(address: Address) -> AddressInput {
    AddressInput {
        address_line1: address.address_line1,
        address_line2: address.address_line2,
        landmark: address.landmark,
        city: address.city,
        state: address.state,
        pincode: address.pincode.trim().to_string(),
        latitude: address.latitude,
        longitude: address.longitude,
        is_default: address.is_default,
        delivery_notes: address.delivery_notes,
    }
}

/// Where the confirmation email goes, if the customer gave an address.
fn confirmation_recipient(customer: &CustomerSnapshot) -> Option<&str> {
    customer
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
}

/// Which address book entry the order points at. Only members can save.
fn order_address(
    saved: Option<AddressId>,
    save_new: bool,
    address: &AddressInput,
) -> OrderAddress<'_> {
    match saved {
        Some(id) => OrderAddress::Saved(id),
        None if save_new => OrderAddress::SaveNew(address),
        None => OrderAddress::Unsaved,
    }
}

/// The delivery address for this checkout and the saved address id, if any.
async fn resolve_address(
    state: &AppState,
    user: Option<&CurrentUser>,
    req: &CheckoutRequest,
) -> Result<(AddressInput, Option<AddressId>)> {
    if let Some(address_id) = req.address_id {
        let user = user.ok_or_else(|| {
            AppError::Unauthorized("Log in to use a saved address".to_string())
        })?;
        let customers = CustomerRepository::new(state.pool());
        let customer = customers.ensure_for_user(user.id).await?;
        let address = customers
            .get_address(customer.id, address_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Address".to_string()))?;
        return Ok((address_input(address), Some(address_id)));
    }

    let address = req
        .address
        .clone()
        .ok_or_else(|| AppError::BadRequest("A delivery address is required".to_string()))?
        .validate()?;
    Ok((address, None))
}

/// POST /api/checkout
#[instrument(skip(state, session, user, req))]
pub async fn place_order(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(req): Json<CheckoutRequest>,
) -> Result<impl IntoResponse> {
    let mut cart = load_cart(&session).await;
    if !cart.has_items() {
        return Err(CheckoutError::EmptyCart.into());
    }

    let (address, address_id) = resolve_address(&state, user.as_ref(), &req).await?;
    let snapshot = req.customer.clone().into_snapshot(&address, user.is_none())?;

    let ids: Vec<VariantId> = cart.items().iter().map(|i| i.variant_id).collect();
    let variants = CatalogRepository::new(state.pool())
        .purchasable_variants(&ids)
        .await?;

    let options = OrderOptions {
        payment_method: req.payment_method,
        notes: req.notes.clone(),
        delivery_notes: address.delivery_notes.clone(),
        preferred_delivery_date: req.preferred_delivery_date,
    };
    let PricedOrder { mut order, quote } =
        build_order(&cart, &variants, snapshot, options, generate_order_number())?;
    if req.payment_method == PaymentMethod::Online && state.razorpay().is_none() {
        return Err(AppError::Unavailable(
            "Online payment is not available, please choose cash on delivery".to_string(),
        ));
    }

    let user_id = user.as_ref().map(|u| u.id);
    let book_entry = order_address(address_id, req.save_address && user_id.is_some(), &address);

    let orders = OrderRepository::new(state.pool());
    let mut attempt = 1;
    let placed: Order = loop {
        match orders.create(&order, user_id, book_entry).await {
            Ok(placed) => break placed,
            Err(RepositoryError::Conflict(_)) if attempt < ORDER_NUMBER_ATTEMPTS => {
                warn!(attempt, order_number = %order.order_number, "order number taken, retrying");
                attempt += 1;
                order.order_number = generate_order_number();
            }
            Err(e) => return Err(e.into()),
        }
    };

    cart.clear();
    save_cart(&session, &cart).await?;

    info!(
        order_number = %placed.order_number,
        total = %placed.total_amount,
        guest = user_id.is_none(),
        "Order placed"
    );
    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_number", placed.order_number.as_str())]),
    );

    if let (Some(mailer), Some(to)) = (state.email(), confirmation_recipient(&placed.customer_snapshot)) {
        let mailer = mailer.clone();
        let to = to.to_string();
        let order = placed.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send_order_confirmation(&to, &order).await {
                error!(
                    order_number = %order.order_number,
                    error = %e,
                    "Failed to send order confirmation"
                );
            }
        });
    }

    let razorpay_key_id = match placed.payment_method {
        PaymentMethod::Online => state.razorpay().map(|r| r.key_id().to_string()),
        PaymentMethod::Cod | PaymentMethod::Wallet => None,
    };

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "order": placed,
            "shipping": quote,
            "razorpay_key_id": razorpay_key_id,
        })),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req: CheckoutRequest = serde_json::from_value(serde_json::json!({
            "customer": { "first_name": "Asha", "phone": "9876543210" },
            "address": {
                "address_line1": "22 Hauz Khas Village",
                "city": "New Delhi",
                "state": "Delhi",
                "pincode": "110016"
            }
        }))
        .unwrap();
        assert_eq!(req.payment_method, PaymentMethod::Cod);
        assert!(!req.save_address);
        assert!(req.address_id.is_none());
    }

    fn doorstep() -> AddressInput {
        serde_json::from_value(serde_json::json!({
            "address_line1": "22 Hauz Khas Village",
            "city": "New Delhi",
            "state": "Delhi",
            "pincode": "110016"
        }))
        .unwrap()
    }

    #[test]
    fn test_new_address_is_saved_with_the_order() {
        let address = doorstep();
        let saved = AddressId::new(uuid::Uuid::new_v4());

        assert!(matches!(
            order_address(None, true, &address),
            OrderAddress::SaveNew(a) if a.pincode == "110016"
        ));
        assert!(matches!(order_address(None, false, &address), OrderAddress::Unsaved));
        assert!(matches!(
            order_address(Some(saved), true, &address),
            OrderAddress::Saved(id) if id == saved
        ));
    }

    #[test]
    fn test_confirmation_goes_to_checkout_email() {
        let mut customer = CustomerSnapshot {
            email: Some(" asha@example.in ".to_string()),
            ..CustomerSnapshot::default()
        };
        assert_eq!(confirmation_recipient(&customer), Some("asha@example.in"));

        customer.email = Some("   ".to_string());
        assert_eq!(confirmation_recipient(&customer), None);

        customer.email = None;
        assert_eq!(confirmation_recipient(&customer), None);
    }
}
