//! Cart route handlers.
//!
//! The cart is a [`Cart`] value stored in the session. Names and prices
//! always come from the catalog, never from the request.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use cozycat_core::cart::{Cart, CartItem};
use cozycat_core::validation::{self, MAX_ITEM_QUANTITY, ValidationError};
use cozycat_core::{Money, VariantId};

use crate::db::CatalogRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::session_keys;
use crate::state::AppState;

/// Cart as returned to the client.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub total_items: u32,
    pub items_count: usize,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub free_delivery_threshold: Money,
    pub is_free_delivery: bool,
    pub amount_for_free_delivery: Money,
    /// Names of lines dropped because they are no longer sold.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<String>,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items().to_vec(),
            total_items: cart.total_items(),
            items_count: cart.items_count(),
            subtotal: cart.subtotal(),
            delivery_fee: cart.delivery_fee(),
            total: cart.total(),
            free_delivery_threshold: Cart::free_delivery_threshold(),
            is_free_delivery: cart.is_free_delivery(),
            amount_for_free_delivery: cart.amount_for_free_delivery(),
            removed: Vec::new(),
        }
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// The session cart, empty when none has been stored.
pub(crate) async fn load_cart(session: &Session) -> Cart {
    session
        .get::<Cart>(session_keys::CART)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

pub(crate) async fn save_cart(
    session: &Session,
    cart: &Cart,
) -> std::result::Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART, cart).await
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub variant_id: VariantId,
    #[serde(default = "one")]
    pub quantity: i64,
}

const fn one() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

/// Reject an add that would take one line past [`MAX_ITEM_QUANTITY`].
fn check_line_total(in_cart: u32, adding: u32) -> std::result::Result<(), ValidationError> {
    if in_cart.saturating_add(adding) > MAX_ITEM_QUANTITY {
        return Err(ValidationError::new(
            "quantity",
            format!("at most {MAX_ITEM_QUANTITY} of one item per order"),
        ));
    }
    Ok(())
}

/// Set a line's quantity; zero or less removes it.
fn set_quantity(cart: &mut Cart, variant_id: VariantId, quantity: i64) -> Result<()> {
    if quantity > i64::from(MAX_ITEM_QUANTITY) {
        return Err(ValidationError::new(
            "quantity",
            format!("must be between 1 and {MAX_ITEM_QUANTITY}"),
        )
        .into());
    }
    if !cart.update_quantity(variant_id, quantity) {
        return Err(AppError::NotFound("Cart item".to_string()));
    }
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/cart
///
/// Refreshes prices from the catalog and drops lines that are no longer sold.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<impl IntoResponse> {
    let mut cart = load_cart(&session).await;
    if !cart.has_items() {
        return Ok(Json(CartView::from(&cart)));
    }

    let ids: Vec<VariantId> = cart.items().iter().map(|i| i.variant_id).collect();
    let current = CatalogRepository::new(state.pool())
        .purchasable_variants(&ids)
        .await?;
    let prices: HashMap<_, _> = current.iter().map(|v| (v.variant_id, v.price)).collect();
    let images: HashMap<_, _> = current
        .iter()
        .filter_map(|v| v.image_url.clone().map(|url| (v.product_id, url)))
        .collect();

    let before = cart.clone();
    let removed = cart.reprice(&prices);
    cart.attach_images(&images);
    if cart != before {
        save_cart(&session, &cart).await?;
    }

    let mut view = CartView::from(&cart);
    view.removed = removed.into_iter().map(|i| i.product_name).collect();
    Ok(Json(view))
}

/// POST /api/cart/items
#[instrument(skip(state, session))]
pub async fn add_item(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<AddItemRequest>,
) -> Result<impl IntoResponse> {
    let quantity = validation::item_quantity(req.quantity)?;

    let variant = CatalogRepository::new(state.pool())
        .purchasable_variants(&[req.variant_id])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    let mut cart = load_cart(&session).await;
    check_line_total(
        cart.item_quantity(variant.product_id, variant.variant_id),
        quantity,
    )?;

    cart.add_item(CartItem {
        product_id: variant.product_id,
        variant_id: variant.variant_id,
        product_name: variant.product_name.clone(),
        weight_grams: variant.weight_grams,
        price: variant.price,
        quantity,
        sku: variant.sku,
        product_image: variant.image_url,
    });
    save_cart(&session, &cart).await?;

    add_breadcrumb(
        "cart",
        "Added item",
        Some(&[("product", variant.product_name.as_str())]),
    );

    Ok(Json(CartView::from(&cart)))
}

/// PATCH /api/cart/items/{variant_id}
///
/// A quantity of zero or less removes the line.
#[instrument(skip(session))]
pub async fn update_item(
    session: Session,
    Path(variant_id): Path<VariantId>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<impl IntoResponse> {
    let mut cart = load_cart(&session).await;
    set_quantity(&mut cart, variant_id, req.quantity)?;
    save_cart(&session, &cart).await?;

    Ok(Json(CartView::from(&cart)))
}

/// DELETE /api/cart/items/{variant_id}
#[instrument(skip(session))]
pub async fn remove_item(
    session: Session,
    Path(variant_id): Path<VariantId>,
) -> Result<impl IntoResponse> {
    let mut cart = load_cart(&session).await;
    if !cart.remove_item(variant_id) {
        return Err(AppError::NotFound("Cart item".to_string()));
    }
    save_cart(&session, &cart).await?;

    Ok(Json(CartView::from(&cart)))
}

/// DELETE /api/cart
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<impl IntoResponse> {
    let mut cart = load_cart(&session).await;
    cart.clear();
    save_cart(&session, &cart).await?;

    Ok(Json(CartView::from(&cart)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
        routing::{get, patch},
    };
    use cozycat_core::ProductId;
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;

    fn fish_fiesta(variant_id: VariantId, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::generate(),
            variant_id,
            product_name: "Fish Fiesta".to_string(),
            weight_grams: 250,
            price: Money::from_rupees(180),
            quantity,
            sku: None,
            product_image: None,
        }
    }

    #[test]
    fn test_cart_view_totals() {
        let mut cart = Cart::new();
        cart.add_item(fish_fiesta(VariantId::generate(), 2));

        let view = CartView::from(&cart);
        assert_eq!(view.total_items, 2);
        assert_eq!(view.subtotal, Money::from_rupees(360));
        assert_eq!(view.delivery_fee, Money::from_rupees(40));
        assert_eq!(view.total, Money::from_rupees(400));
        assert_eq!(view.amount_for_free_delivery, Money::from_rupees(140));
        assert!(!view.is_free_delivery);
    }

    #[test]
    fn test_add_request_defaults_to_one() {
        let id = VariantId::generate();
        let req: AddItemRequest =
            serde_json::from_value(serde_json::json!({ "variant_id": id.to_string() }))
                .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(req.quantity, 1);
        assert_eq!(req.variant_id, id);
    }

    #[test]
    fn test_merged_line_is_capped() {
        assert!(check_line_total(0, MAX_ITEM_QUANTITY).is_ok());
        assert!(check_line_total(60, 40).is_ok());

        let err = check_line_total(60, 41).unwrap_err();
        assert_eq!(err.field, "quantity");
        assert!(check_line_total(u32::MAX, 1).is_err());
    }

    #[test]
    fn test_set_quantity() {
        let id = VariantId::generate();
        let mut cart = Cart::new();
        cart.add_item(fish_fiesta(id, 2));

        set_quantity(&mut cart, id, 5).unwrap();
        assert_eq!(cart.total_items(), 5);

        let too_many = set_quantity(&mut cart, id, 101).unwrap_err();
        assert!(matches!(too_many, AppError::Validation(_)));
        assert_eq!(cart.total_items(), 5);

        let missing = set_quantity(&mut cart, VariantId::generate(), 1).unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));

        set_quantity(&mut cart, id, -3).unwrap();
        assert!(!cart.has_items());
    }

    async fn seed_cart(session: Session, Path(variant_id): Path<VariantId>) -> StatusCode {
        let mut cart = Cart::new();
        cart.add_item(fish_fiesta(variant_id, 3));
        save_cart(&session, &cart).await.unwrap();
        StatusCode::NO_CONTENT
    }

    fn app() -> Router {
        Router::new()
            .route("/seed/{variant_id}", get(seed_cart))
            .route("/api/cart/items/{variant_id}", patch(update_item))
            .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false))
    }

    async fn patch_quantity(
        app: &Router,
        cookie: &str,
        variant_id: VariantId,
        quantity: i64,
    ) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(
                Request::patch(format!("/api/cart/items/{variant_id}"))
                    .header(header::COOKIE, cookie)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::json!({ "quantity": quantity }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 16 * 1024).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_patch_to_zero_removes_line() {
        let app = app();
        let id = VariantId::generate();
        let response = app
            .clone()
            .oneshot(Request::get(format!("/seed/{id}")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = response.headers().get(header::SET_COOKIE).unwrap();
        let cookie = cookie.to_str().unwrap().split(';').next().unwrap().to_string();

        let (status, body) = patch_quantity(&app, &cookie, id, 7).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_items"], 7);

        let (status, _) = patch_quantity(&app, &cookie, id, 150).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = patch_quantity(&app, &cookie, id, 0).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_items"], 0);
        assert!(body["items"].as_array().unwrap().is_empty());

        let (status, _) = patch_quantity(&app, &cookie, id, 1).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
