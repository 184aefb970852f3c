//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health, /health/ready, /api/health
//!
//! # Catalog
//! GET    /api/categories
//! GET    /api/products                  - filters, sort, pagination
//! GET    /api/products/search?q=
//! GET    /api/products/{slug}
//!
//! # Cart (session)
//! GET    /api/cart
//! DELETE /api/cart
//! POST   /api/cart/items
//! PATCH  /api/cart/items/{variant_id}
//! DELETE /api/cart/items/{variant_id}
//!
//! # Orders
//! POST   /api/checkout
//! GET    /api/orders/track?order_number=&phone=
//! GET    /api/orders/{order_number}     - owner only
//!
//! # Auth (rate limited)
//! POST   /api/auth/register, /api/auth/login, /api/auth/logout
//! POST   /api/auth/forgot-password, /api/auth/reset-password
//! GET    /api/auth/session
//!
//! # Account (requires auth)
//! GET|PUT       /api/user/profile
//! GET           /api/user/orders
//! GET|POST      /api/user/addresses
//! PUT|DELETE    /api/user/addresses/{id}
//! DELETE        /api/user/account
//!
//! # Shipping
//! POST|GET /api/shipping/calculate
//! GET      /api/shipping/zones
//!
//! # Payments (requires auth)
//! POST   /api/payments/razorpay/orders
//! POST   /api/payments/razorpay/verify
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod health;
pub mod orders;
pub mod payments;
pub mod shipping;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use crate::middleware::rate_limit::{RateLimitConfigError, api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Register, login and password resets, behind the strict limiter.
fn credential_routes() -> Result<Router<AppState>, RateLimitConfigError> {
    Ok(Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .layer(auth_rate_limiter()?))
}

fn auth_routes() -> Result<Router<AppState>, RateLimitConfigError> {
    Ok(credential_routes()?
        .route("/logout", post(auth::logout))
        .route("/session", get(auth::current)))
}

fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(catalog::categories))
        .route("/products", get(catalog::list))
        .route("/products/search", get(catalog::search))
        .route("/products/{slug}", get(catalog::show))
}

fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add_item))
        .route(
            "/items/{variant_id}",
            patch(cart::update_item).delete(cart::remove_item),
        )
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/track", get(orders::track))
        .route("/{order_number}", get(orders::show))
}

fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(account::profile).put(account::update_profile),
        )
        .route("/orders", get(account::orders))
        .route(
            "/addresses",
            get(account::addresses).post(account::create_address),
        )
        .route(
            "/addresses/{id}",
            put(account::update_address).delete(account::delete_address),
        )
        .route("/account", delete(account::delete_account))
}

fn shipping_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/calculate",
            post(shipping::calculate).get(shipping::check),
        )
        .route("/zones", get(shipping::zones))
}

fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/razorpay/orders", post(payments::create_order))
        .route("/razorpay/verify", post(payments::verify))
}

/// Everything under `/api`, behind the general limiter.
///
/// # Errors
///
/// Returns an error if a rate limiter quota is rejected.
pub fn api_routes() -> Result<Router<AppState>, RateLimitConfigError> {
    Ok(Router::new()
        .route("/health", get(health::report))
        .merge(catalog_routes())
        .route("/checkout", post(checkout::place_order))
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .nest("/auth", auth_routes()?)
        .nest("/user", account_routes())
        .nest("/shipping", shipping_routes())
        .nest("/payments", payment_routes())
        .layer(api_rate_limiter()?))
}

/// The full storefront router, before session and outer layers.
///
/// # Errors
///
/// Returns an error if a rate limiter quota is rejected.
pub fn routes() -> Result<Router<AppState>, RateLimitConfigError> {
    Ok(Router::new()
        .route("/health", get(health::live))
        .route("/health/ready", get(health::ready))
        .nest("/api", api_routes()?))
}
