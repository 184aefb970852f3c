//! HTTP route handlers for the console.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health, /health/ready, /api/health
//!
//! # Auth
//! POST   /api/auth/login, /api/auth/logout
//! GET    /api/auth/session
//!
//! # Admin (role admin)
//! GET    /api/admin/dashboard
//! POST   /api/admin/orders/paginated
//! GET    /api/admin/orders/{id}
//! PATCH  /api/admin/orders/{id}/status
//! GET|POST      /api/admin/products
//! PUT|DELETE    /api/admin/products/{id}
//! POST          /api/admin/products/{id}/variants
//! PUT|DELETE    /api/admin/variants/{id}
//! GET|POST      /api/admin/categories
//! GET           /api/admin/users
//! PATCH         /api/admin/users/{id}
//! POST          /api/admin/users/repair-profiles
//! POST          /api/admin/analytics
//! GET           /api/admin/analytics/export
//! POST          /api/admin/cache/clear
//!
//! # Operations (role admin or operations)
//! GET    /api/operations/production-queue
//! GET    /api/operations/production-queue/requirements
//! PATCH  /api/operations/orders/{id}/status
//! GET    /api/operations/events                 - SSE
//! GET|POST      /api/operations/batches
//! PATCH         /api/operations/batches/{id}/status
//! GET|POST      /api/operations/deliveries
//! PATCH         /api/operations/deliveries/{id}/assign
//! PATCH         /api/operations/deliveries/{id}/status
//! GET|POST      /api/operations/delivery-partners
//! PUT           /api/operations/delivery-partners/{id}
//! GET|POST      /api/operations/vendors
//! PUT           /api/operations/vendors/{id}
//! GET|POST      /api/operations/ingredients
//! GET|PUT       /api/operations/ingredients/{id}
//! GET           /api/operations/inventory
//! POST          /api/operations/inventory/low-stock-alert
//! GET|POST      /api/operations/recipes
//! PUT|DELETE    /api/operations/recipes/{id}
//! ```

pub mod analytics;
pub mod auth;
pub mod catalog;
pub mod dashboard;
pub mod health;
pub mod operations;
pub mod orders;
pub mod users;

use axum::{
    Router,
    routing::{get, patch, post, put},
};

use crate::state::AppState;

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/session", get(auth::current))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard::show))
        .route("/orders/paginated", post(orders::paginated))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", patch(orders::update_status))
        .route("/products", get(catalog::products).post(catalog::create_product))
        .route(
            "/products/{id}",
            put(catalog::update_product).delete(catalog::deactivate_product),
        )
        .route("/products/{id}/variants", post(catalog::add_variant))
        .route(
            "/variants/{id}",
            put(catalog::update_variant).delete(catalog::delete_variant),
        )
        .route(
            "/categories",
            get(catalog::categories).post(catalog::create_category),
        )
        .route("/users", get(users::list))
        .route("/users/{id}", patch(users::update))
        .route("/users/repair-profiles", post(users::repair_profiles))
        .route("/analytics", post(analytics::report))
        .route("/analytics/export", get(analytics::export))
        .route("/cache/clear", post(analytics::clear_cache))
}

fn operations_routes() -> Router<AppState> {
    use operations::{batches, deliveries, events, inventory, production};

    Router::new()
        .route("/production-queue", get(production::queue))
        .route(
            "/production-queue/requirements",
            get(production::requirements),
        )
        .route("/orders/{id}/status", patch(production::update_order_status))
        .route("/events", get(events::stream))
        .route("/batches", get(batches::list).post(batches::create))
        .route("/batches/{id}/status", patch(batches::update_status))
        .route("/deliveries", get(deliveries::list).post(deliveries::create))
        .route("/deliveries/{id}/assign", patch(deliveries::assign))
        .route("/deliveries/{id}/status", patch(deliveries::update_status))
        .route(
            "/delivery-partners",
            get(deliveries::partners).post(deliveries::create_partner),
        )
        .route("/delivery-partners/{id}", put(deliveries::update_partner))
        .route(
            "/vendors",
            get(inventory::vendors).post(inventory::create_vendor),
        )
        .route("/vendors/{id}", put(inventory::update_vendor))
        .route(
            "/ingredients",
            get(inventory::ingredients).post(inventory::create_ingredient),
        )
        .route(
            "/ingredients/{id}",
            get(inventory::ingredient).put(inventory::update_ingredient),
        )
        .route("/inventory", get(inventory::overview))
        .route("/inventory/low-stock-alert", post(inventory::low_stock_alert))
        .route(
            "/recipes",
            get(inventory::recipes).post(inventory::create_recipe),
        )
        .route(
            "/recipes/{id}",
            put(inventory::update_recipe).delete(inventory::delete_recipe),
        )
}

/// Everything under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::report))
        .nest("/auth", auth_routes())
        .nest("/admin", admin_routes())
        .nest("/operations", operations_routes())
}

/// Liveness and readiness checks at the root.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::live))
        .route("/health/ready", get(health::ready))
}
