//! Database access for the admin console.
//!
//! ## Tables used
//!
//! - `users`, `profiles` - staff login and user management
//! - `categories`, `products`, `product_variants` - catalog management
//! - `customers`, `customer_addresses`, `orders`, `order_items` - order management
//! - `vendors`, `ingredients`, `product_recipes` - inventory and recipes
//! - `production_batches`, `delivery_partners`, `deliveries` - kitchen and dispatch
//! - `tower_sessions.session` - session storage
//!
//! The schema is shared with the storefront. Migrations live in the
//! workspace `migrations/` directory and run via:
//! ```bash
//! cargo run -p cozycat-cli -- migrate
//! ```

pub mod analytics;
pub mod batches;
pub mod catalog;
pub mod dashboard;
pub mod deliveries;
pub mod inventory;
pub mod orders;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use analytics::AnalyticsRepository;
pub use batches::BatchRepository;
pub use catalog::CatalogRepository;
pub use dashboard::DashboardRepository;
pub use deliveries::DeliveryRepository;
pub use inventory::InventoryRepository;
pub use orders::OrderRepository;
pub use users::UserRepository;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value failed to parse into its domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    #[error("not found")]
    NotFound,

    /// A uniqueness, reference or state constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Map a unique-violation into `Conflict`, everything else into `Database`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Map a foreign-key violation into `Conflict` with `message`.
pub(crate) fn conflict_on_reference(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_foreign_key_violation()
    {
        return RepositoryError::Conflict(message.to_string());
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// `BATCH-`/`DEL-` style numbers: a prefix and the last eight digits of the
/// current Unix time in milliseconds.
pub(crate) fn timestamp_number(prefix: &str, now: chrono::DateTime<chrono::Utc>) -> String {
    let millis = now.timestamp_millis().rem_euclid(100_000_000);
    format!("{prefix}-{millis:08}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_timestamp_number() {
        let now = chrono::Utc.timestamp_millis_opt(1_735_689_600_123).unwrap();
        assert_eq!(timestamp_number("BATCH", now), "BATCH-89600123");
        assert_eq!(timestamp_number("DEL", now), "DEL-89600123");
    }

    #[test]
    fn test_timestamp_number_pads() {
        let now = chrono::Utc.timestamp_millis_opt(1_700_000_000_042).unwrap();
        assert_eq!(timestamp_number("DEL", now), "DEL-00000042");
    }
}
