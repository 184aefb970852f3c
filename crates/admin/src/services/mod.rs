//! Business logic for the console.
//!
//! # Services
//!
//! - `analytics` - cached reports and CSV export (moka)
//! - `auth` - staff login with argon2 password hashes
//! - `email` - low-stock alerts over SMTP
//! - `events` - live operations events for SSE
//! - `inventory` - stock levels and reorder list
//! - `production` - ingredient requirements for the kitchen queue

pub mod analytics;
pub mod auth;
pub mod email;
pub mod events;
pub mod inventory;
pub mod production;

pub use analytics::{AnalyticsCache, AnalyticsService};
pub use auth::{AuthError, AuthService};
pub use email::{EmailError, EmailService};
pub use events::{EventBus, OperationsEvent};
pub use inventory::InventoryReport;
