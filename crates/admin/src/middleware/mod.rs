//! HTTP middleware for the console.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers
//! 2. `TraceLayer`
//! 3. Request ID
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Role checks happen in the [`auth`] extractors.

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{RequireAdmin, RequireStaff, clear_current_staff, set_current_staff};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
