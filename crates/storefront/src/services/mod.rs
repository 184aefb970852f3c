//! Business logic services for the storefront.
//!
//! - `auth` - email and password accounts (argon2)
//! - `catalog` - cached catalog reads (moka)
//! - `checkout` - pricing a cart into an order
//! - `email` - order confirmations and password resets (lettre)
//! - `payments` - Razorpay gateway client

pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod email;
pub mod payments;
