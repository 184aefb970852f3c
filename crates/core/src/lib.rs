//! CozyCat Core - Shared domain types and rules.
//!
//! This crate provides the types and pure business rules used across all
//! CozyCat Kitchen components:
//! - `storefront` - Customer-facing shop API (catalog, cart, checkout, tracking)
//! - `admin` - Admin dashboard and operations console API
//! - `cli` - Command-line tools for migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Everything here is deterministic and unit tested.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails, phones, pincodes and statuses
//! - [`cart`] - Shopping cart arithmetic and delivery fee rules
//! - [`shipping`] - Pincode serviceability and zone-based delivery quotes
//! - [`pagination`] - Page request clamping and pagination metadata
//! - [`validation`] - Form input rules shared by both servers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod pagination;
pub mod shipping;
pub mod types;
pub mod validation;

pub use types::*;
