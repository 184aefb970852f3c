//! `CozyCat` admin library.
//!
//! Two JSON APIs behind one staff login:
//! - `/api/admin/*` for admins: dashboard, orders, catalog, users, analytics
//! - `/api/operations/*` for admins and operations staff: production queue,
//!   batches, deliveries, inventory and the live event feed
//!
//! Bind it to a private network; it can change every order and price.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
