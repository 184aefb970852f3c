//! `CozyCat` storefront library.
//!
//! The customer-facing JSON API: catalog, session cart, checkout, order
//! tracking, accounts and Razorpay payments. Exposed as a library so the
//! binary stays thin and handlers can be tested in isolation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
