//! Domain models for the storefront.
//!
//! Rows map straight into these types through `sqlx::FromRow`; the id,
//! money and status newtypes from `cozycat-core` decode themselves.

pub mod catalog;
pub mod customer;
pub mod order;
pub mod session;
pub mod user;

pub use catalog::{
    Category, Product, ProductDetail, ProductFilter, ProductSort, PurchasableVariant, Variant,
};
pub use customer::{Address, AddressInput, Customer};
pub use order::{
    CustomerSnapshot, NewOrder, NewOrderItem, Order, OrderDetail, OrderItem, OrderSummary,
};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{Profile, User};
