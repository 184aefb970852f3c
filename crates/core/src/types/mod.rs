//! Core types for CozyCat Kitchen.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod contact;
pub mod email;
pub mod id;
pub mod money;
pub mod status;

pub use contact::{ContactError, Phone, Pincode};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::Money;
pub use status::*;
