//! Types stored in the session.

use serde::{Deserialize, Serialize};

use cozycat_core::{Email, ProfileRole, UserId};

/// Session-stored user identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    pub full_name: String,
    pub role: ProfileRole,
}

/// Session keys.
pub mod keys {
    /// The logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// The shopping cart (`cozycat_core::cart::Cart`).
    pub const CART: &str = "cart";
}
