//! Session-related types for console authentication.

use serde::{Deserialize, Serialize};

use cozycat_core::{Email, ProfileRole, UserId};

/// Session-stored staff identity.
///
/// Only admin and operations profiles can log in, so `role` is always
/// one of those two.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentStaff {
    pub id: UserId,
    pub email: Email,
    pub full_name: String,
    pub role: ProfileRole,
}

impl CurrentStaff {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == ProfileRole::Admin
    }
}

/// Session keys for console authentication data.
pub mod keys {
    /// Key for storing the logged-in staff member.
    pub const CURRENT_STAFF: &str = "current_staff";
}
