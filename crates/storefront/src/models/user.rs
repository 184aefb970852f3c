//! Account types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use cozycat_core::{Email, ProfileRole, UserId};

/// A login account.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub created_at: DateTime<Utc>,
}

/// Public profile attached one-to-one to a user.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Profile {
    pub id: UserId,
    pub role: ProfileRole,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
