//! Accounts as the admin user list sees them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cozycat_core::{ProfileRole, UserId};

/// A profile joined with its login email.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Profile {
    pub id: UserId,
    pub role: ProfileRole,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub login_email: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filters for the paginated user list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileFilter {
    pub search: Option<String>,
    pub role: Option<ProfileRole>,
}

/// Partial profile update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub role: Option<ProfileRole>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}
