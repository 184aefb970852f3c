//! User and profile repository.
//!
//! Staff login, the admin user list, and the account commands of the CLI.

use sqlx::{PgPool, Postgres, QueryBuilder};

use cozycat_core::pagination::PageRequest;
use cozycat_core::{Email, ProfileRole, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Profile, ProfileFilter, ProfileUpdate};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Login lookup; the profile columns are `None` when the profile row is missing.
#[derive(Debug, sqlx::FromRow)]
pub struct CredentialRow {
    pub id: UserId,
    pub password_hash: String,
    pub role: Option<ProfileRole>,
    pub full_name: Option<String>,
}

const PROFILE_SELECT: &str = "SELECT p.id, p.role, p.full_name, p.phone, p.email, \
     u.email AS login_email, p.avatar_url, p.created_at, p.updated_at \
     FROM profiles p JOIN users u ON u.id = p.id";

/// Repository for users and profiles.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Password hash and profile role for a login attempt.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<CredentialRow>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r"
            SELECT u.id, u.password_hash, p.role, p.full_name
            FROM users u
            LEFT JOIN profiles p ON p.id = u.id
            WHERE u.email = $1
            ",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// One page of profiles, newest first, with search over name, emails and phone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_profiles(
        &self,
        filter: &ProfileFilter,
        page: PageRequest,
    ) -> Result<(Vec<Profile>, i64), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM profiles p JOIN users u ON u.id = p.id WHERE TRUE",
        );
        push_profile_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(PROFILE_SELECT);
        query.push(" WHERE TRUE");
        push_profile_filter(&mut query, filter);
        query
            .push(" ORDER BY p.created_at DESC LIMIT ")
            .push_bind(page.limit_i64())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = query.build_query_as::<Profile>().fetch_all(self.pool).await?;
        Ok((rows, total))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_profile(&self, id: UserId) -> Result<Option<Profile>, RepositoryError> {
        let sql = format!("{PROFILE_SELECT} WHERE p.id = $1");
        let row = sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// The role a profile holds right now, `None` once the user is gone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn current_role(&self, id: UserId) -> Result<Option<ProfileRole>, RepositoryError> {
        let role: Option<ProfileRole> =
            sqlx::query_scalar("SELECT role FROM profiles WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(role)
    }

    /// Apply a partial update to a profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile does not exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<Profile, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE profiles
            SET role = COALESCE($2, role),
                full_name = COALESCE($3, full_name),
                phone = COALESCE($4, phone),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(update.role)
        .bind(update.full_name.as_deref())
        .bind(update.phone.as_deref())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get_profile(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Create `customer` profiles for users that have none. Returns how many were created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn repair_missing_profiles(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO profiles (id, email)
            SELECT u.id, u.email
            FROM users u
            LEFT JOIN profiles p ON p.id = u.id
            WHERE p.id IS NULL
            ",
        )
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Create a user and its profile in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    pub async fn create_with_profile(
        &self,
        email: &Email,
        password_hash: &str,
        full_name: &str,
        role: ProfileRole,
    ) -> Result<UserId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: UserId = sqlx::query_scalar(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING id",
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "user"))?;

        sqlx::query("INSERT INTO profiles (id, role, full_name, email) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(role)
            .bind(full_name)
            .bind(email)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Change the role of the profile belonging to `email`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such user has a profile.
    pub async fn set_role_by_email(
        &self,
        email: &Email,
        role: ProfileRole,
    ) -> Result<UserId, RepositoryError> {
        sqlx::query_scalar(
            r"
            UPDATE profiles p
            SET role = $2, updated_at = NOW()
            FROM users u
            WHERE u.id = p.id AND u.email = $1
            RETURNING p.id
            ",
        )
        .bind(email)
        .bind(role)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}

fn push_profile_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &ProfileFilter) {
    if let Some(role) = filter.role {
        query.push(" AND p.role = ").push_bind(role);
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{term}%");
        query
            .push(" AND (p.full_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.phone ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}
