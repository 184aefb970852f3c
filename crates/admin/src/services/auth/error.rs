//! Console authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during console login.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but its role has no console access.
    #[error("account is not admin or operations staff")]
    NotStaff,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
