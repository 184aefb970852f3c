//! Console authentication service.
//!
//! Staff log in with the same email and password accounts as the shop;
//! only `admin` and `operations` profiles are let in.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use cozycat_core::Email;

use crate::db::UserRepository;
use crate::models::CurrentStaff;

/// Console authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Login with email and password.
    ///
    /// The password is verified before the role is looked at.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::NotStaff` if the profile is not admin or operations.
    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentStaff, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let credentials = self
            .users
            .get_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &credentials.password_hash)?;

        let role = credentials.role.unwrap_or_default();
        if !role.is_staff() {
            return Err(AuthError::NotStaff);
        }

        Ok(CurrentStaff {
            id: credentials.id,
            email,
            full_name: credentials.full_name.unwrap_or_default(),
            role,
        })
    }
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_roundtrip() {
        let hash = hash_password("Kitchen#Shift7").unwrap();
        assert!(verify_password("Kitchen#Shift7", &hash).is_ok());
        assert!(matches!(
            verify_password("kitchen#shift7", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("Kitchen#Shift7").unwrap();
        let b = hash_password("Kitchen#Shift7").unwrap();
        assert_ne!(a, b);
    }
}
