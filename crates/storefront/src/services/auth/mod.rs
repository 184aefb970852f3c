//! Authentication service.
//!
//! Email and password accounts. Every account gets a `customer` profile.
//! Forgotten passwords are replaced through single-use emailed tokens;
//! only a SHA-256 digest of each token is stored.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::{OsRng, RngCore},
    },
};
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use cozycat_core::{Email, ProfileRole, UserId, validation};

use crate::db::{RepositoryError, UserRepository};
use crate::models::{CurrentUser, User};

/// How long an emailed reset link stays valid.
const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// A freshly issued reset token, ready to be mailed to the account.
#[derive(Debug)]
pub struct PasswordReset {
    pub email: Email,
    pub full_name: String,
    pub token: String,
}

/// Authentication service.
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

    /// Register a new customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::Invalid` if the name or password fails validation.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email)?;
        let full_name = validation::person_name("full_name", full_name)?;
        validation::password_strength(password)?;

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create_with_profile(&email, &password_hash, &full_name, ProfileRole::Customer)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        Ok(CurrentUser {
            id: user.id,
            email: user.email,
            full_name,
            role: ProfileRole::Customer,
        })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        self.current_user(user).await
    }

    /// Issue a reset token for the account registered under `email`.
    ///
    /// Returns `None` for unknown addresses; callers answer the same way
    /// either way so accounts cannot be enumerated.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<PasswordReset>, AuthError> {
        let email = Email::parse(email)?;
        let Some((user, _)) = self.users.get_password_hash(&email).await? else {
            return Ok(None);
        };

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.users
            .create_reset_token(user.id, &token_digest(&token), expires_at)
            .await?;

        let full_name = self
            .users
            .get_profile(user.id)
            .await?
            .map(|p| p.full_name)
            .unwrap_or_default();

        Ok(Some(PasswordReset {
            email: user.email,
            full_name,
            token,
        }))
    }

    /// Set a new password using an emailed reset token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Invalid` if the new password is too weak.
    /// Returns `AuthError::InvalidResetToken` if the token is unknown, spent or expired.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<UserId, AuthError> {
        validation::password_strength(new_password)?;
        let password_hash = hash_password(new_password)?;

        self.users
            .consume_reset_token(&token_digest(token.trim()), &password_hash)
            .await?
            .ok_or(AuthError::InvalidResetToken)
    }

    /// Session identity for `user`, reading name and role from the profile.
    async fn current_user(&self, user: User) -> Result<CurrentUser, AuthError> {
        let profile = self.users.get_profile(user.id).await?;
        let (full_name, role) = profile.map_or_else(
            || (String::new(), ProfileRole::Customer),
            |p| (p.full_name, p.role),
        );
        Ok(CurrentUser {
            id: user.id,
            email: user.email,
            full_name,
            role,
        })
    }
}

/// 256 random bits, hex encoded for use in a link.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Whiskers@2024").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Whiskers@2024", &hash).is_ok());
        assert!(matches!(
            verify_password("whiskers@2024", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_reset_tokens_are_random_hex() {
        let first = generate_reset_token();
        let second = generate_reset_token();
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[test]
    fn test_token_digest_is_stable_and_hides_token() {
        let token = generate_reset_token();
        let digest = token_digest(&token);
        assert_eq!(digest, token_digest(&token));
        assert_ne!(digest, token);
        assert_eq!(
            token_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
