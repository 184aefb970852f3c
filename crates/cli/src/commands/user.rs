//! User account management.
//!
//! Staff accounts are normally created here; the console has no sign-up.

use rand::Rng;
use rand::distr::Alphanumeric;

use cozycat_admin::db::UserRepository;
use cozycat_admin::services::auth::hash_password;
use cozycat_core::{Email, ProfileRole, UserId};

use super::{CommandError, connect};

const GENERATED_PASSWORD_LENGTH: usize = 20;
const MIN_PASSWORD_LENGTH: usize = 8;

fn parse_role(role: &str) -> Result<ProfileRole, CommandError> {
    role.parse().map_err(|_| {
        CommandError::Invalid(format!(
            "role {role}; valid roles: admin, operations, partner, customer"
        ))
    })
}

fn parse_email(email: &str) -> Result<Email, CommandError> {
    Email::parse(email).map_err(|e| CommandError::Invalid(format!("email {email}: {e}")))
}

fn generate_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

/// Create a user and its profile.
///
/// # Errors
///
/// Returns an error for an invalid email, role or password, or if the email
/// is already registered.
pub async fn create(
    email: &str,
    name: &str,
    role: &str,
    password: Option<String>,
) -> Result<UserId, CommandError> {
    let role = parse_role(role)?;
    let email = parse_email(email)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CommandError::Invalid("name cannot be empty".to_string()));
    }

    let generated = password.is_none();
    let password = password.unwrap_or_else(generate_password);
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(CommandError::Invalid(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    let password_hash =
        hash_password(&password).map_err(|e| CommandError::Invalid(e.to_string()))?;

    let pool = connect().await?;
    tracing::info!("Creating user: {} ({})", email.as_str(), role);

    let id = UserRepository::new(&pool)
        .create_with_profile(&email, &password_hash, name, role)
        .await?;

    tracing::info!("User created! ID: {id}, Email: {}, Role: {role}", email.as_str());
    if generated {
        tracing::warn!("Generated password (shown once): {password}");
    }
    Ok(id)
}

/// Change the role of the user registered with `email`.
///
/// # Errors
///
/// Returns an error for an invalid email or role, or an unknown user.
pub async fn set_role(email: &str, role: &str) -> Result<UserId, CommandError> {
    let role = parse_role(role)?;
    let email = parse_email(email)?;

    let pool = connect().await?;
    let id = UserRepository::new(&pool)
        .set_role_by_email(&email, role)
        .await?;

    tracing::info!("Role of {} set to {role}", email.as_str());
    Ok(id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role("operations").unwrap(), ProfileRole::Operations);
        assert_eq!(parse_role("admin").unwrap(), ProfileRole::Admin);
        assert!(parse_role("super_admin").is_err());
    }

    #[test]
    fn test_generated_password() {
        let password = generate_password();
        assert_eq!(password.len(), GENERATED_PASSWORD_LENGTH);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(password, generate_password());
    }
}
