//! Account route handlers: profile, order history, address book.
//!
//! Every handler here requires a logged-in user.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use cozycat_core::pagination::{Page, PageRequest};
use cozycat_core::validation::{self, ValidationError};
use cozycat_core::{AddressId, Phone};

use crate::db::{CustomerRepository, OrderRepository, UserRepository};
use crate::error::{AppError, Result, clear_sentry_user};
use crate::middleware::{RequireAuth, set_current_user};
use crate::models::{AddressInput, CurrentUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub phone: Option<String>,
}

impl ProfileUpdate {
    fn validate(self) -> std::result::Result<(String, Option<String>), ValidationError> {
        let full_name = validation::person_name("full_name", &self.full_name)?;
        let phone = match self.phone.as_deref().map(str::trim) {
            Some(phone) if !phone.is_empty() => Some(
                Phone::parse(phone)
                    .map_err(|e| ValidationError::new("phone", e.to_string()))?
                    .into(),
            ),
            _ => None,
        };
        Ok((full_name, phone))
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

// =============================================================================
// Profile
// =============================================================================

/// GET /api/user/profile
#[instrument(skip(state, user))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let profile = UserRepository::new(state.pool())
        .get_profile(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile".to_string()))?;
    let customer = CustomerRepository::new(state.pool())
        .find_by_user(user.id)
        .await?;

    Ok(Json(serde_json::json!({
        "profile": profile,
        "customer": customer,
    })))
}

/// PUT /api/user/profile
#[instrument(skip(state, session, user, update))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(update): Json<ProfileUpdate>,
) -> Result<impl IntoResponse> {
    let (full_name, phone) = update.validate()?;
    let profile = UserRepository::new(state.pool())
        .update_profile(user.id, &full_name, phone.as_deref())
        .await?;

    let refreshed = CurrentUser {
        full_name: profile.full_name.clone(),
        ..user
    };
    set_current_user(&session, &refreshed).await?;

    Ok(Json(serde_json::json!({ "profile": profile })))
}

/// DELETE /api/user/account
///
/// Past orders are kept; the customer record is detached from the login.
#[instrument(skip(state, session, user))]
pub async fn delete_account(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    UserRepository::new(state.pool()).delete(user.id).await?;
    session.flush().await?;
    clear_sentry_user();
    info!(user_id = %user.id, "Account deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Orders
// =============================================================================

/// GET /api/user/orders
#[instrument(skip(state, user))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let page = PageRequest::new(query.page, query.limit);
    let (items, total) = OrderRepository::new(state.pool())
        .list_for_user(user.id, page)
        .await?;
    Ok(Json(Page::new(items, page, total)))
}

// =============================================================================
// Addresses
// =============================================================================

/// GET /api/user/addresses
#[instrument(skip(state, user))]
pub async fn addresses(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let customers = CustomerRepository::new(state.pool());
    let addresses = match customers.find_by_user(user.id).await? {
        Some(customer) => customers.list_addresses(customer.id).await?,
        None => Vec::new(),
    };
    Ok(Json(serde_json::json!({ "addresses": addresses })))
}

/// POST /api/user/addresses
#[instrument(skip(state, user, input))]
pub async fn create_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(input): Json<AddressInput>,
) -> Result<impl IntoResponse> {
    let input = input.validate()?;
    let customers = CustomerRepository::new(state.pool());
    let customer = customers.ensure_for_user(user.id).await?;
    let address = customers.create_address(customer.id, &input).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "address": address })),
    ))
}

/// PUT /api/user/addresses/{id}
#[instrument(skip(state, user, input))]
pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
    Json(input): Json<AddressInput>,
) -> Result<impl IntoResponse> {
    let input = input.validate()?;
    let customers = CustomerRepository::new(state.pool());
    let customer = customers
        .find_by_user(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Address".to_string()))?;
    let address = customers.update_address(customer.id, id, &input).await?;
    Ok(Json(serde_json::json!({ "address": address })))
}

/// DELETE /api/user/addresses/{id}
#[instrument(skip(state, user))]
pub async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<impl IntoResponse> {
    let customers = CustomerRepository::new(state.pool());
    let customer = customers
        .find_by_user(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Address".to_string()))?;
    customers.delete_address(customer.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_update_normalizes_phone() {
        let update = ProfileUpdate {
            full_name: " Kabir Singh ".to_string(),
            phone: Some("98765 43210".to_string()),
        };
        let (name, phone) = update.validate().unwrap();
        assert_eq!(name, "Kabir Singh");
        assert_eq!(phone.as_deref(), Some("9876543210"));
    }

    #[test]
    fn test_profile_update_blank_phone_clears() {
        let update = ProfileUpdate {
            full_name: "Kabir".to_string(),
            phone: Some("  ".to_string()),
        };
        assert_eq!(update.validate().unwrap().1, None);
    }

    #[test]
    fn test_profile_update_rejects_bad_phone() {
        let update = ProfileUpdate {
            full_name: "Kabir".to_string(),
            phone: Some("123".to_string()),
        };
        assert_eq!(update.validate().unwrap_err().field, "phone");
    }
}
