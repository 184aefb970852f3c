//! User and profile management.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{info, instrument};

use cozycat_core::pagination::{Page, PageRequest};
use cozycat_core::{Phone, ProfileRole, UserId};

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{ProfileFilter, ProfileUpdate};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub role: Option<ProfileRole>,
}

/// GET /api/admin/users
#[instrument(skip(state, _admin))]
pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse> {
    let page = PageRequest::new(query.page, query.limit);
    let filter = ProfileFilter {
        search: query.search,
        role: query.role,
    };
    let (profiles, total) = UserRepository::new(state.pool())
        .list_profiles(&filter, page)
        .await?;
    Ok(Json(Page::new(profiles, page, total)))
}

/// PATCH /api/admin/users/{id}
#[instrument(skip(state, admin, update), fields(admin = %admin.id))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(mut update): Json<ProfileUpdate>,
) -> Result<impl IntoResponse> {
    if id == admin.id && update.role.is_some_and(|role| role != ProfileRole::Admin) {
        return Err(AppError::BadRequest(
            "You cannot remove your own admin role".to_string(),
        ));
    }
    if let Some(name) = update.full_name.as_deref().map(str::trim) {
        if name.is_empty() {
            return Err(AppError::BadRequest("full_name cannot be empty".to_string()));
        }
        update.full_name = Some(name.to_string());
    }
    if let Some(phone) = update.phone.as_deref() {
        let phone = Phone::parse(phone).map_err(|e| AppError::BadRequest(e.to_string()))?;
        update.phone = Some(phone.as_str().to_string());
    }

    let profile = UserRepository::new(state.pool())
        .update_profile(id, &update)
        .await?;
    if let Some(role) = update.role {
        info!(user_id = %id, %role, "Profile role changed");
    }
    Ok(Json(profile))
}

/// POST /api/admin/users/repair-profiles
#[instrument(skip(state, _admin))]
pub async fn repair_profiles(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let created = UserRepository::new(state.pool())
        .repair_missing_profiles()
        .await?;
    info!(created, "Missing profiles repaired");
    Ok(Json(serde_json::json!({ "created": created })))
}
