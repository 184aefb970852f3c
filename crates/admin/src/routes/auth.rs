//! Console login.
//!
//! Only profiles with the admin or operations role get a session.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireStaff, clear_current_staff, set_current_staff};
use crate::services::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/auth/login
#[instrument(skip(state, session, req))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let staff = AuthService::new(state.pool())
        .login(&req.email, &req.password)
        .await?;

    set_current_staff(&session, &staff).await?;
    set_sentry_user(&staff.id, staff.email.as_str());
    info!(user_id = %staff.id, role = %staff.role, "Staff logged in");

    Ok(Json(serde_json::json!({ "user": staff })))
}

/// POST /api/auth/logout
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<impl IntoResponse> {
    clear_current_staff(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/session
pub async fn current(RequireStaff(staff): RequireStaff) -> impl IntoResponse {
    Json(serde_json::json!({ "user": staff }))
}
