//! Authentication route handlers.
//!
//! Email and password accounts backed by the session store. Login cycles the
//! session id; logout drops the user but keeps the cart. Forgotten passwords
//! are reset through an emailed single-use link.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::services::auth::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Same answer whether or not the account exists.
const RESET_REQUESTED: &str =
    "If an account exists with this email, a password reset link has been sent.";

/// The page a reset email links to, carrying the token.
fn reset_link(base_url: &Url, token: &str) -> Result<Url> {
    let mut link = base_url
        .join("/reset-password")
        .map_err(|e| AppError::Internal(format!("reset link: {e}")))?;
    link.query_pairs_mut().append_pair("token", token);
    Ok(link)
}

/// POST /api/auth/register
#[instrument(skip(state, session, req))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.pool())
        .register(&req.email, &req.password, &req.full_name)
        .await?;

    set_current_user(&session, &user).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    info!(user_id = %user.id, "Account registered");

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "user": user }))))
}

/// POST /api/auth/login
#[instrument(skip(state, session, req))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.pool())
        .login(&req.email, &req.password)
        .await?;

    set_current_user(&session, &user).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    info!(user_id = %user.id, "Logged in");

    Ok(Json(serde_json::json!({ "user": user })))
}

/// POST /api/auth/logout
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<impl IntoResponse> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/forgot-password
#[instrument(skip(state, req))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse> {
    let issued = AuthService::new(state.pool())
        .request_password_reset(&req.email)
        .await?;

    if let Some(reset) = issued {
        let link = reset_link(&state.config().base_url, &reset.token)?;
        match state.email() {
            Some(email) => {
                if let Err(e) = email
                    .send_password_reset(reset.email.as_str(), &reset.full_name, link.as_str())
                    .await
                {
                    error!(error = %e, "Failed to send password reset email");
                }
            }
            None => warn!("SMTP not configured; password reset email not sent"),
        }
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": RESET_REQUESTED,
    })))
}

/// POST /api/auth/reset-password
#[instrument(skip(state, req))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse> {
    let user_id = AuthService::new(state.pool())
        .reset_password(&req.token, &req.password)
        .await?;

    info!(user_id = %user_id, "Password reset");
    Ok(Json(serde_json::json!({ "success": true })))
}

/// GET /api/auth/session
pub async fn current(OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    Json(serde_json::json!({ "user": user }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_session_without_login_is_null_user() {
        let app = Router::new().route("/api/auth/session", get(current));
        let response = app
            .oneshot(Request::get("/api/auth/session").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["user"].is_null());
    }

    #[test]
    fn test_reset_link_carries_token() {
        let base = Url::parse("https://cozycatkitchen.in").unwrap();
        let link = reset_link(&base, "9f2c1a").unwrap();
        assert_eq!(
            link.as_str(),
            "https://cozycatkitchen.in/reset-password?token=9f2c1a"
        );

        let nested = Url::parse("http://localhost:3000/shop/").unwrap();
        let link = reset_link(&nested, "ab cd").unwrap();
        assert_eq!(link.as_str(), "http://localhost:3000/reset-password?token=ab+cd");
    }
}
