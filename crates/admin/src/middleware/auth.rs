//! Staff authentication extractors.
//!
//! `/api/operations/*` handlers take [`RequireStaff`] (admin or operations);
//! `/api/admin/*` handlers take [`RequireAdmin`].

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use tower_sessions::Session;

use cozycat_core::ProfileRole;

use crate::db::UserRepository;
use crate::models::{CurrentStaff, session_keys};

/// Rejection for the staff extractors, rendered as `{"error": ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffRejection {
    Unauthorized,
    Forbidden,
    Unavailable,
}

impl IntoResponse for StaffRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Insufficient permissions"),
            Self::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable",
            ),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Staff,
    Admin,
}

/// Apply the profile's current role to a session identity.
///
/// `current_role` is `None` when the profile no longer exists.
fn authorize(
    mut staff: CurrentStaff,
    current_role: Option<ProfileRole>,
    access: Access,
) -> Result<CurrentStaff, StaffRejection> {
    let role = current_role.ok_or(StaffRejection::Unauthorized)?;
    staff.role = role;
    let allowed = match access {
        Access::Staff => role.is_staff(),
        Access::Admin => role == ProfileRole::Admin,
    };
    if allowed {
        Ok(staff)
    } else {
        Err(StaffRejection::Forbidden)
    }
}

async fn current_staff(parts: &Parts) -> Result<CurrentStaff, StaffRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(StaffRejection::Unauthorized)?;

    session
        .get::<CurrentStaff>(session_keys::CURRENT_STAFF)
        .await
        .ok()
        .flatten()
        .ok_or(StaffRejection::Unauthorized)
}

/// The session identity, checked against the role stored in `profiles`.
///
/// A role change made while the session is alive applies on the next request.
async fn authorized_staff(
    parts: &Parts,
    pool: &PgPool,
    access: Access,
) -> Result<CurrentStaff, StaffRejection> {
    let staff = current_staff(parts).await?;
    let role = UserRepository::new(pool)
        .current_role(staff.id)
        .await
        .map_err(|e| {
            tracing::error!(user_id = %staff.id, error = %e, "Failed to load staff role");
            StaffRejection::Unavailable
        })?;
    authorize(staff, role, access)
}

/// Any logged-in staff member.
pub struct RequireStaff(pub CurrentStaff);

impl<S> FromRequestParts<S> for RequireStaff
where
    PgPool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StaffRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = PgPool::from_ref(state);
        authorized_staff(parts, &pool, Access::Staff).await.map(Self)
    }
}

/// A logged-in admin.
pub struct RequireAdmin(pub CurrentStaff);

impl<S> FromRequestParts<S> for RequireAdmin
where
    PgPool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StaffRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = PgPool::from_ref(state);
        authorized_staff(parts, &pool, Access::Admin).await.map(Self)
    }
}

/// Store the logged-in staff member, cycling the session id first.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_staff(
    session: &Session,
    staff: &CurrentStaff,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_STAFF, staff).await
}

/// Logout: drop the whole session.
///
/// # Errors
///
/// Returns an error if the session store cannot be reached.
pub async fn clear_current_staff(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request, routing::get};
    use cozycat_core::{Email, UserId};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;

    fn staff(role: ProfileRole) -> CurrentStaff {
        CurrentStaff {
            id: UserId::generate(),
            email: Email::parse("kitchen@cozycat.example").unwrap(),
            full_name: "Kitchen Lead".to_string(),
            role,
        }
    }

    async fn ops(RequireStaff(staff): RequireStaff) -> String {
        staff.full_name
    }

    async fn admin_only(RequireAdmin(staff): RequireAdmin) -> String {
        staff.full_name
    }

    fn app() -> Router {
        // Never connects: requests without a session are rejected first.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://cozycat@localhost/cozycat_test")
            .unwrap();
        Router::new()
            .route("/api/operations/ping", get(ops))
            .route("/api/admin/ping", get(admin_only))
            .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false))
            .with_state(pool)
    }

    #[tokio::test]
    async fn test_no_session_is_401() {
        let app = app();
        for uri in ["/api/admin/ping", "/api/operations/ping"] {
            let response = app
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

            let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["error"], "Authentication required");
        }
    }

    #[test]
    fn test_operations_role() {
        let ops = staff(ProfileRole::Operations);
        let allowed = authorize(ops.clone(), Some(ProfileRole::Operations), Access::Staff).unwrap();
        assert_eq!(allowed.role, ProfileRole::Operations);
        assert_eq!(
            authorize(ops, Some(ProfileRole::Operations), Access::Admin).unwrap_err(),
            StaffRejection::Forbidden
        );
    }

    #[test]
    fn test_admin_role() {
        let admin = staff(ProfileRole::Admin);
        assert!(authorize(admin.clone(), Some(ProfileRole::Admin), Access::Staff).is_ok());
        assert!(authorize(admin, Some(ProfileRole::Admin), Access::Admin).is_ok());
    }

    #[test]
    fn test_demotion_applies_to_live_session() {
        // Logged in as admin, demoted to customer since.
        let stale = staff(ProfileRole::Admin);
        assert_eq!(
            authorize(stale.clone(), Some(ProfileRole::Customer), Access::Admin).unwrap_err(),
            StaffRejection::Forbidden
        );
        assert_eq!(
            authorize(stale.clone(), Some(ProfileRole::Customer), Access::Staff).unwrap_err(),
            StaffRejection::Forbidden
        );

        // Demoted from admin to operations: console access stays, admin routes go.
        let ops = authorize(stale.clone(), Some(ProfileRole::Operations), Access::Staff).unwrap();
        assert_eq!(ops.role, ProfileRole::Operations);
        assert!(!ops.is_admin());
        assert_eq!(
            authorize(stale, Some(ProfileRole::Operations), Access::Admin).unwrap_err(),
            StaffRejection::Forbidden
        );
    }

    #[test]
    fn test_deleted_profile_is_401() {
        assert_eq!(
            authorize(staff(ProfileRole::Admin), None, Access::Staff).unwrap_err(),
            StaffRejection::Unauthorized
        );
    }

    #[test]
    fn test_unavailable_is_503() {
        assert_eq!(
            StaffRejection::Unavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
