//! Health checks.

use std::time::Instant;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::state::AppState;

/// Liveness: the process is up. Does not touch dependencies.
pub async fn live() -> &'static str {
    "ok"
}

/// Readiness: 503 until the database answers.
pub async fn ready(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// GET /api/health
pub async fn report(State(state): State<AppState>) -> impl IntoResponse {
    let started = Instant::now();
    let database_ok = sqlx::query("SELECT 1")
        .fetch_one(state.pool())
        .await
        .is_ok();
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if database_ok { "healthy" } else { "unhealthy" },
            "version": env!("CARGO_PKG_VERSION"),
            "database": {
                "connected": database_ok,
                "latency_ms": latency_ms,
            },
            "payments_enabled": state.razorpay().is_some(),
        })),
    )
}
