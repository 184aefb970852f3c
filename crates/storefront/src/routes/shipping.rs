//! Delivery quotes and serviceability checks.

use axum::{
    Json,
    extract::Query,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use cozycat_core::shipping::{ZoneId, calculate_delivery_fee, serviceable_prefixes, zone_by_id};
use cozycat_core::{Money, Pincode};

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub pincode: String,
    #[serde(default)]
    pub order_value: Money,
}

#[derive(Debug, Deserialize)]
pub struct ServiceabilityQuery {
    pub pincode: String,
}

#[derive(Debug, Deserialize)]
pub struct ZonesQuery {
    pub zone: Option<ZoneId>,
}

fn parse_pincode(raw: &str) -> Result<Pincode> {
    Pincode::parse(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

/// POST /api/shipping/calculate
#[instrument(skip(req), fields(pincode = %req.pincode))]
pub async fn calculate(Json(req): Json<QuoteRequest>) -> Result<impl IntoResponse> {
    if req.order_value.is_negative() {
        return Err(AppError::BadRequest(
            "order_value must not be negative".to_string(),
        ));
    }
    let pincode = parse_pincode(&req.pincode)?;
    Ok(Json(calculate_delivery_fee(&pincode, req.order_value)))
}

/// GET /api/shipping/calculate?pincode=
pub async fn check(Query(query): Query<ServiceabilityQuery>) -> Result<impl IntoResponse> {
    let pincode = parse_pincode(&query.pincode)?;
    Ok(Json(calculate_delivery_fee(&pincode, Money::ZERO)))
}

/// GET /api/shipping/zones?zone=
pub async fn zones(Query(query): Query<ZonesQuery>) -> impl IntoResponse {
    let zones: Vec<_> = match query.zone {
        Some(id) => vec![zone_by_id(id)],
        None => cozycat_core::shipping::ZONES.iter().collect(),
    };
    Json(serde_json::json!({
        "zones": zones,
        "prefixes": serviceable_prefixes(query.zone),
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request, http::StatusCode, routing::get};
    use tower::ServiceExt;

    use super::*;

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_check_serviceable_pincode() {
        let app = Router::new().route("/api/shipping/calculate", get(check));
        let (status, json) = get_json(app, "/api/shipping/calculate?pincode=110017").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["is_serviceable"], true);
        assert_eq!(json["zone"], "local");
    }

    #[tokio::test]
    async fn test_check_malformed_pincode() {
        let app = Router::new().route("/api/shipping/calculate", get(check));
        let (status, json) = get_json(app, "/api/shipping/calculate?pincode=11A").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "pincode must be 6 digits");
    }

    #[tokio::test]
    async fn test_zones_filter() {
        let app = Router::new().route("/api/shipping/zones", get(zones));
        let (_, json) = get_json(app.clone(), "/api/shipping/zones?zone=national").await;
        assert_eq!(json["zones"].as_array().unwrap().len(), 1);
        assert!(
            json["prefixes"]
                .as_array()
                .unwrap()
                .iter()
                .any(|p| p == "560")
        );

        let (_, json) = get_json(app, "/api/shipping/zones").await;
        assert_eq!(json["zones"].as_array().unwrap().len(), 2);
    }
}
