//! Admin console access and reporting tests.
//!
//! Requires the admin server (`cargo run -p cozycat-admin`) and the staff
//! accounts named in the crate docs.

use cozycat_integration_tests::{Staff, admin_url, client, json_body, staff_client};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_health_report() {
    let body = json_body(
        client()
            .get(format!("{}/api/health", admin_url()))
            .send()
            .await
            .unwrap(),
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["status"], "healthy");
    assert!(body["event_subscribers"].is_number());
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_requires_session() {
    let base = admin_url();
    for path in ["/api/admin/dashboard", "/api/operations/production-queue"] {
        let resp = client().get(format!("{base}{path}")).send().await.unwrap();
        let body = json_body(resp, StatusCode::UNAUTHORIZED).await;
        assert_eq!(body["error"], "Authentication required");
    }
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_wrong_password_is_401() {
    let resp = client()
        .post(format!("{}/api/auth/login", admin_url()))
        .json(&json!({ "email": "nobody@cozycat.test", "password": "not-the-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running admin server and staff accounts"]
async fn test_operations_staff_cannot_reach_admin_routes() {
    let client = staff_client(Staff::Operations).await;
    let base = admin_url();

    let session = json_body(
        client.get(format!("{base}/api/auth/session")).send().await.unwrap(),
        StatusCode::OK,
    )
    .await;
    assert_eq!(session["user"]["role"], "operations");

    let resp = client
        .get(format!("{base}/api/operations/production-queue"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base}/api/admin/dashboard"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running admin server and staff accounts"]
async fn test_logout_ends_session() {
    let client = staff_client(Staff::Admin).await;
    let base = admin_url();

    let resp = client
        .post(format!("{base}/api/auth/logout"))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let resp = client
        .get(format!("{base}/api/admin/dashboard"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running admin server and staff accounts"]
async fn test_dashboard_with_sections() {
    let client = staff_client(Staff::Admin).await;
    let body = json_body(
        client
            .get(format!("{}/api/admin/dashboard", admin_url()))
            .query(&[("include_order_stats", "true"), ("include_activity", "true")])
            .send()
            .await
            .unwrap(),
        StatusCode::OK,
    )
    .await;
    assert!(body["total_orders"].is_number());
    assert!(body["order_stats"].is_array());
    assert!(body["recent_activity"].is_array());
}

#[tokio::test]
#[ignore = "Requires running admin server and staff accounts"]
async fn test_analytics_report_is_cached() {
    let client = staff_client(Staff::Admin).await;
    let base = admin_url();

    let resp = client
        .post(format!("{base}/api/admin/cache/clear"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let request = json!({ "type": "revenue", "group_by": "week" });
    let first = json_body(
        client
            .post(format!("{base}/api/admin/analytics"))
            .json(&request)
            .send()
            .await
            .unwrap(),
        StatusCode::OK,
    )
    .await;
    assert_eq!(first["success"], true);
    assert_eq!(first["meta"]["cached"], false);

    let second = json_body(
        client
            .post(format!("{base}/api/admin/analytics"))
            .json(&request)
            .send()
            .await
            .unwrap(),
        StatusCode::OK,
    )
    .await;
    assert_eq!(second["meta"]["cached"], true);
    assert_eq!(first["data"], second["data"]);
}

#[tokio::test]
#[ignore = "Requires running admin server and staff accounts"]
async fn test_analytics_csv_export() {
    let client = staff_client(Staff::Admin).await;
    let resp = client
        .get(format!("{}/api/admin/analytics/export", admin_url()))
        .query(&[
            ("type", "orders"),
            ("start_date", "2025-01-01"),
            ("end_date", "2025-01-31"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let disposition = resp.headers()["content-disposition"].to_str().unwrap().to_string();
    assert!(disposition.contains("analytics-orders-2025-01-01-2025-01-31.csv"));
    let csv = resp.text().await.unwrap();
    assert!(csv.starts_with("Status,Orders,Revenue"));
}

#[tokio::test]
#[ignore = "Requires running admin server and staff accounts"]
async fn test_invalid_recipe_percentage_is_400() {
    let client = staff_client(Staff::Operations).await;
    let resp = client
        .put(format!(
            "{}/api/operations/recipes/00000000-0000-0000-0000-000000000000",
            admin_url()
        ))
        .json(&json!({ "percentage": 150 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
