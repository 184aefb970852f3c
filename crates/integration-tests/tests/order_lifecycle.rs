//! An order from checkout to doorstep across both servers.
//!
//! Requires both servers, a seeded catalog with a recipe for the first
//! product, and the staff accounts named in the crate docs.

use cozycat_core::{BatchStatus, DeliveryStatus, OrderStatus};
use cozycat_integration_tests::{
    Staff, admin_url, client, json_body, place_cod_order, staff_client,
};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

async fn order_status(client: &Client, order_id: &str) -> String {
    let body = json_body(
        client
            .get(format!("{}/api/admin/orders/{order_id}", admin_url()))
            .send()
            .await
            .unwrap(),
        StatusCode::OK,
    )
    .await;
    body["status"].as_str().unwrap().to_string()
}

async fn patch(client: &Client, path: &str, body: &Value, expected: StatusCode) -> Value {
    let resp = client
        .patch(format!("{}{path}", admin_url()))
        .json(body)
        .send()
        .await
        .unwrap();
    json_body(resp, expected).await
}

#[tokio::test]
#[ignore = "Requires running storefront and admin servers"]
async fn test_order_lifecycle() {
    let shopper = client();
    let order = place_cod_order(&shopper).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let admin = staff_client(Staff::Admin).await;
    let ops = staff_client(Staff::Operations).await;
    let base = admin_url();

    // Skipping ahead is refused
    patch(
        &admin,
        &format!("/api/admin/orders/{order_id}/status"),
        &json!({ "status": OrderStatus::Delivered }),
        StatusCode::CONFLICT,
    )
    .await;

    patch(
        &admin,
        &format!("/api/admin/orders/{order_id}/status"),
        &json!({ "status": OrderStatus::Confirmed }),
        StatusCode::OK,
    )
    .await;

    let queue = json_body(
        ops.get(format!("{base}/api/operations/production-queue"))
            .send()
            .await
            .unwrap(),
        StatusCode::OK,
    )
    .await;
    let entry = queue
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["id"] == order_id.as_str())
        .expect("confirmed order missing from production queue");
    assert!(entry["priority"].as_u64().unwrap() >= 1);
    assert!(entry["requirements"].is_array());

    // Creating a batch starts production
    let batch = json_body(
        ops.post(format!("{base}/api/operations/batches"))
            .json(&json!({ "order_id": order_id, "item_ids": [] }))
            .send()
            .await
            .unwrap(),
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(batch["status"], BatchStatus::InProgress.as_str());
    assert!(batch["batch_number"].as_str().unwrap().starts_with("BATCH-"));
    let batch_id = batch["id"].as_str().unwrap().to_string();
    assert_eq!(
        order_status(&admin, &order_id).await,
        OrderStatus::InProduction.as_str()
    );

    // The same items cannot be batched twice
    let resp = ops
        .post(format!("{base}/api/operations/batches"))
        .json(&json!({ "order_id": order_id, "item_ids": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    patch(
        &ops,
        &format!("/api/operations/batches/{batch_id}/status"),
        &json!({ "status": BatchStatus::Completed }),
        StatusCode::OK,
    )
    .await;
    assert_eq!(
        order_status(&admin, &order_id).await,
        OrderStatus::ReadyDelivery.as_str()
    );

    let delivery = json_body(
        ops.post(format!("{base}/api/operations/deliveries"))
            .json(&json!({ "batch_id": batch_id, "order_id": order_id }))
            .send()
            .await
            .unwrap(),
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(delivery["status"], DeliveryStatus::Pending.as_str());
    let delivery_id = delivery["id"].as_str().unwrap().to_string();

    // One delivery per batch
    let resp = ops
        .post(format!("{base}/api/operations/deliveries"))
        .json(&json!({ "batch_id": batch_id, "order_id": order_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let partner = json_body(
        ops.post(format!("{base}/api/operations/delivery-partners"))
            .json(&json!({
                "name": "Ravi Kumar",
                "phone": "+91 98111 22334",
                "vehicle_type": "bike"
            }))
            .send()
            .await
            .unwrap(),
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(partner["phone"], "+919811122334");

    let assigned = patch(
        &ops,
        &format!("/api/operations/deliveries/{delivery_id}/assign"),
        &json!({ "delivery_partner_id": partner["id"], "tracking_number": "CCK-TEST-1" }),
        StatusCode::OK,
    )
    .await;
    assert_eq!(assigned["status"], DeliveryStatus::Assigned.as_str());

    patch(
        &ops,
        &format!("/api/operations/deliveries/{delivery_id}/status"),
        &json!({ "status": DeliveryStatus::InTransit }),
        StatusCode::OK,
    )
    .await;
    assert_eq!(
        order_status(&admin, &order_id).await,
        OrderStatus::OutForDelivery.as_str()
    );

    let delivered = patch(
        &ops,
        &format!("/api/operations/deliveries/{delivery_id}/status"),
        &json!({ "status": DeliveryStatus::Delivered }),
        StatusCode::OK,
    )
    .await;
    assert!(delivered["actual_delivery_date"].is_string());
    assert_eq!(
        order_status(&admin, &order_id).await,
        OrderStatus::Delivered.as_str()
    );

    // Delivered is terminal
    patch(
        &admin,
        &format!("/api/admin/orders/{order_id}/status"),
        &json!({ "status": OrderStatus::Cancelled }),
        StatusCode::CONFLICT,
    )
    .await;

    let views = json_body(
        ops.get(format!("{base}/api/operations/deliveries"))
            .query(&[("status", "delivered"), ("search", "Asha")])
            .send()
            .await
            .unwrap(),
        StatusCode::OK,
    )
    .await;
    assert!(
        views
            .as_array()
            .unwrap()
            .iter()
            .any(|v| v["id"] == delivery_id.as_str())
    );
}
