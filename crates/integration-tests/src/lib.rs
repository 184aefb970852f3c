//! Integration tests for `CozyCat` Kitchen.
//!
//! The tests talk to running servers over HTTP and are `#[ignore]`d by
//! default.
//!
//! # Running Tests
//!
//! ```bash
//! cargo run -p cozycat-cli -- migrate
//! cargo run -p cozycat-cli -- seed data/seed.yaml
//! cargo run -p cozycat-cli -- user create -e admin@cozycat.test -n Admin -r admin -p <password>
//! cargo run -p cozycat-cli -- user create -e ops@cozycat.test -n Kitchen -r operations -p <password>
//! cargo run -p cozycat-storefront & cargo run -p cozycat-admin &
//! cargo test -p cozycat-integration-tests -- --ignored --test-threads=1
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_URL` - default `http://localhost:3000`
//! - `ADMIN_URL` - default `http://localhost:3001`
//! - `COZYCAT_TEST_ADMIN_EMAIL` / `COZYCAT_TEST_ADMIN_PASSWORD`
//! - `COZYCAT_TEST_OPS_EMAIL` / `COZYCAT_TEST_OPS_PASSWORD`
//!
//! The seeded catalog must contain an active product whose first variant,
//! bought twice, meets the local zone minimum order.

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

/// Base URL of the storefront API.
#[must_use]
pub fn storefront_url() -> String {
    std::env::var("STOREFRONT_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Base URL of the admin API.
#[must_use]
pub fn admin_url() -> String {
    std::env::var("ADMIN_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// A client that keeps session cookies between requests.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Which staff account to log in as.
#[derive(Debug, Clone, Copy)]
pub enum Staff {
    Admin,
    Operations,
}

impl Staff {
    fn credentials(self) -> (String, String) {
        let prefix = match self {
            Self::Admin => "COZYCAT_TEST_ADMIN",
            Self::Operations => "COZYCAT_TEST_OPS",
        };
        let email = std::env::var(format!("{prefix}_EMAIL"))
            .unwrap_or_else(|_| panic!("{prefix}_EMAIL not set"));
        let password = std::env::var(format!("{prefix}_PASSWORD"))
            .unwrap_or_else(|_| panic!("{prefix}_PASSWORD not set"));
        (email, password)
    }
}

/// A client logged in to the admin console.
pub async fn staff_client(staff: Staff) -> Client {
    let client = client();
    let (email, password) = staff.credentials();
    let resp = client
        .post(format!("{}/api/auth/login", admin_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to log in");
    assert_eq!(resp.status(), StatusCode::OK, "staff login failed for {staff:?}");
    client
}

/// Read a JSON body, asserting the status first.
pub async fn json_body(resp: reqwest::Response, expected: StatusCode) -> Value {
    let status = resp.status();
    let body: Value = resp.json().await.unwrap_or(Value::Null);
    assert_eq!(status, expected, "unexpected status, body: {body}");
    body
}

/// The id of the first variant of the first active product.
pub async fn first_variant_id(client: &Client) -> String {
    let resp = client
        .get(format!("{}/api/products?limit=1", storefront_url()))
        .send()
        .await
        .expect("Failed to list products");
    let body = json_body(resp, StatusCode::OK).await;
    body["items"][0]["variants"][0]["id"]
        .as_str()
        .expect("seeded catalog has no product variants")
        .to_string()
}

/// Add one item to the cart and check out as a guest with cash on delivery.
///
/// Returns the `order` object from the checkout response.
pub async fn place_cod_order(client: &Client) -> Value {
    let base = storefront_url();
    let variant_id = first_variant_id(client).await;

    let resp = client
        .post(format!("{base}/api/cart/items"))
        .json(&json!({ "variant_id": variant_id, "quantity": 2 }))
        .send()
        .await
        .expect("Failed to add to cart");
    assert!(resp.status().is_success(), "add to cart: {}", resp.status());

    let resp = client
        .post(format!("{base}/api/checkout"))
        .json(&checkout_body())
        .send()
        .await
        .expect("Failed to check out");
    let body = json_body(resp, StatusCode::CREATED).await;
    body["order"].clone()
}

/// A guest checkout delivering inside the local zone.
#[must_use]
pub fn checkout_body() -> Value {
    json!({
        "customer": {
            "first_name": "Asha",
            "last_name": "Verma",
            "phone": TEST_PHONE,
            "email": "asha@cozycat.test"
        },
        "address": {
            "address_line1": "22 Hauz Khas Village",
            "city": "New Delhi",
            "state": "Delhi",
            "pincode": "110016"
        },
        "payment_method": "cod",
        "notes": "Integration test order"
    })
}

/// Phone number used for test checkouts and order tracking.
pub const TEST_PHONE: &str = "9876543210";
