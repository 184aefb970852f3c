//! Razorpay payment gateway client.
//!
//! - Base URL: `https://api.razorpay.com/v1` (overridable for tests)
//! - Authentication: HTTP basic auth with the key id and key secret
//! - Checkout signature: `HMAC_SHA256(key_secret, "{order_id}|{payment_id}")`, hex encoded

use std::sync::Arc;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::instrument;

use crate::config::RazorpayConfig;

type HmacSha256 = Hmac<Sha256>;

/// Smallest gateway order, in paise (₹1).
pub const MIN_AMOUNT_PAISE: i64 = 100;

/// Largest gateway order, in paise (₹5,000).
pub const MAX_AMOUNT_PAISE: i64 = 500_000;

/// Errors from the payment gateway.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Gateway rejected our credentials.
    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    /// Amount outside the accepted range.
    #[error("amount must be between {MIN_AMOUNT_PAISE} and {MAX_AMOUNT_PAISE} paise")]
    AmountOutOfRange,

    /// Signature did not match.
    #[error("invalid payment signature")]
    InvalidSignature,

    /// Payment exists but was not captured.
    #[error("payment not captured (status: {0})")]
    NotCaptured(String),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    payment_capture: bool,
}

/// A gateway order, returned to the browser to open the checkout widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
}

/// A payment as reported by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub order_id: Option<String>,
    pub method: Option<String>,
}

/// Razorpay REST client.
#[derive(Clone)]
pub struct RazorpayClient {
    inner: Arc<RazorpayClientInner>,
}

struct RazorpayClientInner {
    client: reqwest::Client,
    api_base: String,
    key_id: String,
    key_secret: SecretString,
}

impl RazorpayClient {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &RazorpayConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self {
            inner: Arc::new(RazorpayClientInner {
                client,
                api_base: config.api_base.trim_end_matches('/').to_string(),
                key_id: config.key_id.clone(),
                key_secret: config.key_secret.clone(),
            }),
        })
    }

    /// Public key id, needed by the browser checkout widget.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.inner.key_id
    }

    /// Create a gateway order for `amount_paise` in INR.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::AmountOutOfRange` outside 100..=500000 paise,
    /// or the gateway's error.
    #[instrument(skip(self))]
    pub async fn create_order(
        &self,
        amount_paise: i64,
        receipt: &str,
    ) -> Result<GatewayOrder, PaymentError> {
        if !(MIN_AMOUNT_PAISE..=MAX_AMOUNT_PAISE).contains(&amount_paise) {
            return Err(PaymentError::AmountOutOfRange);
        }

        let body = CreateOrderBody {
            amount: amount_paise,
            currency: "INR",
            receipt,
            payment_capture: true,
        };
        let response = self
            .inner
            .client
            .post(format!("{}/orders", self.inner.api_base))
            .basic_auth(&self.inner.key_id, Some(self.inner.key_secret.expose_secret()))
            .json(&body)
            .send()
            .await?;

        handle_response(response).await
    }

    /// Fetch a payment by id.
    ///
    /// # Errors
    ///
    /// Returns the gateway's error.
    #[instrument(skip(self))]
    pub async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, PaymentError> {
        let response = self
            .inner
            .client
            .get(format!("{}/payments/{payment_id}", self.inner.api_base))
            .basic_auth(&self.inner.key_id, Some(self.inner.key_secret.expose_secret()))
            .send()
            .await?;

        handle_response(response).await
    }

    /// Check the checkout signature for an order and payment.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidSignature` when it does not match.
    pub fn verify_signature(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), PaymentError> {
        verify_signature(
            self.inner.key_secret.expose_secret(),
            gateway_order_id,
            payment_id,
            signature,
        )
    }
}

impl std::fmt::Debug for RazorpayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayClient")
            .field("api_base", &self.inner.api_base)
            .field("key_id", &self.inner.key_id)
            .finish_non_exhaustive()
    }
}

/// Verify `signature` (hex) against `HMAC_SHA256(secret, "{order}|{payment}")`.
///
/// The comparison is constant time.
///
/// # Errors
///
/// Returns `PaymentError::InvalidSignature` on mismatch or malformed hex.
pub fn verify_signature(
    secret: &str,
    gateway_order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<(), PaymentError> {
    let provided = hex::decode(signature.trim()).map_err(|_| PaymentError::InvalidSignature)?;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| PaymentError::InvalidSignature)?;
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    mac.verify_slice(&provided)
        .map_err(|_| PaymentError::InvalidSignature)
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, PaymentError> {
    let status = response.status();

    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(format!("Failed to parse response: {e}")));
    }

    if status.as_u16() == 401 {
        return Err(PaymentError::Unauthorized);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    tracing::warn!(status = %status, body = %message.chars().take(300).collect::<String>(), "Razorpay error");

    Err(PaymentError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_key_secret";
    const ORDER: &str = "order_IluGWxBm9U8zJ8";
    const PAYMENT: &str = "pay_IluQ6hv8dP1j4c";
    const SIGNATURE: &str = "165d42a4f86da6a1fd7e2d31cb5297517be2a02637174b3ee84df808d04f17ef";

    #[test]
    fn test_known_signature() {
        assert!(verify_signature(SECRET, ORDER, PAYMENT, SIGNATURE).is_ok());
    }

    #[test]
    fn test_tampered_signature() {
        let mut tampered = SIGNATURE.to_string();
        tampered.replace_range(0..1, "2");
        assert!(matches!(
            verify_signature(SECRET, ORDER, PAYMENT, &tampered),
            Err(PaymentError::InvalidSignature)
        ));
        assert!(verify_signature(SECRET, ORDER, "pay_other", SIGNATURE).is_err());
        assert!(verify_signature("other_secret", ORDER, PAYMENT, SIGNATURE).is_err());
    }

    #[test]
    fn test_malformed_signature() {
        assert!(verify_signature(SECRET, ORDER, PAYMENT, "not-hex").is_err());
        assert!(verify_signature(SECRET, ORDER, PAYMENT, "").is_err());
    }

    #[tokio::test]
    async fn test_amount_bounds_checked_before_request() {
        let client = RazorpayClient::new(&RazorpayConfig {
            key_id: "rzp_test_id".to_string(),
            key_secret: SecretString::from(SECRET),
            api_base: "http://127.0.0.1:9".to_string(),
        })
        .unwrap_or_else(|e| panic!("client: {e}"));

        assert!(matches!(
            client.create_order(99, "r").await,
            Err(PaymentError::AmountOutOfRange)
        ));
        assert!(matches!(
            client.create_order(500_001, "r").await,
            Err(PaymentError::AmountOutOfRange)
        ));
    }
}
