//! Customer email: order confirmations and password resets.
//!
//! Uses SMTP via lettre. Only configured when `SMTP_HOST` is set; without
//! it the shop works as before and simply sends nothing.

use std::fmt::Write as _;

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use cozycat_core::PaymentMethod;

use crate::config::EmailConfig;
use crate::models::Order;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Outbound mail for customers.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send the order summary to the address given at checkout.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be built or sent.
    pub async fn send_order_confirmation(&self, to: &str, order: &Order) -> Result<(), EmailError> {
        let subject = format!("Order confirmation - CozyCat Kitchen #{}", order.order_number);
        self.send_text_email(to, &subject, &order_confirmation_text(order))
            .await
    }

    /// Send a password reset link.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be built or sent.
    pub async fn send_password_reset(
        &self,
        to: &str,
        name: &str,
        link: &str,
    ) -> Result<(), EmailError> {
        self.send_text_email(
            to,
            "Reset your password - CozyCat Kitchen",
            &password_reset_text(name, link),
        )
        .await
    }

    async fn send_text_email(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        self.mailer.send(email).await?;

        tracing::info!(subject = %subject, "Email sent successfully");
        Ok(())
    }
}

fn greeting(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        "Hi cat parent,".to_string()
    } else {
        format!("Hi {name},")
    }
}

/// Plain-text body of the order confirmation.
#[must_use]
pub fn order_confirmation_text(order: &Order) -> String {
    let customer = &order.customer_snapshot;
    let mut body = format!(
        "{}\n\nThank you for your order! We have received order {} and will start \
         cooking soon.\n\n",
        greeting(&customer.first_name),
        order.order_number
    );

    let _ = writeln!(body, "Subtotal:      {}", order.subtotal);
    let _ = writeln!(body, "Delivery fee:  {}", order.delivery_fee);
    if !order.discount_amount.is_zero() {
        let _ = writeln!(body, "Discount:      -{}", order.discount_amount);
    }
    let _ = writeln!(body, "Total:         {}", order.total_amount);
    let payment = match order.payment_method {
        PaymentMethod::Cod => "Cash on delivery",
        PaymentMethod::Online => "Online",
        PaymentMethod::Wallet => "Wallet",
    };
    let _ = writeln!(body, "Payment:       {payment}");

    let _ = write!(body, "\nDelivering to:\n{}\n", customer.address_line1);
    if let Some(line2) = customer.address_line2.as_deref().filter(|l| !l.is_empty()) {
        let _ = writeln!(body, "{line2}");
    }
    let _ = writeln!(
        body,
        "{}, {} {}",
        customer.city, customer.state, customer.pincode
    );
    if let Some(date) = order.preferred_delivery_date {
        let _ = writeln!(body, "Preferred date: {}", date.format("%d %b %Y"));
    }

    body.push_str(
        "\nTrack your order any time with the order number and your phone number.\n\n\
         Purrs,\nCozyCat Kitchen\n",
    );
    body
}

/// Plain-text body of the password reset email.
#[must_use]
pub fn password_reset_text(name: &str, link: &str) -> String {
    format!(
        "{}\n\nWe received a request to reset your CozyCat Kitchen password. \
         Open this link to choose a new one:\n\n{link}\n\n\
         The link works once and expires in one hour. If you did not ask for \
         a reset you can ignore this email.\n\nPurrs,\nCozyCat Kitchen\n",
        greeting(name)
    )
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use cozycat_core::{Money, OrderId, OrderStatus, PaymentStatus};
    use sqlx::types::Json;
    use uuid::Uuid;

    use super::*;
    use crate::models::CustomerSnapshot;

    fn placed_order() -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(Uuid::new_v4()),
            order_number: "ORD-48213097".to_string(),
            customer_id: None,
            delivery_address_id: None,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: PaymentMethod::Cod,
            subtotal: Money::from_rupees(898),
            delivery_fee: Money::from_rupees(0),
            discount_amount: Money::from_rupees(0),
            total_amount: Money::from_rupees(898),
            notes: None,
            delivery_notes: None,
            customer_snapshot: Json(CustomerSnapshot {
                first_name: "Asha".to_string(),
                phone: "9876543210".to_string(),
                email: Some("asha@example.in".to_string()),
                address_line1: "22 Hauz Khas Village".to_string(),
                city: "New Delhi".to_string(),
                state: "Delhi".to_string(),
                pincode: "110016".to_string(),
                is_guest: true,
                ..CustomerSnapshot::default()
            }),
            gateway_order_id: None,
            preferred_delivery_date: NaiveDate::from_ymd_opt(2025, 10, 20),
            actual_delivery_date: None,
            confirmed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_order_confirmation_text() {
        let body = order_confirmation_text(&placed_order());
        assert!(body.starts_with("Hi Asha,"));
        assert!(body.contains("ORD-48213097"));
        assert!(body.contains("Total:         ₹898.00"));
        assert!(body.contains("Cash on delivery"));
        assert!(body.contains("New Delhi, Delhi 110016"));
        assert!(body.contains("Preferred date: 20 Oct 2025"));
        assert!(!body.contains("Discount"));
    }

    #[test]
    fn test_password_reset_text() {
        let link = "https://cozycatkitchen.in/reset-password?token=abc123";
        let body = password_reset_text("  ", link);
        assert!(body.starts_with("Hi cat parent,"));
        assert!(body.contains(link));
        assert!(password_reset_text("Ravi", link).starts_with("Hi Ravi,"));
    }
}
