//! Orders as the customer sees them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use cozycat_core::{
    AddressId, CustomerId, Money, OrderId, OrderItemId, OrderStatus, PaymentMethod,
    PaymentStatus, ProductId, VariantId,
};

/// Contact and address details captured at checkout.
///
/// Stored with the order so the record survives later profile or address
/// edits, and so guest orders keep their delivery details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub whatsapp_number: Option<String>,
    #[serde(default)]
    pub is_whatsapp_preferred: bool,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub landmark: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    #[serde(default)]
    pub is_guest: bool,
}

impl CustomerSnapshot {
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {last}", self.first_name),
            _ => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: Option<CustomerId>,
    pub delivery_address_id: Option<AddressId>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
    pub notes: Option<String>,
    pub delivery_notes: Option<String>,
    pub customer_snapshot: Json<CustomerSnapshot>,
    #[serde(skip_serializing)]
    pub gateway_order_id: Option<String>,
    pub preferred_delivery_date: Option<NaiveDate>,
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub product_name: String,
    pub product_slug: String,
    pub image_url: Option<String>,
    pub weight_grams: i32,
    pub quantity: i32,
    pub unit_price: Money,
    pub total_price: Money,
}

/// An order with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Row for the order history list.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderSummary {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Money,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

/// A validated line ready to insert.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: i32,
    pub unit_price: Money,
    pub total_price: Money,
}

/// Everything needed to insert an order in one transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub payment_method: PaymentMethod,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total_amount: Money,
    pub notes: Option<String>,
    pub delivery_notes: Option<String>,
    pub preferred_delivery_date: Option<NaiveDate>,
    pub customer: CustomerSnapshot,
    pub items: Vec<NewOrderItem>,
}

/// One step of the tracking timeline.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingStep {
    pub status: OrderStatus,
    pub label: &'static str,
    pub completed: bool,
    pub current: bool,
}

/// Lifecycle steps shown to the customer, marking how far `status` has got.
///
/// Cancelled orders show only the placed and cancelled steps.
#[must_use]
pub fn tracking_timeline(status: OrderStatus) -> Vec<TrackingStep> {
    const PATH: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::ReadyProduction,
        OrderStatus::InProduction,
        OrderStatus::ReadyDelivery,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
    ];

    if status == OrderStatus::Cancelled {
        return [OrderStatus::Pending, OrderStatus::Cancelled]
            .into_iter()
            .map(|s| TrackingStep {
                status: s,
                label: s.label(),
                completed: true,
                current: s == OrderStatus::Cancelled,
            })
            .collect();
    }

    let reached = PATH.iter().position(|s| *s == status).unwrap_or(0);
    PATH.iter()
        .enumerate()
        .map(|(i, s)| TrackingStep {
            status: *s,
            label: s.label(),
            completed: i <= reached,
            current: i == reached,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_progress() {
        let steps = tracking_timeline(OrderStatus::InProduction);
        assert_eq!(steps.len(), 7);
        assert_eq!(steps.iter().filter(|s| s.completed).count(), 4);
        assert_eq!(
            steps.iter().find(|s| s.current).map(|s| s.status),
            Some(OrderStatus::InProduction)
        );
    }

    #[test]
    fn test_timeline_cancelled() {
        let steps = tracking_timeline(OrderStatus::Cancelled);
        assert_eq!(steps.len(), 2);
        assert!(steps.iter().all(|s| s.completed));
    }

    #[test]
    fn test_snapshot_full_name() {
        let mut snap = CustomerSnapshot {
            first_name: "Meera".to_string(),
            ..CustomerSnapshot::default()
        };
        assert_eq!(snap.full_name(), "Meera");
        snap.last_name = Some("Iyer".to_string());
        assert_eq!(snap.full_name(), "Meera Iyer");
    }
}
