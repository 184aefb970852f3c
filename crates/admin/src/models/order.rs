//! Orders as staff see them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use cozycat_core::{
    AddressId, BatchId, CustomerId, Money, OrderId, OrderItemId, OrderStatus, PaymentMethod,
    PaymentStatus, ProductId, UserId, VariantId,
};

/// Contact and address details captured at checkout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    #[serde(default)]
    pub first_name: String,
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: String,
    pub email: Option<String>,
    pub whatsapp_number: Option<String>,
    #[serde(default)]
    pub is_whatsapp_preferred: bool,
    #[serde(default)]
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub landmark: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub pincode: String,
    #[serde(default)]
    pub is_guest: bool,
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
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub preferred_delivery_date: Option<NaiveDate>,
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub batch_id: Option<BatchId>,
    pub product_name: String,
    pub weight_grams: i32,
    pub quantity: i32,
    pub unit_price: Money,
    pub total_price: Money,
}

/// Customer record summary attached to order views.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CustomerSummary {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub total_orders: i32,
    pub total_spent: Money,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DeliveryAddress {
    pub id: AddressId,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub landmark: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub delivery_notes: Option<String>,
}

/// Row of the paginated order list.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderListRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: Order,
    pub customer_name: String,
    pub item_count: i64,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerSummary>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<OrderItem>>,
}

/// Full order view for the detail page.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub customer: Option<CustomerSummary>,
    pub address: Option<DeliveryAddress>,
}

/// Sort column for the paginated order list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSortBy {
    #[default]
    CreatedAt,
    TotalAmount,
    Status,
    CustomerName,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl OrderSortBy {
    /// `ORDER BY` clause. Only ever interpolates constants.
    #[must_use]
    pub const fn order_clause(self, order: SortOrder) -> &'static str {
        match (self, order) {
            (Self::CreatedAt, SortOrder::Asc) => "o.created_at ASC",
            (Self::CreatedAt, SortOrder::Desc) => "o.created_at DESC",
            (Self::TotalAmount, SortOrder::Asc) => "o.total_amount ASC, o.created_at DESC",
            (Self::TotalAmount, SortOrder::Desc) => "o.total_amount DESC, o.created_at DESC",
            (Self::Status, SortOrder::Asc) => "o.status ASC, o.created_at DESC",
            (Self::Status, SortOrder::Desc) => "o.status DESC, o.created_at DESC",
            (Self::CustomerName, SortOrder::Asc) => "customer_name ASC, o.created_at DESC",
            (Self::CustomerName, SortOrder::Desc) => "customer_name DESC, o.created_at DESC",
        }
    }
}

/// Body of `POST /api/admin/orders/paginated`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<OrderStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: OrderSortBy,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default = "default_true")]
    pub include_customer: bool,
    #[serde(default)]
    pub include_items: bool,
}

const fn default_true() -> bool {
    true
}

impl OrderQuery {
    /// Trimmed search text, `None` when blank.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Body of a status change request.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate<S> {
    pub status: S,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_query_defaults() {
        let query: OrderQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.sort_by, OrderSortBy::CreatedAt);
        assert_eq!(query.sort_order, SortOrder::Desc);
        assert!(query.include_customer);
        assert!(!query.include_items);
        assert!(query.status.is_none());
    }

    #[test]
    fn test_search_term_trims_blank() {
        let query: OrderQuery = serde_json::from_str(r#"{"search": "   "}"#).unwrap();
        assert!(query.search_term().is_none());
        let query: OrderQuery = serde_json::from_str(r#"{"search": " CC-1 "}"#).unwrap();
        assert_eq!(query.search_term(), Some("CC-1"));
    }

    #[test]
    fn test_sort_clause() {
        assert_eq!(
            OrderSortBy::CustomerName.order_clause(SortOrder::Asc),
            "customer_name ASC, o.created_at DESC"
        );
        let by: OrderSortBy = serde_json::from_str(r#""total_amount""#).unwrap();
        assert_eq!(by, OrderSortBy::TotalAmount);
    }

    #[test]
    fn test_snapshot_tolerates_missing_fields() {
        let snap: CustomerSnapshot = serde_json::from_str(r#"{"phone": "9876543210"}"#).unwrap();
        assert_eq!(snap.phone, "9876543210");
        assert!(!snap.is_guest);
    }
}
