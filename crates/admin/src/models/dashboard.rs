//! Dashboard view models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cozycat_core::{Money, OrderId, OrderStatus, ProductId};

/// Largest `activity_limit` accepted by the dashboard.
pub const MAX_ACTIVITY: i64 = 50;
pub const DEFAULT_ACTIVITY: i64 = 10;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecentOrder {
    pub id: OrderId,
    pub order_number: String,
    pub customer_name: String,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
}

/// Headline numbers. Revenue and order totals leave cancelled orders out.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_products: i64,
    pub total_orders: i64,
    pub total_users: i64,
    pub total_revenue: Money,
    pub pending_orders: i64,
    pub recent_orders: Vec<RecentOrder>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderStatusStat {
    pub status: OrderStatus,
    pub count: i64,
    pub revenue: Money,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductPerformance {
    pub product_id: ProductId,
    pub product_name: String,
    pub units_sold: i64,
    pub revenue: Money,
}

/// One line of the activity feed.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ActivityItem {
    /// `order`, `batch` or `delivery`.
    pub kind: String,
    pub reference: String,
    pub status: String,
    pub at: DateTime<Utc>,
}

/// Optional sections of `GET /api/admin/dashboard`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub include_order_stats: bool,
    #[serde(default)]
    pub include_product_performance: bool,
    #[serde(default)]
    pub include_activity: bool,
    pub activity_limit: Option<i64>,
}

impl DashboardQuery {
    /// Activity limit clamped to `1..=50`, default 10.
    #[must_use]
    pub fn activity_limit(&self) -> i64 {
        self.activity_limit
            .unwrap_or(DEFAULT_ACTIVITY)
            .clamp(1, MAX_ACTIVITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_limit() {
        let mut query = DashboardQuery::default();
        assert_eq!(query.activity_limit(), 10);
        query.activity_limit = Some(0);
        assert_eq!(query.activity_limit(), 1);
        query.activity_limit = Some(500);
        assert_eq!(query.activity_limit(), 50);
        query.activity_limit = Some(25);
        assert_eq!(query.activity_limit(), 25);
    }
}
