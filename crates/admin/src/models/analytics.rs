//! Analytics request and report types.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use cozycat_core::pagination::{PageRequest, Pagination};
use cozycat_core::{CustomerId, Money, ProductId};

use super::dashboard::OrderStatusStat;
use crate::services::inventory::InventoryReport;

/// Days covered when no start date is given.
pub const DEFAULT_RANGE_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsType {
    Revenue,
    Customers,
    Products,
    Inventory,
    Orders,
}

impl AnalyticsType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::Customers => "customers",
            Self::Products => "products",
            Self::Inventory => "inventory",
            Self::Orders => "orders",
        }
    }

    /// Customer and product reports are paged; the others return everything.
    #[must_use]
    pub const fn is_paginated(self) -> bool {
        matches!(self, Self::Customers | Self::Products)
    }
}

impl fmt::Display for AnalyticsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket size of the revenue series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    Day,
    Week,
    Month,
}

impl GroupBy {
    /// Field name for `date_trunc`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

/// Body of `POST /api/admin/analytics` and query of the CSV export.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsRequest {
    #[serde(rename = "type")]
    pub kind: AnalyticsType,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub group_by: GroupBy,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(default = "default_true")]
    pub use_cache: bool,
}

impl AnalyticsRequest {
    /// Resolved date window, both ends inclusive.
    ///
    /// Defaults to the last 30 days ending `today`. Reversed bounds are swapped.
    #[must_use]
    pub fn date_window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let end = self.end_date.unwrap_or(today);
        let start = self
            .start_date
            .unwrap_or_else(|| end - Duration::days(DEFAULT_RANGE_DAYS));
        if start > end { (end, start) } else { (start, end) }
    }

    #[must_use]
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

/// Query a repository understands: a half-open time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnalyticsRange {
    pub from: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl AnalyticsRange {
    /// Midnight of `start` up to (excluding) midnight after `end`.
    #[must_use]
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        let from = start.and_time(NaiveTime::MIN).and_utc();
        let until = (end + Duration::days(1)).and_time(NaiveTime::MIN).and_utc();
        Self { from, until }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RevenuePoint {
    pub period: DateTime<Utc>,
    pub orders: i64,
    pub revenue: Money,
    pub average_order_value: Money,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CustomerSpend {
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub phone: String,
    pub orders: i64,
    pub total_spent: Money,
    pub last_order_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub product_name: String,
    pub units_sold: i64,
    pub orders: i64,
    pub revenue: Money,
}

/// Report payload; serialized without a wrapper.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnalyticsData {
    Revenue(Vec<RevenuePoint>),
    Customers(Vec<CustomerSpend>),
    Products(Vec<ProductSales>),
    Inventory(InventoryReport),
    Orders(Vec<OrderStatusStat>),
}

/// A computed report with its paging information.
#[derive(Debug, Clone)]
pub struct AnalyticsReport {
    pub data: AnalyticsData,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsFilters {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub group_by: GroupBy,
}

/// `type` is `paginated` for paged reports and `full` otherwise.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsPagination {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(flatten)]
    pub details: Pagination,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsMeta {
    #[serde(rename = "type")]
    pub kind: AnalyticsType,
    pub fetched_at: DateTime<Utc>,
    pub filters: AnalyticsFilters,
    pub pagination: AnalyticsPagination,
    pub cache_enabled: bool,
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsResponse {
    pub success: bool,
    pub data: AnalyticsData,
    pub meta: AnalyticsMeta,
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_request_defaults() {
        let request: AnalyticsRequest = serde_json::from_str(r#"{"type": "revenue"}"#).unwrap();
        assert_eq!(request.kind, AnalyticsType::Revenue);
        assert_eq!(request.group_by, GroupBy::Day);
        assert!(request.use_cache);

        let (start, end) = request.date_window(date(2025, 3, 31));
        assert_eq!(end, date(2025, 3, 31));
        assert_eq!(start, date(2025, 3, 1));
    }

    #[test]
    fn test_reversed_window_is_swapped() {
        let request: AnalyticsRequest = serde_json::from_str(
            r#"{"type": "orders", "start_date": "2025-03-10", "end_date": "2025-03-01"}"#,
        )
        .unwrap();
        assert_eq!(
            request.date_window(date(2025, 4, 1)),
            (date(2025, 3, 1), date(2025, 3, 10))
        );
    }

    #[test]
    fn test_range_includes_whole_end_day() {
        let range = AnalyticsRange::from_dates(date(2025, 3, 1), date(2025, 3, 1));
        assert_eq!((range.until - range.from).num_hours(), 24);
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(serde_json::from_str::<AnalyticsRequest>(r#"{"type": "weather"}"#).is_err());
    }

    #[test]
    fn test_paginated_types() {
        assert!(AnalyticsType::Customers.is_paginated());
        assert!(AnalyticsType::Products.is_paginated());
        assert!(!AnalyticsType::Revenue.is_paginated());
        assert!(!AnalyticsType::Inventory.is_paginated());
    }
}
