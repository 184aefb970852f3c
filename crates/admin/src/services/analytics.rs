//! Analytics reports with a five-minute cache and CSV export.

use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, instrument};

use cozycat_core::pagination::{PageRequest, Pagination};

use crate::db::{AnalyticsRepository, InventoryRepository, RepositoryError};
use crate::models::analytics::{
    AnalyticsData, AnalyticsFilters, AnalyticsMeta, AnalyticsPagination, AnalyticsRange,
    AnalyticsReport, AnalyticsRequest, AnalyticsResponse, AnalyticsType, GroupBy,
};
use crate::services::inventory::InventoryReport;

/// Rows in a CSV export of a paged report.
pub const EXPORT_LIMIT: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    kind: AnalyticsType,
    start: NaiveDate,
    end: NaiveDate,
    group_by: GroupBy,
    page: PageRequest,
}

/// Shared report cache, cloned into [`crate::state::AppState`].
#[derive(Clone)]
pub struct AnalyticsCache {
    inner: Cache<CacheKey, Arc<AnalyticsReport>>,
}

impl Default for AnalyticsCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

impl AnalyticsCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder().max_capacity(500).time_to_live(ttl).build(),
        }
    }

    /// Drop every cached report. Returns how many entries were held.
    pub fn clear(&self) -> u64 {
        let held = self.inner.entry_count();
        self.inner.invalidate_all();
        held
    }
}

pub struct AnalyticsService<'a> {
    pool: &'a PgPool,
    cache: &'a AnalyticsCache,
}

impl<'a> AnalyticsService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a AnalyticsCache) -> Self {
        Self { pool, cache }
    }

    /// Run a report, reading through the cache when the request allows it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    #[instrument(skip(self), fields(kind = %request.kind))]
    pub async fn run(
        &self,
        request: &AnalyticsRequest,
    ) -> Result<AnalyticsResponse, RepositoryError> {
        let (start, end) = request.date_window(Utc::now().date_naive());
        let page = request.page_request();
        let key = CacheKey {
            kind: request.kind,
            start,
            end,
            group_by: request.group_by,
            page,
        };

        let cached = if request.use_cache {
            self.cache.inner.get(&key).await
        } else {
            None
        };
        let hit = cached.is_some();

        let report = match cached {
            Some(report) => {
                debug!("analytics cache hit");
                report
            }
            None => {
                let report = self
                    .compute(request.kind, start, end, request.group_by, page)
                    .await?;
                let report = Arc::new(report);
                if request.use_cache {
                    self.cache.inner.insert(key, Arc::clone(&report)).await;
                }
                report
            }
        };

        let kind = if request.kind.is_paginated() { "paginated" } else { "full" };
        Ok(AnalyticsResponse {
            success: true,
            data: report.data.clone(),
            meta: AnalyticsMeta {
                kind: request.kind,
                fetched_at: Utc::now(),
                filters: AnalyticsFilters {
                    start_date: start,
                    end_date: end,
                    group_by: request.group_by,
                },
                pagination: AnalyticsPagination {
                    kind,
                    details: Pagination::new(page, report.total),
                },
                cache_enabled: request.use_cache,
                cached: hit,
            },
        })
    }

    /// Render a report as CSV, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    pub async fn export_csv(&self, request: &AnalyticsRequest) -> Result<String, RepositoryError> {
        let (start, end) = request.date_window(Utc::now().date_naive());
        let page = PageRequest::new(request.page, Some(request.limit.unwrap_or(EXPORT_LIMIT)));
        let report = self
            .compute(request.kind, start, end, request.group_by, page)
            .await?;
        Ok(to_csv(&report.data))
    }

    async fn compute(
        &self,
        kind: AnalyticsType,
        start: NaiveDate,
        end: NaiveDate,
        group_by: GroupBy,
        page: PageRequest,
    ) -> Result<AnalyticsReport, RepositoryError> {
        let repo = AnalyticsRepository::new(self.pool);
        let range = AnalyticsRange::from_dates(start, end);

        let (data, total) = match kind {
            AnalyticsType::Revenue => {
                let rows = repo.revenue(range, group_by).await?;
                let total = len_i64(rows.len());
                (AnalyticsData::Revenue(rows), total)
            }
            AnalyticsType::Customers => {
                let (rows, total) = repo.customers(range, page).await?;
                (AnalyticsData::Customers(rows), total)
            }
            AnalyticsType::Products => {
                let (rows, total) = repo.products(range, page).await?;
                (AnalyticsData::Products(rows), total)
            }
            AnalyticsType::Inventory => {
                let ingredients = InventoryRepository::new(self.pool).list_ingredients().await?;
                let report = InventoryReport::build(ingredients);
                let total = len_i64(report.ingredients.len());
                (AnalyticsData::Inventory(report), total)
            }
            AnalyticsType::Orders => {
                let rows = repo.orders_by_status(range).await?;
                let total = len_i64(rows.len());
                (AnalyticsData::Orders(rows), total)
            }
        };

        Ok(AnalyticsReport { data, total })
    }
}

fn len_i64(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
fn field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// CSV rendering of a report, header row first.
#[must_use]
pub fn to_csv(data: &AnalyticsData) -> String {
    let mut csv = String::new();
    match data {
        AnalyticsData::Revenue(rows) => {
            csv.push_str("Period,Orders,Revenue,Average Order Value\n");
            for r in rows {
                let _ = writeln!(
                    csv,
                    "{},{},{},{}",
                    r.period.date_naive(),
                    r.orders,
                    r.revenue.amount(),
                    r.average_order_value.amount()
                );
            }
        }
        AnalyticsData::Customers(rows) => {
            csv.push_str("Customer,Phone,Orders,Total Spent,Last Order\n");
            for r in rows {
                let _ = writeln!(
                    csv,
                    "{},{},{},{},{}",
                    field(&r.customer_name),
                    field(&r.phone),
                    r.orders,
                    r.total_spent.amount(),
                    r.last_order_at.to_rfc3339()
                );
            }
        }
        AnalyticsData::Products(rows) => {
            csv.push_str("Product,Units Sold,Orders,Revenue\n");
            for r in rows {
                let _ = writeln!(
                    csv,
                    "{},{},{},{}",
                    field(&r.product_name),
                    r.units_sold,
                    r.orders,
                    r.revenue.amount()
                );
            }
        }
        AnalyticsData::Inventory(report) => {
            csv.push_str("Ingredient,Unit,Current Stock,Reorder Level,Status,Stock Value,Vendor\n");
            for line in &report.ingredients {
                let _ = writeln!(
                    csv,
                    "{},{},{},{},{},{},{}",
                    field(&line.ingredient.name),
                    field(&line.ingredient.unit),
                    line.ingredient.current_stock,
                    line.ingredient.reorder_level,
                    line.level.as_str(),
                    line.stock_value.amount(),
                    field(line.ingredient.vendor_name.as_deref().unwrap_or("-"))
                );
            }
        }
        AnalyticsData::Orders(rows) => {
            csv.push_str("Status,Orders,Revenue\n");
            for r in rows {
                let _ = writeln!(csv, "{},{},{}", r.status, r.count, r.revenue.amount());
            }
        }
    }
    csv
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use cozycat_core::{Money, OrderStatus, ProductId};
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::analytics::{ProductSales, RevenuePoint};
    use crate::models::dashboard::OrderStatusStat;

    #[test]
    fn test_field_quoting() {
        assert_eq!(field("Chicken Stew"), "Chicken Stew");
        assert_eq!(field("Stew, large"), "\"Stew, large\"");
        assert_eq!(field("The \"Best\""), "\"The \"\"Best\"\"\"");
    }

    #[test]
    fn test_revenue_csv() {
        let data = AnalyticsData::Revenue(vec![RevenuePoint {
            period: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
            orders: 4,
            revenue: Money::new(Decimal::new(200_000, 2)),
            average_order_value: Money::new(Decimal::new(50_000, 2)),
        }]);
        let csv = to_csv(&data);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Period,Orders,Revenue,Average Order Value"));
        assert_eq!(lines.next(), Some("2025-03-01,4,2000.00,500.00"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_products_csv_quotes_names() {
        let data = AnalyticsData::Products(vec![ProductSales {
            product_id: ProductId::generate(),
            product_name: "Fish, rice & pumpkin".to_string(),
            units_sold: 12,
            orders: 5,
            revenue: Money::new(Decimal::new(360_000, 2)),
        }]);
        assert!(to_csv(&data).contains("\"Fish, rice & pumpkin\",12,5,3600.00"));
    }

    #[test]
    fn test_orders_csv_uses_wire_status() {
        let data = AnalyticsData::Orders(vec![OrderStatusStat {
            status: OrderStatus::ReadyDelivery,
            count: 3,
            revenue: Money::new(Decimal::new(90_000, 2)),
        }]);
        assert!(to_csv(&data).contains("ready_delivery,3,900.00"));
    }

    #[tokio::test]
    async fn test_cache_clear_reports_entries() {
        let cache = AnalyticsCache::default();
        let key = CacheKey {
            kind: AnalyticsType::Orders,
            start: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            group_by: GroupBy::Day,
            page: PageRequest::new(None, None),
        };
        cache
            .inner
            .insert(
                key.clone(),
                Arc::new(AnalyticsReport {
                    data: AnalyticsData::Orders(Vec::new()),
                    total: 0,
                }),
            )
            .await;
        cache.inner.run_pending_tasks().await;
        assert_eq!(cache.clear(), 1);
        assert!(cache.inner.get(&key).await.is_none());
    }
}
