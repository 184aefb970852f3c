//! Analytics queries over orders.
//!
//! Revenue, customer and product reports leave cancelled orders out.

use sqlx::PgPool;

use cozycat_core::pagination::PageRequest;

use super::RepositoryError;
use crate::models::analytics::{
    AnalyticsRange, CustomerSpend, GroupBy, ProductSales, RevenuePoint,
};
use crate::models::dashboard::OrderStatusStat;

pub struct AnalyticsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AnalyticsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Orders, revenue and average order value per period, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn revenue(
        &self,
        range: AnalyticsRange,
        group_by: GroupBy,
    ) -> Result<Vec<RevenuePoint>, RepositoryError> {
        let rows = sqlx::query_as::<_, RevenuePoint>(
            r"
            SELECT date_trunc($3, created_at) AS period,
                   COUNT(*) AS orders,
                   COALESCE(SUM(total_amount), 0) AS revenue,
                   ROUND(COALESCE(AVG(total_amount), 0), 2) AS average_order_value
            FROM orders
            WHERE status <> 'cancelled' AND created_at >= $1 AND created_at < $2
            GROUP BY period
            ORDER BY period
            ",
        )
        .bind(range.from)
        .bind(range.until)
        .bind(group_by.as_str())
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Customers ranked by spend within the range.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn customers(
        &self,
        range: AnalyticsRange,
        page: PageRequest,
    ) -> Result<(Vec<CustomerSpend>, i64), RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(DISTINCT customer_id)
            FROM orders
            WHERE status <> 'cancelled' AND customer_id IS NOT NULL
              AND created_at >= $1 AND created_at < $2
            ",
        )
        .bind(range.from)
        .bind(range.until)
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, CustomerSpend>(
            r"
            SELECT c.id AS customer_id,
                   TRIM(CONCAT(c.first_name, ' ', c.last_name)) AS customer_name,
                   c.phone,
                   COUNT(o.id) AS orders,
                   SUM(o.total_amount) AS total_spent,
                   MAX(o.created_at) AS last_order_at
            FROM orders o
            JOIN customers c ON c.id = o.customer_id
            WHERE o.status <> 'cancelled' AND o.created_at >= $1 AND o.created_at < $2
            GROUP BY c.id
            ORDER BY total_spent DESC, c.first_name
            LIMIT $3 OFFSET $4
            ",
        )
        .bind(range.from)
        .bind(range.until)
        .bind(page.limit_i64())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Products ranked by revenue within the range.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn products(
        &self,
        range: AnalyticsRange,
        page: PageRequest,
    ) -> Result<(Vec<ProductSales>, i64), RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(DISTINCT i.product_id)
            FROM order_items i
            JOIN orders o ON o.id = i.order_id
            WHERE o.status <> 'cancelled' AND o.created_at >= $1 AND o.created_at < $2
            ",
        )
        .bind(range.from)
        .bind(range.until)
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, ProductSales>(
            r"
            SELECT p.id AS product_id, p.name AS product_name,
                   SUM(i.quantity)::BIGINT AS units_sold,
                   COUNT(DISTINCT o.id) AS orders,
                   SUM(i.total_price) AS revenue
            FROM order_items i
            JOIN orders o ON o.id = i.order_id
            JOIN products p ON p.id = i.product_id
            WHERE o.status <> 'cancelled' AND o.created_at >= $1 AND o.created_at < $2
            GROUP BY p.id, p.name
            ORDER BY revenue DESC, p.name
            LIMIT $3 OFFSET $4
            ",
        )
        .bind(range.from)
        .bind(range.until)
        .bind(page.limit_i64())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Order count and revenue per status within the range, cancelled included.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn orders_by_status(
        &self,
        range: AnalyticsRange,
    ) -> Result<Vec<OrderStatusStat>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderStatusStat>(
            r"
            SELECT status, COUNT(*) AS count, COALESCE(SUM(total_amount), 0) AS revenue
            FROM orders
            WHERE created_at >= $1 AND created_at < $2
            GROUP BY status
            ORDER BY status
            ",
        )
        .bind(range.from)
        .bind(range.until)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
