//! Dashboard aggregates.

use sqlx::PgPool;

use cozycat_core::Money;

use super::RepositoryError;
use crate::models::dashboard::{
    ActivityItem, DashboardStats, OrderStatusStat, ProductPerformance, RecentOrder,
};

pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn stats(&self) -> Result<DashboardStats, RepositoryError> {
        let (total_products, total_orders, total_users, total_revenue, pending_orders): (
            i64,
            i64,
            i64,
            Money,
            i64,
        ) = sqlx::query_as(
                r"
                SELECT
                    (SELECT COUNT(*) FROM products),
                    (SELECT COUNT(*) FROM orders WHERE status <> 'cancelled'),
                    (SELECT COUNT(*) FROM profiles),
                    (SELECT COALESCE(SUM(total_amount), 0) FROM orders WHERE status <> 'cancelled'),
                    (SELECT COUNT(*) FROM orders WHERE status = 'pending')
                ",
            )
            .fetch_one(self.pool)
            .await?;

        let recent_orders = sqlx::query_as::<_, RecentOrder>(
            r"
            SELECT o.id, o.order_number,
                   COALESCE(NULLIF(TRIM(CONCAT(c.first_name, ' ', c.last_name)), ''),
                            NULLIF(TRIM(CONCAT(o.customer_snapshot->>'first_name', ' ',
                                               o.customer_snapshot->>'last_name')), ''),
                            'Guest') AS customer_name,
                   o.status, o.total_amount, o.created_at
            FROM orders o
            LEFT JOIN customers c ON c.id = o.customer_id
            ORDER BY o.created_at DESC
            LIMIT 5
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(DashboardStats {
            total_products,
            total_orders,
            total_users,
            total_revenue,
            pending_orders,
            recent_orders,
        })
    }

    /// Order count and revenue per status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn order_stats(&self) -> Result<Vec<OrderStatusStat>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderStatusStat>(
            r"
            SELECT status, COUNT(*) AS count, COALESCE(SUM(total_amount), 0) AS revenue
            FROM orders
            GROUP BY status
            ORDER BY status
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Units and revenue per product over non-cancelled orders, best sellers first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_performance(&self) -> Result<Vec<ProductPerformance>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductPerformance>(
            r"
            SELECT p.id AS product_id, p.name AS product_name,
                   COALESCE(SUM(i.quantity), 0)::BIGINT AS units_sold,
                   COALESCE(SUM(i.total_price), 0) AS revenue
            FROM products p
            LEFT JOIN order_items i ON i.product_id = p.id
                AND EXISTS (SELECT 1 FROM orders o WHERE o.id = i.order_id AND o.status <> 'cancelled')
            GROUP BY p.id, p.name
            ORDER BY revenue DESC, p.name
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Latest changes across orders, batches and deliveries.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_activity(&self, limit: i64) -> Result<Vec<ActivityItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, ActivityItem>(
            r"
            SELECT kind, reference, status, at FROM (
                SELECT 'order' AS kind, order_number AS reference, status::TEXT AS status,
                       updated_at AS at
                FROM orders
                UNION ALL
                SELECT 'batch', batch_number, status::TEXT, updated_at
                FROM production_batches
                UNION ALL
                SELECT 'delivery', delivery_number, status::TEXT, updated_at
                FROM deliveries
            ) activity
            ORDER BY at DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
