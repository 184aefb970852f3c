//! Order placement, history and tracking.

use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use cozycat_core::pagination::PageRequest;
use cozycat_core::{AddressId, CustomerId, OrderId, OrderStatus, PaymentStatus, UserId};

use super::customers::insert_address;
use super::{RepositoryError, conflict_on_unique};
use crate::models::{
    AddressInput, CustomerSnapshot, NewOrder, Order, OrderDetail, OrderItem, OrderSummary,
};

pub(crate) const ORDER_COLUMNS: &str = "o.id, o.order_number, o.customer_id, \
     o.delivery_address_id, o.status, o.payment_status, o.payment_method, o.subtotal, \
     o.delivery_fee, o.discount_amount, o.total_amount, o.notes, o.delivery_notes, \
     o.customer_snapshot, o.gateway_order_id, o.preferred_delivery_date, \
     o.actual_delivery_date, o.confirmed_at, o.created_at, o.updated_at";

/// Repository for customer-facing order operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order.
    ///
    /// Resolves the customer (the user's own record, or a guest record
    /// keyed by phone), saves a new address to the book when asked,
    /// inserts the order and its items, and bumps the customer's order
    /// aggregates. Everything happens in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order number is taken.
    /// Returns `RepositoryError::Database` if any write fails; nothing is kept.
    pub async fn create(
        &self,
        order: &NewOrder,
        user_id: Option<UserId>,
        address: OrderAddress<'_>,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let customer_id = resolve_customer(&mut tx, &order.customer, user_id).await?;
        let delivery_address_id = match address {
            OrderAddress::Unsaved => None,
            OrderAddress::Saved(id) => Some(id),
            OrderAddress::SaveNew(input) => {
                Some(insert_address(&mut tx, customer_id, input).await?.id)
            }
        };

        let sql = format!(
            r"
            INSERT INTO orders AS o
                (order_number, customer_id, delivery_address_id, payment_method, subtotal,
                 delivery_fee, total_amount, notes, delivery_notes, customer_snapshot,
                 preferred_delivery_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ORDER_COLUMNS}
            "
        );
        let created = sqlx::query_as::<_, Order>(&sql)
            .bind(&order.order_number)
            .bind(customer_id)
            .bind(delivery_address_id)
            .bind(order.payment_method)
            .bind(order.subtotal)
            .bind(order.delivery_fee)
            .bind(order.total_amount)
            .bind(&order.notes)
            .bind(&order.delivery_notes)
            .bind(Json(&order.customer))
            .bind(order.preferred_delivery_date)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| conflict_on_unique(e, "order number"))?;

        if !order.items.is_empty() {
            let mut qb = QueryBuilder::<Postgres>::new(
                "INSERT INTO order_items (order_id, product_id, variant_id, quantity, unit_price, total_price) ",
            );
            qb.push_values(&order.items, |mut row, item| {
                row.push_bind(created.id)
                    .push_bind(item.product_id)
                    .push_bind(item.variant_id)
                    .push_bind(item.quantity)
                    .push_bind(item.unit_price)
                    .push_bind(item.total_price);
            });
            qb.build().execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
            UPDATE customers
            SET total_orders = total_orders + 1,
                total_spent = total_spent + $2,
                first_order_date = COALESCE(first_order_date, NOW()),
                last_order_date = NOW(),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(customer_id)
        .bind(order.total_amount)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Line items of an order with product names for display.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_for(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderItem>(
            r"
            SELECT i.id, i.product_id, i.variant_id, p.name AS product_name,
                   p.slug AS product_slug, p.image_url, v.weight_grams,
                   i.quantity, i.unit_price, i.total_price
            FROM order_items i
            JOIN products p ON p.id = i.product_id
            JOIN product_variants v ON v.id = i.variant_id
            WHERE i.order_id = $1
            ORDER BY i.created_at, p.name
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// An order placed by `user_id`, with items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find_for_user(
        &self,
        order_number: &str,
        user_id: UserId,
    ) -> Result<Option<OrderDetail>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders o
             JOIN customers c ON c.id = o.customer_id
             WHERE o.order_number = $1 AND c.user_id = $2"
        );
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(order_number)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;
        self.with_items(order).await
    }

    /// Guest tracking lookup: the order number plus the phone used at checkout.
    ///
    /// Phones are compared on their last ten digits so a country code
    /// prefix does not matter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn track(
        &self,
        order_number: &str,
        national_phone: &str,
    ) -> Result<Option<OrderDetail>, RepositoryError> {
        let sql = format!(
            r"SELECT {ORDER_COLUMNS} FROM orders o
             WHERE o.order_number = $1
               AND right(regexp_replace(o.customer_snapshot->>'phone', '\D', '', 'g'), 10) = $2"
        );
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(order_number)
            .bind(national_phone)
            .fetch_optional(self.pool)
            .await?;
        self.with_items(order).await
    }

    /// A page of the user's order history, newest first, with the total count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<(Vec<OrderSummary>, i64), RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM orders o
            JOIN customers c ON c.id = o.customer_id
            WHERE c.user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, OrderSummary>(
            r"
            SELECT o.id, o.order_number, o.status, o.payment_status, o.total_amount,
                   (SELECT COALESCE(SUM(quantity), 0) FROM order_items WHERE order_id = o.id)::BIGINT
                       AS item_count,
                   o.created_at
            FROM orders o
            JOIN customers c ON c.id = o.customer_id
            WHERE c.user_id = $1
            ORDER BY o.created_at DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(user_id)
        .bind(page.limit_i64())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Remember the payment gateway's order id for later verification.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_gateway_order(
        &self,
        id: OrderId,
        gateway_order_id: &str,
    ) -> Result<(), RepositoryError> {
        let updated = sqlx::query(
            "UPDATE orders SET gateway_order_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(gateway_order_id)
        .execute(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "gateway order"))?
        .rows_affected();

        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Record a captured online payment.
    ///
    /// Marks the order paid and, if it was still pending, confirmed.
    /// Already-paid orders are left untouched and returned as-is, so a
    /// repeated verification keeps the first payment id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has this gateway order id.
    pub async fn mark_paid(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
    ) -> Result<Settlement, RepositoryError> {
        let updated = sqlx::query_as::<_, Order>(&mark_paid_sql())
            .bind(gateway_order_id)
            .bind(gateway_payment_id)
            .bind(PaymentStatus::Paid)
            .bind(OrderStatus::Pending)
            .bind(OrderStatus::Confirmed)
            .fetch_optional(self.pool)
            .await?;
        if let Some(order) = updated {
            return Ok(Settlement::Captured(order));
        }

        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders o WHERE o.gateway_order_id = $1");
        sqlx::query_as::<_, Order>(&sql)
            .bind(gateway_order_id)
            .fetch_optional(self.pool)
            .await?
            .map(Settlement::AlreadyPaid)
            .ok_or(RepositoryError::NotFound)
    }

    async fn with_items(
        &self,
        order: Option<Order>,
    ) -> Result<Option<OrderDetail>, RepositoryError> {
        let Some(order) = order else {
            return Ok(None);
        };
        let items = self.items_for(order.id).await?;
        Ok(Some(OrderDetail { order, items }))
    }
}

/// The address book entry an order is delivered to.
#[derive(Debug, Clone, Copy)]
pub enum OrderAddress<'a> {
    /// Only the order's snapshot holds the address.
    Unsaved,
    Saved(AddressId),
    /// Add this address to the customer's book along with the order.
    SaveNew(&'a AddressInput),
}

/// Outcome of recording a gateway payment.
#[derive(Debug)]
pub enum Settlement {
    /// The payment was recorded by this call.
    Captured(Order),
    /// The order had already been paid; nothing changed.
    AlreadyPaid(Order),
}

impl Settlement {
    #[must_use]
    pub fn order(&self) -> &Order {
        match self {
            Self::Captured(order) | Self::AlreadyPaid(order) => order,
        }
    }

    #[must_use]
    pub fn into_order(self) -> Order {
        match self {
            Self::Captured(order) | Self::AlreadyPaid(order) => order,
        }
    }
}

fn mark_paid_sql() -> String {
    format!(
        r"
        UPDATE orders AS o
        SET payment_status = $3,
            payment_method = 'online',
            gateway_payment_id = $2,
            status = CASE WHEN o.status = $4 THEN $5 ELSE o.status END,
            confirmed_at = CASE WHEN o.status = $4 THEN NOW() ELSE o.confirmed_at END,
            updated_at = NOW()
        WHERE o.gateway_order_id = $1
          AND o.payment_status <> 'paid'
        RETURNING {ORDER_COLUMNS}
        "
    )
}

/// Find or create the customer row an order belongs to.
async fn resolve_customer(
    tx: &mut Transaction<'_, Postgres>,
    snapshot: &CustomerSnapshot,
    user_id: Option<UserId>,
) -> Result<CustomerId, RepositoryError> {
    let existing: Option<CustomerId> = match user_id {
        Some(user_id) => {
            sqlx::query_scalar("SELECT id FROM customers WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&mut **tx)
                .await?
        }
        None => {
            sqlx::query_scalar(
                r"
                SELECT id FROM customers
                WHERE phone = $1 AND user_id IS NULL
                ORDER BY created_at
                LIMIT 1
                ",
            )
            .bind(&snapshot.phone)
            .fetch_optional(&mut **tx)
            .await?
        }
    };

    if let Some(id) = existing {
        sqlx::query(
            r"
            UPDATE customers
            SET phone = CASE WHEN phone = '' THEN $2 ELSE phone END,
                email = COALESCE(email, $3),
                whatsapp_number = COALESCE($4, whatsapp_number),
                is_whatsapp_preferred = $5,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&snapshot.phone)
        .bind(&snapshot.email)
        .bind(&snapshot.whatsapp_number)
        .bind(snapshot.is_whatsapp_preferred)
        .execute(&mut **tx)
        .await?;
        return Ok(id);
    }

    let id = sqlx::query_scalar(
        r"
        INSERT INTO customers
            (user_id, first_name, last_name, phone, email, whatsapp_number, is_whatsapp_preferred)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        ",
    )
    .bind(user_id)
    .bind(&snapshot.first_name)
    .bind(&snapshot.last_name)
    .bind(&snapshot.phone)
    .bind(&snapshot.email)
    .bind(&snapshot.whatsapp_number)
    .bind(snapshot.is_whatsapp_preferred)
    .fetch_one(&mut **tx)
    .await?;

    Ok(id)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use cozycat_core::{Money, PaymentMethod};
    use uuid::Uuid;

    use super::*;

    fn paid_order() -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(Uuid::new_v4()),
            order_number: "ORD-00000001".to_string(),
            customer_id: None,
            delivery_address_id: None,
            status: OrderStatus::Confirmed,
            payment_status: PaymentStatus::Paid,
            payment_method: PaymentMethod::Online,
            subtotal: Money::from_rupees(499),
            delivery_fee: Money::from_rupees(0),
            discount_amount: Money::from_rupees(0),
            total_amount: Money::from_rupees(499),
            notes: None,
            delivery_notes: None,
            customer_snapshot: Json(CustomerSnapshot::default()),
            gateway_order_id: Some("order_abc".to_string()),
            preferred_delivery_date: None,
            actual_delivery_date: None,
            confirmed_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_mark_paid_skips_paid_orders() {
        let sql = mark_paid_sql();
        assert!(sql.contains("WHERE o.gateway_order_id = $1"));
        assert!(sql.contains("AND o.payment_status <> 'paid'"));
        assert!(sql.contains("RETURNING o.id"));
    }

    #[test]
    fn test_repeat_settlement_returns_existing_order() {
        let order = paid_order();
        let confirmed_at = order.confirmed_at;
        let settlement = Settlement::AlreadyPaid(order);

        assert_eq!(settlement.order().payment_status, PaymentStatus::Paid);
        let order = settlement.into_order();
        assert_eq!(order.order_number, "ORD-00000001");
        assert_eq!(order.confirmed_at, confirmed_at);
    }
}
