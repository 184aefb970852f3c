//! Order management and the production queue.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use cozycat_core::pagination::PageRequest;
use cozycat_core::{CustomerId, IngredientId, OrderId, OrderStatus, UserId};

use super::RepositoryError;
use crate::models::{
    CustomerSummary, DeliveryAddress, Order, OrderDetail, OrderItem, OrderListRow, OrderQuery,
};
use crate::services::production::{self, ProductionItem, RecipeLine};

pub(crate) const ORDER_COLUMNS: &str = "o.id, o.order_number, o.customer_id, \
     o.delivery_address_id, o.status, o.payment_status, o.payment_method, o.subtotal, \
     o.delivery_fee, o.discount_amount, o.total_amount, o.notes, o.delivery_notes, \
     o.customer_snapshot, o.gateway_order_id, o.gateway_payment_id, \
     o.preferred_delivery_date, o.actual_delivery_date, o.confirmed_at, o.confirmed_by, \
     o.created_at, o.updated_at";

/// Display name from the customer record, falling back to the checkout snapshot.
const CUSTOMER_NAME: &str = "COALESCE(NULLIF(TRIM(CONCAT(c.first_name, ' ', c.last_name)), ''), \
     TRIM(CONCAT(o.customer_snapshot->>'first_name', ' ', o.customer_snapshot->>'last_name')))";

const ITEM_SELECT: &str = "SELECT i.id, i.order_id, i.product_id, i.variant_id, i.batch_id, \
     p.name AS product_name, v.weight_grams, i.quantity, i.unit_price, i.total_price \
     FROM order_items i \
     JOIN products p ON p.id = i.product_id \
     JOIN product_variants v ON v.id = i.variant_id";

const CUSTOMER_COLUMNS: &str =
    "id, first_name, last_name, phone, email, total_orders, total_spent";

/// Result of a status change.
#[derive(Debug, Clone)]
pub struct Transition {
    pub order: Order,
    pub previous: OrderStatus,
    /// Ingredients deducted when the order entered production.
    pub deducted: Vec<(IngredientId, Decimal)>,
}

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of orders for the admin list.
    ///
    /// Without a status filter cancelled orders are left out.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn paginated(
        &self,
        query: &OrderQuery,
        page: PageRequest,
    ) -> Result<(Vec<OrderListRow>, i64), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM orders o LEFT JOIN customers c ON c.id = o.customer_id WHERE TRUE",
        );
        push_order_filter(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut list = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ORDER_COLUMNS}, {CUSTOMER_NAME} AS customer_name, \
             (SELECT COUNT(*) FROM order_items i WHERE i.order_id = o.id) AS item_count \
             FROM orders o LEFT JOIN customers c ON c.id = o.customer_id WHERE TRUE"
        ));
        push_order_filter(&mut list, query);
        list.push(" ORDER BY ")
            .push(query.sort_by.order_clause(query.sort_order))
            .push(" LIMIT ")
            .push_bind(page.limit_i64())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let mut rows = list
            .build_query_as::<OrderListRow>()
            .fetch_all(self.pool)
            .await?;

        if query.include_customer {
            let ids: Vec<CustomerId> = rows.iter().filter_map(|r| r.order.customer_id).collect();
            let mut customers = self.customers_by_id(&ids).await?;
            for row in &mut rows {
                row.customer = row.order.customer_id.and_then(|id| customers.remove(&id));
            }
        }

        if query.include_items {
            let ids: Vec<OrderId> = rows.iter().map(|r| r.order.id).collect();
            let mut items = self.items_by_order(&ids).await?;
            for row in &mut rows {
                row.items = Some(items.remove(&row.order.id).unwrap_or_default());
            }
        }

        Ok((rows, total))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = $1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(order)
    }

    /// Order with items, customer record and delivery address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn get_detail(&self, id: OrderId) -> Result<OrderDetail, RepositoryError> {
        let order = self.get(id).await?.ok_or(RepositoryError::NotFound)?;

        let items = self
            .items_by_order(&[id])
            .await?
            .remove(&id)
            .unwrap_or_default();

        let customer = match order.customer_id {
            Some(customer_id) => self.customers_by_id(&[customer_id]).await?.remove(&customer_id),
            None => None,
        };

        let address = match order.delivery_address_id {
            Some(address_id) => {
                sqlx::query_as::<_, DeliveryAddress>(
                    "SELECT id, address_line1, address_line2, landmark, city, state, pincode, \
                     delivery_notes FROM customer_addresses WHERE id = $1",
                )
                .bind(address_id)
                .fetch_optional(self.pool)
                .await?
            }
            None => None,
        };

        Ok(OrderDetail {
            order,
            items,
            customer,
            address,
        })
    }

    async fn items_by_order(
        &self,
        ids: &[OrderId],
    ) -> Result<HashMap<OrderId, Vec<OrderItem>>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!("{ITEM_SELECT} WHERE i.order_id = ANY($1) ORDER BY i.created_at, p.name");
        let items = sqlx::query_as::<_, OrderItem>(&sql)
            .bind(ids)
            .fetch_all(self.pool)
            .await?;

        let mut grouped: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in items {
            grouped.entry(item.order_id).or_default().push(item);
        }
        Ok(grouped)
    }

    async fn customers_by_id(
        &self,
        ids: &[CustomerId],
    ) -> Result<HashMap<CustomerId, CustomerSummary>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, CustomerSummary>(&sql)
            .bind(ids)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(|c| (c.id, c)).collect())
    }

    /// Move an order to `next`, applying the side effects of the new status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Conflict` if the transition is not allowed.
    pub async fn transition(
        &self,
        id: OrderId,
        next: OrderStatus,
        actor: UserId,
    ) -> Result<Transition, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let transition = transition_in(&mut tx, id, next, actor).await?;
        tx.commit().await?;
        Ok(transition)
    }

    // =========================================================================
    // Production queue
    // =========================================================================

    /// Orders awaiting production, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn production_queue(&self) -> Result<Vec<OrderDetail>, RepositoryError> {
        self.details_with_status(&[
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::ReadyProduction,
        ])
        .await
    }

    /// Orders with any of `statuses`, oldest first, with items and customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn details_with_status(
        &self,
        statuses: &[OrderStatus],
    ) -> Result<Vec<OrderDetail>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders o WHERE o.status = ANY($1) ORDER BY o.created_at ASC"
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(statuses)
            .fetch_all(self.pool)
            .await?;

        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let mut items = self.items_by_order(&ids).await?;
        let customer_ids: Vec<CustomerId> = orders.iter().filter_map(|o| o.customer_id).collect();
        let customers = self.customers_by_id(&customer_ids).await?;

        Ok(orders
            .into_iter()
            .map(|order| OrderDetail {
                items: items.remove(&order.id).unwrap_or_default(),
                customer: order.customer_id.and_then(|id| customers.get(&id).cloned()),
                address: None,
                order,
            })
            .collect())
    }

    /// Recipe lines with stock and supplier for every product in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recipe_lines(&self) -> Result<Vec<RecipeLine>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        recipe_lines_in(&mut conn, None).await
    }
}

fn push_order_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &OrderQuery) {
    match filter.status {
        Some(status) => {
            query.push(" AND o.status = ").push_bind(status);
        }
        None => {
            query.push(" AND o.status <> 'cancelled'");
        }
    }
    if let Some(start) = filter.start_date {
        query.push(" AND o.created_at >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        query.push(" AND o.created_at <= ").push_bind(end);
    }
    if let Some(term) = filter.search_term() {
        let pattern = format!("%{term}%");
        query
            .push(" AND (o.order_number ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR o.customer_snapshot->>'phone' ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR ")
            .push(CUSTOMER_NAME)
            .push(" ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

async fn recipe_lines_in(
    conn: &mut PgConnection,
    order_id: Option<OrderId>,
) -> Result<Vec<RecipeLine>, RepositoryError> {
    let lines = sqlx::query_as::<_, RecipeLine>(
        r"
        SELECT r.product_id, r.ingredient_id, g.name AS ingredient_name, g.unit,
               r.percentage, g.current_stock,
               v.name AS supplier_name, v.phone AS supplier_phone, v.email AS supplier_email
        FROM product_recipes r
        JOIN ingredients g ON g.id = r.ingredient_id
        LEFT JOIN vendors v ON v.id = g.vendor_id
        WHERE $1::uuid IS NULL
           OR r.product_id IN (SELECT product_id FROM order_items WHERE order_id = $1)
        ",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(lines)
}

/// Status change inside an open transaction.
///
/// The order row is locked first. Entering `confirmed` stamps who confirmed
/// it; entering `in_production` deducts its ingredients from stock (never
/// below zero); entering `delivered` stamps the delivery time.
pub(crate) async fn transition_in(
    conn: &mut PgConnection,
    id: OrderId,
    next: OrderStatus,
    actor: UserId,
) -> Result<Transition, RepositoryError> {
    let previous: OrderStatus =
        sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(RepositoryError::NotFound)?;

    if !previous.can_transition_to(next) {
        return Err(RepositoryError::Conflict(format!(
            "Cannot move order from {previous} to {next}"
        )));
    }

    let sql = format!(
        r"
        UPDATE orders o
        SET status = $2,
            confirmed_at = CASE WHEN $2 = 'confirmed'::order_status THEN NOW() ELSE confirmed_at END,
            confirmed_by = CASE WHEN $2 = 'confirmed'::order_status THEN $3 ELSE confirmed_by END,
            actual_delivery_date = CASE WHEN $2 = 'delivered'::order_status THEN NOW()
                                        ELSE actual_delivery_date END,
            updated_at = NOW()
        WHERE o.id = $1
        RETURNING {ORDER_COLUMNS}
        "
    );
    let order = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .bind(next)
        .bind(actor)
        .fetch_one(&mut *conn)
        .await?;

    let deducted = if next == OrderStatus::InProduction {
        deduct_ingredients(conn, id).await?
    } else {
        Vec::new()
    };

    Ok(Transition {
        order,
        previous,
        deducted,
    })
}

async fn deduct_ingredients(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<Vec<(IngredientId, Decimal)>, RepositoryError> {
    let items = sqlx::query_as::<_, ProductionItem>(
        r"
        SELECT i.order_id, i.product_id, v.weight_grams, i.quantity
        FROM order_items i
        JOIN product_variants v ON v.id = i.variant_id
        WHERE i.order_id = $1
        ",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    let recipes = recipe_lines_in(conn, Some(order_id)).await?;
    let requirements = production::requirements_for(&items, &recipes);

    let mut deducted = Vec::with_capacity(requirements.len());
    for req in requirements {
        sqlx::query(
            "UPDATE ingredients SET current_stock = GREATEST(current_stock - $2, 0), \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(req.ingredient_id)
        .bind(req.required_quantity)
        .execute(&mut *conn)
        .await?;

        if req.required_quantity > req.current_stock {
            tracing::warn!(
                ingredient = %req.ingredient_name,
                required = %req.required_quantity,
                in_stock = %req.current_stock,
                "Production started with insufficient stock"
            );
        }
        deducted.push((req.ingredient_id, req.required_quantity));
    }
    Ok(deducted)
}

/// Move an order to `next` when its current status allows it.
///
/// Returns `None` and leaves the order untouched otherwise.
pub(crate) async fn advance_in(
    conn: &mut PgConnection,
    id: OrderId,
    next: OrderStatus,
    actor: UserId,
) -> Result<Option<Transition>, RepositoryError> {
    match transition_in(conn, id, next, actor).await {
        Ok(transition) => Ok(Some(transition)),
        Err(RepositoryError::Conflict(reason)) => {
            tracing::debug!(order_id = %id, %reason, "order left unchanged");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
