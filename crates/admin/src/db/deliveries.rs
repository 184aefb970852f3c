//! Deliveries and delivery partners.

use chrono::Utc;
use sqlx::PgPool;

use cozycat_core::{DeliveryId, DeliveryPartnerId, DeliveryStatus, OrderStatus, UserId};

use super::orders::{Transition, advance_in};
use super::{RepositoryError, conflict_on_unique, timestamp_number};
use crate::models::{
    AssignPartner, CustomerSummary, Delivery, DeliveryAddress, DeliveryFilter, DeliveryOrder,
    DeliveryPartner, DeliveryPartnerInput, DeliveryView, NewDelivery,
};

const DELIVERY_COLUMNS: &str = "id, delivery_number, order_id, batch_id, delivery_partner_id, \
     status, estimated_delivery_date, actual_delivery_date, tracking_number, notes, \
     created_at, updated_at";

const PARTNER_COLUMNS: &str =
    "id, name, phone, email, vehicle_type, vehicle_number, is_active, created_at, updated_at";

/// A delivery change together with the order change it caused, if any.
#[derive(Debug, Clone)]
pub struct DeliveryChange {
    pub delivery: Delivery,
    pub order: Option<Transition>,
}

pub struct DeliveryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DeliveryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Partners
    // =========================================================================

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_partners(&self) -> Result<Vec<DeliveryPartner>, RepositoryError> {
        let sql = format!("SELECT {PARTNER_COLUMNS} FROM delivery_partners ORDER BY name");
        let rows = sqlx::query_as::<_, DeliveryPartner>(&sql)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// `phone` is the normalized form returned by `DeliveryPartnerInput::validate`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_partner(
        &self,
        input: &DeliveryPartnerInput,
        phone: &str,
    ) -> Result<DeliveryPartner, RepositoryError> {
        let sql = format!(
            "INSERT INTO delivery_partners (name, phone, email, vehicle_type, vehicle_number, is_active)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PARTNER_COLUMNS}"
        );
        let partner = sqlx::query_as::<_, DeliveryPartner>(&sql)
            .bind(input.name.trim())
            .bind(phone)
            .bind(input.email.as_deref())
            .bind(input.vehicle_type.as_deref())
            .bind(input.vehicle_number.as_deref())
            .bind(input.is_active)
            .fetch_one(self.pool)
            .await?;
        Ok(partner)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the partner does not exist.
    pub async fn update_partner(
        &self,
        id: DeliveryPartnerId,
        input: &DeliveryPartnerInput,
        phone: &str,
    ) -> Result<DeliveryPartner, RepositoryError> {
        let sql = format!(
            "UPDATE delivery_partners
             SET name = $2, phone = $3, email = $4, vehicle_type = $5, vehicle_number = $6,
                 is_active = $7, updated_at = NOW()
             WHERE id = $1 RETURNING {PARTNER_COLUMNS}"
        );
        sqlx::query_as::<_, DeliveryPartner>(&sql)
            .bind(id)
            .bind(input.name.trim())
            .bind(phone)
            .bind(input.email.as_deref())
            .bind(input.vehicle_type.as_deref())
            .bind(input.vehicle_number.as_deref())
            .bind(input.is_active)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    // =========================================================================
    // Deliveries
    // =========================================================================

    /// Delivery views newest first.
    ///
    /// Every link is fetched on its own. A customer, address or partner that
    /// cannot be found leaves its fields empty; the customer name and phone
    /// then fall back to the checkout snapshot on the order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delivery query fails.
    pub async fn list_views(
        &self,
        filter: &DeliveryFilter,
    ) -> Result<Vec<DeliveryView>, RepositoryError> {
        let sql = format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries \
             WHERE $1::delivery_status IS NULL OR status = $1 \
             ORDER BY created_at DESC"
        );
        let deliveries = sqlx::query_as::<_, Delivery>(&sql)
            .bind(filter.status)
            .fetch_all(self.pool)
            .await?;

        let mut views = Vec::with_capacity(deliveries.len());
        for delivery in deliveries {
            views.push(self.assemble(delivery).await);
        }

        let term = filter.search.as_deref().map(str::trim).unwrap_or_default();
        if !term.is_empty() {
            views.retain(|view| view.matches(term));
        }
        Ok(views)
    }

    async fn assemble(&self, delivery: Delivery) -> DeliveryView {
        let mut view = DeliveryView::bare(delivery);

        let order = sqlx::query_as::<_, DeliveryOrder>(
            "SELECT id, order_number, status, total_amount, customer_id, delivery_address_id, \
             customer_snapshot FROM orders WHERE id = $1",
        )
        .bind(view.delivery.order_id)
        .fetch_optional(self.pool)
        .await;

        let order = match order {
            Ok(Some(order)) => order,
            Ok(None) => return view,
            Err(e) => {
                tracing::warn!(
                    delivery = %view.delivery.delivery_number,
                    error = %e,
                    "order lookup failed"
                );
                return view;
            }
        };

        view.order_number = Some(order.order_number.clone());
        view.order_status = Some(order.status);
        view.total_amount = Some(order.total_amount);

        let customer = match order.customer_id {
            Some(id) => sqlx::query_as::<_, CustomerSummary>(
                "SELECT id, first_name, last_name, phone, email, total_orders, total_spent \
                 FROM customers WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "customer lookup failed");
                None
            }),
            None => None,
        };

        let snapshot = &order.customer_snapshot.0;
        match customer {
            Some(customer) => {
                view.customer_name = Some(full_name(
                    &customer.first_name,
                    customer.last_name.as_deref(),
                ));
                view.customer_phone = Some(customer.phone);
            }
            None if !snapshot.first_name.is_empty() => {
                view.customer_name =
                    Some(full_name(&snapshot.first_name, snapshot.last_name.as_deref()));
                view.customer_phone = Some(snapshot.phone.clone()).filter(|p| !p.is_empty());
            }
            None => {}
        }

        if let Some(address_id) = order.delivery_address_id {
            view.address = sqlx::query_as::<_, DeliveryAddress>(
                "SELECT id, address_line1, address_line2, landmark, city, state, pincode, \
                 delivery_notes FROM customer_addresses WHERE id = $1",
            )
            .bind(address_id)
            .fetch_optional(self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "address lookup failed");
                None
            });
        }

        if let Some(partner_id) = view.delivery.delivery_partner_id {
            let partner: Option<(String, String)> =
                sqlx::query_as("SELECT name, phone FROM delivery_partners WHERE id = $1")
                    .bind(partner_id)
                    .fetch_optional(self.pool)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::warn!(error = %e, "partner lookup failed");
                        None
                    });
            if let Some((name, phone)) = partner {
                view.partner_name = Some(name);
                view.partner_phone = Some(phone);
            }
        }

        view
    }

    /// Create the delivery for a completed batch and mark the batch dispatched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the batch does not exist.
    /// Returns `RepositoryError::Conflict` if the batch belongs to another
    /// order or already has a delivery.
    pub async fn create(&self, input: &NewDelivery) -> Result<Delivery, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let batch: Option<(Option<cozycat_core::OrderId>, bool)> = sqlx::query_as(
            "SELECT order_id, delivery_created FROM production_batches WHERE id = $1 FOR UPDATE",
        )
        .bind(input.batch_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (batch_order, delivery_created) = batch.ok_or(RepositoryError::NotFound)?;
        if batch_order.is_some_and(|id| id != input.order_id) {
            return Err(RepositoryError::Conflict(
                "Batch belongs to a different order".to_string(),
            ));
        }
        if delivery_created {
            return Err(RepositoryError::Conflict(
                "Batch already has a delivery".to_string(),
            ));
        }

        let sql = format!(
            "INSERT INTO deliveries (delivery_number, order_id, batch_id, status, estimated_delivery_date, notes)
             VALUES ($1, $2, $3, 'pending', $4, $5) RETURNING {DELIVERY_COLUMNS}"
        );
        let delivery = sqlx::query_as::<_, Delivery>(&sql)
            .bind(timestamp_number("DEL", Utc::now()))
            .bind(input.order_id)
            .bind(input.batch_id)
            .bind(input.estimated_delivery_date)
            .bind(input.notes.as_deref())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match super::conflict_on_reference(e, "order") {
                RepositoryError::Conflict(_) => RepositoryError::NotFound,
                RepositoryError::Database(e) => conflict_on_unique(e, "delivery number"),
                other => other,
            })?;

        sqlx::query(
            "UPDATE production_batches SET delivery_created = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(input.batch_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(delivery_number = %delivery.delivery_number, "Delivery created");
        Ok(delivery)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the delivery or partner does not exist.
    /// Returns `RepositoryError::Conflict` if the parcel has already left.
    pub async fn assign(
        &self,
        id: DeliveryId,
        input: &AssignPartner,
    ) -> Result<Delivery, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: DeliveryStatus =
            sqlx::query_scalar("SELECT status FROM deliveries WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        if !current.accepts_assignment() {
            return Err(RepositoryError::Conflict(format!(
                "Cannot assign a partner to a {current} delivery"
            )));
        }

        let active: Option<bool> =
            sqlx::query_scalar("SELECT is_active FROM delivery_partners WHERE id = $1")
                .bind(input.delivery_partner_id)
                .fetch_optional(&mut *tx)
                .await?;
        match active {
            None => return Err(RepositoryError::NotFound),
            Some(false) => {
                return Err(RepositoryError::Conflict(
                    "Delivery partner is inactive".to_string(),
                ));
            }
            Some(true) => {}
        }

        let sql = format!(
            "UPDATE deliveries
             SET delivery_partner_id = $2, status = 'assigned',
                 tracking_number = COALESCE($3, tracking_number), updated_at = NOW()
             WHERE id = $1 RETURNING {DELIVERY_COLUMNS}"
        );
        let delivery = sqlx::query_as::<_, Delivery>(&sql)
            .bind(id)
            .bind(input.delivery_partner_id)
            .bind(input.tracking_number.as_deref())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(delivery)
    }

    /// Move a delivery forward.
    ///
    /// `in_transit` moves the order to `out_for_delivery` when it can go
    /// there. `delivered` stamps the delivery time and marks the order
    /// delivered unless it is already closed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the delivery does not exist.
    /// Returns `RepositoryError::Conflict` if the transition is not allowed.
    pub async fn update_status(
        &self,
        id: DeliveryId,
        next: DeliveryStatus,
        actor: UserId,
    ) -> Result<DeliveryChange, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: DeliveryStatus =
            sqlx::query_scalar("SELECT status FROM deliveries WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        if !current.can_transition_to(next) {
            return Err(RepositoryError::Conflict(format!(
                "Cannot move delivery from {current} to {next}"
            )));
        }

        let sql = format!(
            "UPDATE deliveries
             SET status = $2,
                 actual_delivery_date = CASE WHEN $2 = 'delivered'::delivery_status THEN NOW()
                                             ELSE actual_delivery_date END,
                 updated_at = NOW()
             WHERE id = $1 RETURNING {DELIVERY_COLUMNS}"
        );
        let delivery = sqlx::query_as::<_, Delivery>(&sql)
            .bind(id)
            .bind(next)
            .fetch_one(&mut *tx)
            .await?;

        let order_status: OrderStatus =
            sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
                .bind(delivery.order_id)
                .fetch_one(&mut *tx)
                .await?;

        let mut order: Option<Transition> = None;
        for step in order_steps(order_status, next) {
            if let Some(t) = advance_in(&mut tx, delivery.order_id, step, actor).await? {
                order = Some(match order {
                    Some(Transition { previous, .. }) => Transition { previous, ..t },
                    None => t,
                });
            }
        }

        tx.commit().await?;
        Ok(DeliveryChange { delivery, order })
    }
}

/// Order steps implied by a delivery reaching `next`.
///
/// Only orders past the kitchen queue follow their delivery; an order that
/// skipped `ready_delivery` or `out_for_delivery` is walked through them.
fn order_steps(current: OrderStatus, next: DeliveryStatus) -> Vec<OrderStatus> {
    let target = match next {
        DeliveryStatus::InTransit => OrderStatus::OutForDelivery,
        DeliveryStatus::Delivered => OrderStatus::Delivered,
        DeliveryStatus::Pending | DeliveryStatus::Assigned | DeliveryStatus::Cancelled => {
            return Vec::new();
        }
    };
    if current.is_open() && !current.is_production_queue() {
        current.steps_to(target)
    } else {
        Vec::new()
    }
}

fn full_name(first: &str, last: Option<&str>) -> String {
    match last.map(str::trim).filter(|l| !l.is_empty()) {
        Some(last) => format!("{} {last}", first.trim()),
        None => first.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivered_walks_order_through_dispatch() {
        assert_eq!(
            order_steps(OrderStatus::InProduction, DeliveryStatus::Delivered),
            [
                OrderStatus::ReadyDelivery,
                OrderStatus::OutForDelivery,
                OrderStatus::Delivered
            ]
        );
        assert_eq!(
            order_steps(OrderStatus::ReadyDelivery, DeliveryStatus::Delivered),
            [OrderStatus::OutForDelivery, OrderStatus::Delivered]
        );
        assert_eq!(
            order_steps(OrderStatus::OutForDelivery, DeliveryStatus::Delivered),
            [OrderStatus::Delivered]
        );
    }

    #[test]
    fn test_in_transit_moves_order_out_for_delivery() {
        assert_eq!(
            order_steps(OrderStatus::ReadyDelivery, DeliveryStatus::InTransit),
            [OrderStatus::OutForDelivery]
        );
        assert!(order_steps(OrderStatus::OutForDelivery, DeliveryStatus::InTransit).is_empty());
    }

    #[test]
    fn test_closed_or_queued_orders_stay_put() {
        for status in [OrderStatus::Delivered, OrderStatus::Cancelled, OrderStatus::Confirmed] {
            assert!(order_steps(status, DeliveryStatus::Delivered).is_empty(), "{status}");
        }
        for next in [
            DeliveryStatus::Pending,
            DeliveryStatus::Assigned,
            DeliveryStatus::Cancelled,
        ] {
            assert!(order_steps(OrderStatus::ReadyDelivery, next).is_empty(), "{next}");
        }
    }

    #[test]
    fn test_full_name() {
        assert_eq!(full_name("Asha", Some("Rao")), "Asha Rao");
        assert_eq!(full_name(" Asha ", Some("  ")), "Asha");
        assert_eq!(full_name("Asha", None), "Asha");
    }
}
