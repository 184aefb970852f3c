//! Production batches.

use chrono::Utc;
use sqlx::PgPool;

use cozycat_core::{BatchId, BatchStatus, OrderItemId, OrderStatus, UserId};

use super::orders::{Transition, advance_in, transition_in};
use super::{RepositoryError, timestamp_number};
use crate::models::{Batch, BatchSummary, NewBatch};

const BATCH_COLUMNS: &str = "b.id, b.batch_number, b.order_id, b.status, b.notes, b.created_by, \
     b.started_at, b.completed_at, b.delivery_created, b.created_at, b.updated_at";

/// A batch change together with the order change it caused, if any.
#[derive(Debug, Clone)]
pub struct BatchChange {
    pub batch: Batch,
    pub order: Option<Transition>,
}

pub struct BatchRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BatchRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Batches newest first with their order and item totals.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<BatchStatus>,
    ) -> Result<Vec<BatchSummary>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {BATCH_COLUMNS},
                   o.order_number, o.status AS order_status,
                   COUNT(i.id) AS item_count,
                   COALESCE(SUM(v.weight_grams::BIGINT * i.quantity), 0)::BIGINT AS total_weight_grams
            FROM production_batches b
            LEFT JOIN orders o ON o.id = b.order_id
            LEFT JOIN order_items i ON i.batch_id = b.id
            LEFT JOIN product_variants v ON v.id = i.variant_id
            WHERE $1::batch_status IS NULL OR b.status = $1
            GROUP BY b.id, o.order_number, o.status
            ORDER BY b.created_at DESC
            "
        );
        let rows = sqlx::query_as::<_, BatchSummary>(&sql)
            .bind(status)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// Start a batch for an order.
    ///
    /// The listed items (every unbatched item of the order when the list is
    /// empty) point at the new batch and the order moves to `in_production`,
    /// which deducts its ingredients.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Conflict` if an item does not belong to the
    /// order, is already batched, or the order cannot enter production.
    pub async fn create(
        &self,
        input: &NewBatch,
        actor: UserId,
    ) -> Result<BatchChange, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Locks the order and validates the status change before anything is written.
        let order = transition_in(&mut tx, input.order_id, OrderStatus::InProduction, actor).await?;

        let sql = format!(
            r"
            INSERT INTO production_batches AS b
                (batch_number, order_id, status, notes, created_by, started_at)
            VALUES ($1, $2, 'in_progress', $3, $4, NOW())
            RETURNING {BATCH_COLUMNS}
            "
        );
        let batch = sqlx::query_as::<_, Batch>(&sql)
            .bind(timestamp_number("BATCH", Utc::now()))
            .bind(input.order_id)
            .bind(input.notes.as_deref())
            .bind(actor)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| super::conflict_on_unique(e, "batch number"))?;

        let assigned: Vec<OrderItemId> = if input.item_ids.is_empty() {
            sqlx::query_scalar(
                "UPDATE order_items SET batch_id = $1 \
                 WHERE order_id = $2 AND batch_id IS NULL RETURNING id",
            )
            .bind(batch.id)
            .bind(input.order_id)
            .fetch_all(&mut *tx)
            .await?
        } else {
            sqlx::query_scalar(
                "UPDATE order_items SET batch_id = $1 \
                 WHERE order_id = $2 AND batch_id IS NULL AND id = ANY($3) RETURNING id",
            )
            .bind(batch.id)
            .bind(input.order_id)
            .bind(&input.item_ids)
            .fetch_all(&mut *tx)
            .await?
        };

        let partial = !input.item_ids.is_empty() && assigned.len() != input.item_ids.len();
        if assigned.is_empty() || partial {
            return Err(RepositoryError::Conflict(
                "Items must belong to the order and not already be batched".to_string(),
            ));
        }

        tx.commit().await?;

        tracing::info!(
            batch_number = %batch.batch_number,
            order_number = %order.order.order_number,
            items = assigned.len(),
            "Production batch started"
        );
        Ok(BatchChange {
            batch,
            order: Some(order),
        })
    }

    /// Move a batch forward. Completing it stamps `completed_at` and moves
    /// the order on to `ready_delivery`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the batch does not exist.
    /// Returns `RepositoryError::Conflict` if the transition is not allowed.
    pub async fn update_status(
        &self,
        id: BatchId,
        next: BatchStatus,
        actor: UserId,
    ) -> Result<BatchChange, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: BatchStatus =
            sqlx::query_scalar("SELECT status FROM production_batches WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        if !current.can_transition_to(next) {
            return Err(RepositoryError::Conflict(format!(
                "Cannot move batch from {current} to {next}"
            )));
        }

        let sql = format!(
            r"
            UPDATE production_batches b
            SET status = $2,
                started_at = CASE WHEN $2 = 'in_progress'::batch_status
                                  THEN COALESCE(started_at, NOW()) ELSE started_at END,
                completed_at = CASE WHEN $2 = 'completed'::batch_status THEN NOW()
                                    ELSE completed_at END,
                updated_at = NOW()
            WHERE b.id = $1
            RETURNING {BATCH_COLUMNS}
            "
        );
        let batch = sqlx::query_as::<_, Batch>(&sql)
            .bind(id)
            .bind(next)
            .fetch_one(&mut *tx)
            .await?;

        let order = match (next, batch.order_id) {
            (BatchStatus::Completed, Some(order_id)) => {
                advance_in(&mut tx, order_id, OrderStatus::ReadyDelivery, actor).await?
            }
            _ => None,
        };

        tx.commit().await?;
        Ok(BatchChange { batch, order })
    }
}
