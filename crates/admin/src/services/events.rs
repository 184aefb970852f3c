//! Live operations events.
//!
//! Status changes on orders, batches and deliveries are published on a
//! `tokio::sync::broadcast` channel and streamed to consoles over SSE.
//! A subscriber that falls behind skips the events it missed.

use async_stream::stream;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::Serialize;
use tokio::sync::broadcast;

use cozycat_core::{
    BatchId, BatchStatus, DeliveryId, DeliveryStatus, OrderId, OrderStatus, UserId,
};

use crate::db::orders::Transition;
use crate::models::{Batch, Delivery};

/// Channel capacity; older events are dropped for slow subscribers.
pub const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationsEvent {
    OrderStatusChanged {
        order_id: OrderId,
        order_number: String,
        from: OrderStatus,
        to: OrderStatus,
        changed_by: UserId,
        at: DateTime<Utc>,
    },
    BatchCreated {
        batch_id: BatchId,
        batch_number: String,
        order_id: OrderId,
        at: DateTime<Utc>,
    },
    BatchStatusChanged {
        batch_id: BatchId,
        batch_number: String,
        status: BatchStatus,
        at: DateTime<Utc>,
    },
    DeliveryCreated {
        delivery_id: DeliveryId,
        delivery_number: String,
        order_id: OrderId,
        at: DateTime<Utc>,
    },
    DeliveryStatusChanged {
        delivery_id: DeliveryId,
        delivery_number: String,
        status: DeliveryStatus,
        at: DateTime<Utc>,
    },
}

impl OperationsEvent {
    #[must_use]
    pub fn order_changed(transition: &Transition, changed_by: UserId) -> Self {
        Self::OrderStatusChanged {
            order_id: transition.order.id,
            order_number: transition.order.order_number.clone(),
            from: transition.previous,
            to: transition.order.status,
            changed_by,
            at: transition.order.updated_at,
        }
    }

    #[must_use]
    pub fn batch_created(batch: &Batch) -> Option<Self> {
        Some(Self::BatchCreated {
            batch_id: batch.id,
            batch_number: batch.batch_number.clone(),
            order_id: batch.order_id?,
            at: batch.created_at,
        })
    }

    #[must_use]
    pub fn batch_changed(batch: &Batch) -> Self {
        Self::BatchStatusChanged {
            batch_id: batch.id,
            batch_number: batch.batch_number.clone(),
            status: batch.status,
            at: batch.updated_at,
        }
    }

    #[must_use]
    pub fn delivery_created(delivery: &Delivery) -> Self {
        Self::DeliveryCreated {
            delivery_id: delivery.id,
            delivery_number: delivery.delivery_number.clone(),
            order_id: delivery.order_id,
            at: delivery.created_at,
        }
    }

    #[must_use]
    pub fn delivery_changed(delivery: &Delivery) -> Self {
        Self::DeliveryStatusChanged {
            delivery_id: delivery.id,
            delivery_number: delivery.delivery_number.clone(),
            status: delivery.status,
            at: delivery.updated_at,
        }
    }

    /// SSE event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OrderStatusChanged { .. } => "order_status_changed",
            Self::BatchCreated { .. } => "batch_created",
            Self::BatchStatusChanged { .. } => "batch_status_changed",
            Self::DeliveryCreated { .. } => "delivery_created",
            Self::DeliveryStatusChanged { .. } => "delivery_status_changed",
        }
    }
}

/// Publisher handle, cloned into application state.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<OperationsEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CAPACITY)
    }
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: OperationsEvent) {
        let receivers = self.sender.send(event).unwrap_or(0);
        tracing::debug!(receivers, "operations event published");
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Stream of events from now on. Ends when the bus is dropped.
    pub fn subscribe(&self) -> impl Stream<Item = OperationsEvent> + Send + 'static + use<> {
        let mut receiver = self.sender.subscribe();
        stream! {
            loop {
                match receiver.recv().await {
                    Ok(event) => yield event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "SSE subscriber lagged, skipping events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures::StreamExt;

    use super::*;

    fn batch_event(n: u32) -> OperationsEvent {
        OperationsEvent::BatchStatusChanged {
            batch_id: BatchId::generate(),
            batch_number: format!("BATCH-{n:08}"),
            status: BatchStatus::Completed,
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_events() {
        let bus = EventBus::default();
        let mut events = Box::pin(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 1);

        let event = batch_event(1);
        bus.publish(event.clone());
        assert_eq!(events.next().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_to_newest() {
        let bus = EventBus::new(2);
        let mut events = Box::pin(bus.subscribe());

        for n in 0..5 {
            bus.publish(batch_event(n));
        }
        let OperationsEvent::BatchStatusChanged { batch_number, .. } =
            events.next().await.unwrap()
        else {
            panic!("unexpected event");
        };
        assert_eq!(batch_number, "BATCH-00000003");
    }

    #[test]
    fn test_publish_without_subscribers() {
        EventBus::default().publish(batch_event(1));
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(batch_event(7)).unwrap();
        assert_eq!(json["type"], "batch_status_changed");
        assert_eq!(json["status"], "completed");
        assert_eq!(batch_event(7).name(), "batch_status_changed");
    }
}
