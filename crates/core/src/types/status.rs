//! Status enums for orders, payments, production and delivery.
//!
//! Each persisted enum maps to a PostgreSQL enum type of the same name
//! (see `migrations/`), uses `snake_case` on the wire, and exposes its
//! allowed transitions so handlers never hand-roll lifecycle checks.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Error returned when parsing a status from an unknown string.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    kind: &'static str,
    value: String,
}

macro_rules! status_strings {
    ($ty:ident, $kind:literal, { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            /// Every variant, in lifecycle order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The `snake_case` name used on the wire and in the database.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant),)+
                    _ => Err(ParseStatusError { kind: $kind, value: s.to_owned() }),
                }
            }
        }
    };
}

/// Order lifecycle status.
///
/// ```text
/// pending -> confirmed -> ready_production -> in_production
///         -> ready_delivery -> out_for_delivery -> delivered
/// ```
///
/// Any non-terminal status may move to `cancelled`. A confirmed order may go
/// straight into production when a batch is created for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    ReadyProduction,
    InProduction,
    ReadyDelivery,
    OutForDelivery,
    Delivered,
    Cancelled,
}

status_strings!(OrderStatus, "order status", {
    Pending => "pending",
    Confirmed => "confirmed",
    ReadyProduction => "ready_production",
    InProduction => "in_production",
    ReadyDelivery => "ready_delivery",
    OutForDelivery => "out_for_delivery",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl OrderStatus {
    /// The forward lifecycle, without `cancelled`.
    pub const LIFECYCLE: [Self; 7] = [
        Self::Pending,
        Self::Confirmed,
        Self::ReadyProduction,
        Self::InProduction,
        Self::ReadyDelivery,
        Self::OutForDelivery,
        Self::Delivered,
    ];

    /// Whether an order in `self` may move to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use OrderStatus::{
            Cancelled, Confirmed, Delivered, InProduction, OutForDelivery, Pending,
            ReadyDelivery, ReadyProduction,
        };
        match (self, next) {
            (Delivered | Cancelled, _) => false,
            (_, Cancelled) => true,
            (Pending, Confirmed)
            | (Confirmed, ReadyProduction | InProduction)
            | (ReadyProduction, InProduction)
            | (InProduction, ReadyDelivery)
            | (ReadyDelivery, OutForDelivery)
            | (OutForDelivery, Delivered) => true,
            _ => false,
        }
    }

    /// Delivered and cancelled orders never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Orders that can still change.
    #[must_use]
    pub const fn is_open(self) -> bool {
        !self.is_terminal()
    }

    /// The lifecycle steps from `self` up to and including `target`.
    ///
    /// Empty when `target` is not ahead of `self` on the lifecycle.
    #[must_use]
    pub fn steps_to(self, target: Self) -> Vec<Self> {
        let position = |status: Self| Self::LIFECYCLE.iter().position(|s| *s == status);
        match (position(self), position(target)) {
            (Some(from), Some(to)) if from < to => Self::LIFECYCLE
                .get(from + 1..=to)
                .map(<[Self]>::to_vec)
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Orders that still await production and belong in the kitchen queue.
    #[must_use]
    pub const fn is_production_queue(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed | Self::ReadyProduction)
    }

    /// Customer-facing label for order tracking.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Order placed",
            Self::Confirmed => "Order confirmed",
            Self::ReadyProduction => "Queued for cooking",
            Self::InProduction => "Being cooked",
            Self::ReadyDelivery => "Packed and ready",
            Self::OutForDelivery => "Out for delivery",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

status_strings!(PaymentStatus, "payment status", {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Refunded => "refunded",
});

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    Cod,
    /// Online payment through the gateway.
    Online,
    Wallet,
}

status_strings!(PaymentMethod, "payment method", {
    Cod => "cod",
    Online => "online",
    Wallet => "wallet",
});

/// Account role stored on the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "profile_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProfileRole {
    /// Full access to the admin dashboard and operations console.
    Admin,
    /// Delivery or supply partner.
    Partner,
    /// Shop customer.
    #[default]
    Customer,
    /// Kitchen and dispatch staff; operations console only.
    Operations,
}

status_strings!(ProfileRole, "role", {
    Admin => "admin",
    Partner => "partner",
    Customer => "customer",
    Operations => "operations",
});

impl ProfileRole {
    /// Roles allowed into the operations console.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Operations)
    }
}

/// Production batch status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "batch_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Planned,
    #[default]
    InProgress,
    QualityCheck,
    Completed,
    Cancelled,
}

status_strings!(BatchStatus, "batch status", {
    Planned => "planned",
    InProgress => "in_progress",
    QualityCheck => "quality_check",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl BatchStatus {
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use BatchStatus::{Cancelled, Completed, InProgress, Planned, QualityCheck};
        match (self, next) {
            (Completed | Cancelled, _) => false,
            (_, Cancelled) => true,
            (Planned, InProgress)
            | (InProgress, QualityCheck | Completed)
            | (QualityCheck, Completed) => true,
            _ => false,
        }
    }
}

/// Delivery status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "delivery_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Assigned,
    InTransit,
    Delivered,
    Cancelled,
}

status_strings!(DeliveryStatus, "delivery status", {
    Pending => "pending",
    Assigned => "assigned",
    InTransit => "in_transit",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl DeliveryStatus {
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use DeliveryStatus::{Assigned, Cancelled, Delivered, InTransit, Pending};
        match (self, next) {
            (Delivered | Cancelled, _) => false,
            (_, Cancelled) => true,
            (Pending, Assigned) | (Assigned, InTransit) | (InTransit, Delivered) => true,
            _ => false,
        }
    }

    /// A partner may be (re)assigned until the parcel leaves the kitchen.
    #[must_use]
    pub const fn accepts_assignment(self) -> bool {
        matches!(self, Self::Pending | Self::Assigned)
    }
}

/// Whether current stock covers a production requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Sufficient,
    Insufficient,
    OutOfStock,
}

impl StockStatus {
    /// Classify `current` stock against a `required` amount in the same unit.
    #[must_use]
    pub fn classify(current: Decimal, required: Decimal) -> Self {
        if current <= Decimal::ZERO {
            Self::OutOfStock
        } else if current >= required {
            Self::Sufficient
        } else {
            Self::Insufficient
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_lifecycle_forward() {
        let path = [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::ReadyProduction,
            OrderStatus::InProduction,
            OrderStatus::ReadyDelivery,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
        ];
        for pair in path.windows(2) {
            if let [from, to] = pair {
                assert!(from.can_transition_to(*to), "{from} -> {to}");
                assert!(!to.can_transition_to(*from), "{to} -> {from}");
            }
        }
    }

    #[test]
    fn test_order_batch_shortcut() {
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::InProduction));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::InProduction));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_order_cancel_and_terminal() {
        for status in OrderStatus::ALL {
            let expected = !status.is_terminal();
            assert_eq!(status.can_transition_to(OrderStatus::Cancelled), expected);
        }
        for next in OrderStatus::ALL {
            assert!(!OrderStatus::Delivered.can_transition_to(*next));
            assert!(!OrderStatus::Cancelled.can_transition_to(*next));
        }
    }

    #[test]
    fn test_open_orders() {
        for status in OrderStatus::ALL {
            let closed = matches!(status, OrderStatus::Delivered | OrderStatus::Cancelled);
            assert_eq!(status.is_open(), !closed, "{status}");
        }
    }

    #[test]
    fn test_steps_to() {
        assert_eq!(
            OrderStatus::InProduction.steps_to(OrderStatus::Delivered),
            [
                OrderStatus::ReadyDelivery,
                OrderStatus::OutForDelivery,
                OrderStatus::Delivered
            ]
        );
        assert_eq!(
            OrderStatus::OutForDelivery.steps_to(OrderStatus::Delivered),
            [OrderStatus::Delivered]
        );
        assert!(OrderStatus::Delivered.steps_to(OrderStatus::Delivered).is_empty());
        assert!(OrderStatus::Delivered.steps_to(OrderStatus::ReadyDelivery).is_empty());
        assert!(OrderStatus::Cancelled.steps_to(OrderStatus::Delivered).is_empty());
        assert!(OrderStatus::Pending.steps_to(OrderStatus::Cancelled).is_empty());

        // Every step is a legal transition from the one before.
        let steps = OrderStatus::Pending.steps_to(OrderStatus::Delivered);
        assert_eq!(steps.len(), 6);
        let mut from = OrderStatus::Pending;
        for step in steps {
            assert!(from.can_transition_to(step), "{from} -> {step}");
            from = step;
        }
    }

    #[test]
    fn test_order_same_status_is_not_a_transition() {
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Confirmed));
    }

    #[test]
    fn test_production_queue_membership() {
        let queued: Vec<_> = OrderStatus::ALL
            .iter()
            .filter(|s| s.is_production_queue())
            .collect();
        assert_eq!(
            queued,
            [
                &OrderStatus::Pending,
                &OrderStatus::Confirmed,
                &OrderStatus::ReadyProduction
            ]
        );
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), *status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&OrderStatus::OutForDelivery).unwrap(),
            "\"out_for_delivery\""
        );
    }

    #[test]
    fn test_role_staff() {
        assert!(ProfileRole::Admin.is_staff());
        assert!(ProfileRole::Operations.is_staff());
        assert!(!ProfileRole::Customer.is_staff());
        assert!(!ProfileRole::Partner.is_staff());
        assert_eq!("operations".parse::<ProfileRole>().unwrap(), ProfileRole::Operations);
    }

    #[test]
    fn test_batch_transitions() {
        assert!(BatchStatus::InProgress.can_transition_to(BatchStatus::Completed));
        assert!(BatchStatus::QualityCheck.can_transition_to(BatchStatus::Completed));
        assert!(!BatchStatus::Completed.can_transition_to(BatchStatus::Cancelled));
        assert!(!BatchStatus::QualityCheck.can_transition_to(BatchStatus::Planned));
    }

    #[test]
    fn test_delivery_transitions() {
        assert!(DeliveryStatus::Pending.can_transition_to(DeliveryStatus::Assigned));
        assert!(DeliveryStatus::InTransit.can_transition_to(DeliveryStatus::Delivered));
        assert!(!DeliveryStatus::Pending.can_transition_to(DeliveryStatus::Delivered));
        assert!(DeliveryStatus::Assigned.accepts_assignment());
        assert!(!DeliveryStatus::InTransit.accepts_assignment());
    }

    #[test]
    fn test_stock_status() {
        let d = |v: i64| Decimal::new(v, 0);
        assert_eq!(StockStatus::classify(d(0), d(1)), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(d(-2), d(0)), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(d(5), d(5)), StockStatus::Sufficient);
        assert_eq!(StockStatus::classify(d(4), d(5)), StockStatus::Insufficient);
    }
}
