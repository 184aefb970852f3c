//! Pincode serviceability and delivery quotes.
//!
//! Deliveries are grouped into zones by the first three digits of the
//! pincode. The local zone covers Delhi NCR, where the kitchen delivers
//! fresh; the national zone covers metro and tier-1 cities by courier.

use serde::{Deserialize, Serialize};

use crate::types::{Money, Pincode};

/// Delivery zone identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneId {
    Local,
    National,
}

/// Pricing and coverage for one delivery zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: &'static str,
    /// Flat fee below the free-delivery threshold, in rupees.
    pub delivery_fee: i64,
    /// Subtotal at which delivery becomes free, in rupees.
    pub free_above: i64,
    /// Smallest order accepted, in rupees.
    pub min_order: i64,
    pub estimated_delivery: &'static str,
    pub areas: &'static str,
    /// Three-digit pincode prefixes served by this zone.
    pub prefixes: &'static [&'static str],
}

pub const LOCAL_ZONE: Zone = Zone {
    id: ZoneId::Local,
    name: "Delhi NCR",
    delivery_fee: 40,
    free_above: 500,
    min_order: 200,
    estimated_delivery: "Same or next day",
    areas: "Delhi, Noida, Gurgaon, Ghaziabad, Faridabad and surrounding areas",
    prefixes: &["110", "121", "122", "201"],
};

pub const NATIONAL_ZONE: Zone = Zone {
    id: ZoneId::National,
    name: "Pan India",
    delivery_fee: 150,
    free_above: 2000,
    min_order: 800,
    estimated_delivery: "3-5 business days",
    areas: "Metro and tier-1 cities across India",
    prefixes: &[
        "160", "226", "302", "380", "400", "411", "500", "560", "600", "700",
    ],
};

/// All zones, nearest first.
pub const ZONES: [Zone; 2] = [LOCAL_ZONE, NATIONAL_ZONE];

/// Whether `s` is a well-formed pincode.
#[must_use]
pub fn validate_pincode(s: &str) -> bool {
    Pincode::parse(s).is_ok()
}

/// The zone serving `pincode`, if any.
#[must_use]
pub fn zone_for(pincode: &Pincode) -> Option<&'static Zone> {
    ZONES
        .iter()
        .find(|z| z.prefixes.contains(&pincode.prefix()))
}

#[must_use]
pub fn zone_by_id(id: ZoneId) -> &'static Zone {
    match id {
        ZoneId::Local => &LOCAL_ZONE,
        ZoneId::National => &NATIONAL_ZONE,
    }
}

/// Result of a delivery fee calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingQuote {
    pub is_serviceable: bool,
    pub zone: Option<ZoneId>,
    pub zone_name: Option<&'static str>,
    pub delivery_fee: Money,
    pub free_delivery_threshold: Money,
    pub min_order_amount: Money,
    /// Amount still needed to reach the zone minimum, zero when met.
    pub amount_for_min_order: Money,
    /// Amount still needed for free delivery, zero when already free.
    pub amount_for_free_delivery: Money,
    pub estimated_delivery: Option<&'static str>,
    pub message: String,
}

impl ShippingQuote {
    /// Whether an order of this value may be placed.
    #[must_use]
    pub fn accepts_order(&self) -> bool {
        self.is_serviceable && self.amount_for_min_order.is_zero()
    }
}

/// Quote delivery for an order of `order_value` to `pincode`.
#[must_use]
pub fn calculate_delivery_fee(pincode: &Pincode, order_value: Money) -> ShippingQuote {
    let Some(zone) = zone_for(pincode) else {
        return ShippingQuote {
            is_serviceable: false,
            zone: None,
            zone_name: None,
            delivery_fee: Money::ZERO,
            free_delivery_threshold: Money::ZERO,
            min_order_amount: Money::ZERO,
            amount_for_min_order: Money::ZERO,
            amount_for_free_delivery: Money::ZERO,
            estimated_delivery: None,
            message: format!("Sorry, we don't deliver to {pincode} yet."),
        };
    };

    let threshold = Money::from_rupees(zone.free_above);
    let minimum = Money::from_rupees(zone.min_order);
    let free = order_value >= threshold;
    let delivery_fee = if free {
        Money::ZERO
    } else {
        Money::from_rupees(zone.delivery_fee)
    };
    let amount_for_min_order = minimum.saturating_sub(order_value);
    let amount_for_free_delivery = threshold.saturating_sub(order_value);

    let message = if !amount_for_min_order.is_zero() {
        format!(
            "Minimum order for {} is {minimum}. Add {amount_for_min_order} more.",
            zone.name
        )
    } else if free {
        format!("Free delivery to {}!", zone.name)
    } else {
        format!("Add {amount_for_free_delivery} more for free delivery.")
    };

    ShippingQuote {
        is_serviceable: true,
        zone: Some(zone.id),
        zone_name: Some(zone.name),
        delivery_fee,
        free_delivery_threshold: threshold,
        min_order_amount: minimum,
        amount_for_min_order,
        amount_for_free_delivery,
        estimated_delivery: Some(zone.estimated_delivery),
        message,
    }
}

/// Serviceable pincode prefixes for one zone, or every zone.
#[must_use]
pub fn serviceable_prefixes(zone: Option<ZoneId>) -> Vec<&'static str> {
    match zone {
        Some(id) => zone_by_id(id).prefixes.to_vec(),
        None => ZONES.iter().flat_map(|z| z.prefixes.iter().copied()).collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pin(s: &str) -> Pincode {
        Pincode::parse(s).unwrap()
    }

    #[test]
    fn test_validate_pincode() {
        assert!(validate_pincode("110001"));
        assert!(!validate_pincode("11001"));
        assert!(!validate_pincode("abcdef"));
    }

    #[test]
    fn test_zone_lookup() {
        assert_eq!(zone_for(&pin("110017")).map(|z| z.id), Some(ZoneId::Local));
        assert_eq!(zone_for(&pin("122002")).map(|z| z.id), Some(ZoneId::Local));
        assert_eq!(zone_for(&pin("560034")).map(|z| z.id), Some(ZoneId::National));
        assert!(zone_for(&pin("799001")).is_none());
    }

    #[test]
    fn test_unserviceable_quote() {
        let quote = calculate_delivery_fee(&pin("799001"), Money::from_rupees(1000));
        assert!(!quote.is_serviceable);
        assert!(!quote.accepts_order());
        assert_eq!(quote.zone, None);
    }

    #[test]
    fn test_local_fee_and_threshold() {
        let below = calculate_delivery_fee(&pin("110001"), Money::from_rupees(499));
        assert_eq!(below.delivery_fee, Money::from_rupees(40));
        assert_eq!(below.amount_for_free_delivery, Money::from_rupees(1));
        assert!(below.accepts_order());

        let at = calculate_delivery_fee(&pin("110001"), Money::from_rupees(500));
        assert_eq!(at.delivery_fee, Money::ZERO);
        assert_eq!(at.amount_for_free_delivery, Money::ZERO);
    }

    #[test]
    fn test_minimum_order() {
        let quote = calculate_delivery_fee(&pin("400001"), Money::from_rupees(500));
        assert!(quote.is_serviceable);
        assert!(!quote.accepts_order());
        assert_eq!(quote.amount_for_min_order, Money::from_rupees(300));
        assert!(quote.message.contains("Minimum order"));
    }

    #[test]
    fn test_serviceable_prefixes() {
        assert_eq!(serviceable_prefixes(Some(ZoneId::Local)).len(), 4);
        let all = serviceable_prefixes(None);
        assert_eq!(all.len(), LOCAL_ZONE.prefixes.len() + NATIONAL_ZONE.prefixes.len());
        assert!(all.contains(&"560"));
    }
}
