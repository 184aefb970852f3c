//! Turning a session cart into an order.
//!
//! Everything here is pure: the route handler loads current prices and
//! then asks [`build_order`] for the rows to insert. Client-side prices are
//! never used; each line is priced from the database.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use thiserror::Error;

use cozycat_core::cart::Cart;
use cozycat_core::shipping::{ShippingQuote, calculate_delivery_fee};
use cozycat_core::validation::{self, ValidationError};
use cozycat_core::{Email, Money, PaymentMethod, Phone, Pincode, VariantId};

use crate::models::{AddressInput, CustomerSnapshot, NewOrder, NewOrderItem, PurchasableVariant};

/// Reasons a cart cannot be checked out.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("your cart is empty")]
    EmptyCart,

    #[error("{0} is no longer available")]
    Unavailable(String),

    #[error("{0}")]
    Invalid(#[from] ValidationError),

    #[error("{0}")]
    NotServiceable(String),

    #[error("{0}")]
    BelowMinimum(String),

    #[error("log in to pay online, or choose cash on delivery")]
    GuestOnlinePayment,
}

/// Contact details entered at checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerInfo {
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub whatsapp_number: Option<String>,
    #[serde(default)]
    pub is_whatsapp_preferred: bool,
}

impl CustomerInfo {
    /// Validate contact details and combine them with a validated address.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn into_snapshot(
        self,
        address: &AddressInput,
        is_guest: bool,
    ) -> Result<CustomerSnapshot, ValidationError> {
        let first_name = validation::person_name("first_name", &self.first_name)?;
        let last_name = match self.last_name.as_deref().map(str::trim) {
            Some(last) if !last.is_empty() => Some(validation::person_name("last_name", last)?),
            _ => None,
        };
        let phone = Phone::parse(&self.phone)
            .map_err(|e| ValidationError::new("phone", e.to_string()))?;
        let email = match self.email.as_deref().map(str::trim) {
            Some(email) if !email.is_empty() => Some(
                Email::parse(email)
                    .map_err(|e| ValidationError::new("email", e.to_string()))?
                    .into_inner(),
            ),
            _ => None,
        };
        let whatsapp_number = match self.whatsapp_number.as_deref().map(str::trim) {
            Some(number) if !number.is_empty() => Some(
                Phone::parse(number)
                    .map_err(|e| ValidationError::new("whatsapp_number", e.to_string()))?
                    .into(),
            ),
            _ => None,
        };

        Ok(CustomerSnapshot {
            first_name,
            last_name,
            phone: phone.into(),
            email,
            whatsapp_number,
            is_whatsapp_preferred: self.is_whatsapp_preferred,
            address_line1: address.address_line1.clone(),
            address_line2: address.address_line2.clone(),
            landmark: address.landmark.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            pincode: address.pincode.clone(),
            is_guest,
        })
    }
}

/// Options chosen at checkout besides the cart and the customer.
#[derive(Debug, Clone, Default)]
pub struct OrderOptions {
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub delivery_notes: Option<String>,
    pub preferred_delivery_date: Option<NaiveDate>,
}

/// An order ready to insert, with the shipping quote it was priced with.
#[derive(Debug, Clone)]
pub struct PricedOrder {
    pub order: NewOrder,
    pub quote: ShippingQuote,
}

/// Price the cart from `variants` and build the order rows.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` for an empty cart,
/// `CheckoutError::Unavailable` when a line's variant is gone,
/// `CheckoutError::NotServiceable` or `CheckoutError::BelowMinimum` when
/// the delivery zone rejects the order, and
/// `CheckoutError::GuestOnlinePayment` for a guest choosing online payment.
pub fn build_order(
    cart: &Cart,
    variants: &[PurchasableVariant],
    customer: CustomerSnapshot,
    options: OrderOptions,
    order_number: String,
) -> Result<PricedOrder, CheckoutError> {
    if !cart.has_items() {
        return Err(CheckoutError::EmptyCart);
    }
    // Gateway orders are created from the customer's account.
    if customer.is_guest && options.payment_method == PaymentMethod::Online {
        return Err(CheckoutError::GuestOnlinePayment);
    }

    let current: HashMap<VariantId, &PurchasableVariant> =
        variants.iter().map(|v| (v.variant_id, v)).collect();

    let mut items = Vec::with_capacity(cart.items_count());
    for line in cart.items() {
        let variant = current
            .get(&line.variant_id)
            .ok_or_else(|| CheckoutError::Unavailable(line.product_name.clone()))?;
        let quantity = validation::item_quantity(i64::from(line.quantity))?;
        let unit_price = variant.price;
        items.push(NewOrderItem {
            product_id: variant.product_id,
            variant_id: variant.variant_id,
            quantity: i32::try_from(quantity)
                .map_err(|_| ValidationError::new("quantity", "is too large"))?,
            unit_price,
            total_price: unit_price.times(quantity),
        });
    }

    let subtotal: Money = items.iter().map(|i| i.total_price).sum();
    let pincode = Pincode::parse(&customer.pincode)
        .map_err(|e| ValidationError::new("pincode", e.to_string()))?;
    let quote = calculate_delivery_fee(&pincode, subtotal);
    if !quote.is_serviceable {
        return Err(CheckoutError::NotServiceable(quote.message));
    }
    if !quote.accepts_order() {
        return Err(CheckoutError::BelowMinimum(quote.message));
    }

    let notes = validation::notes("notes", options.notes.as_deref())?;
    let delivery_notes = validation::notes("delivery_notes", options.delivery_notes.as_deref())?;

    let order = NewOrder {
        order_number,
        payment_method: options.payment_method,
        subtotal,
        delivery_fee: quote.delivery_fee,
        total_amount: subtotal + quote.delivery_fee,
        notes,
        delivery_notes,
        preferred_delivery_date: options.preferred_delivery_date,
        customer,
        items,
    };

    Ok(PricedOrder { order, quote })
}

/// A fresh order number: `ORD-` and the last eight digits of the
/// millisecond clock.
#[must_use]
pub fn generate_order_number() -> String {
    format!("ORD-{:08}", Utc::now().timestamp_millis().rem_euclid(100_000_000))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cozycat_core::cart::CartItem;
    use cozycat_core::{ProductId, VariantId};

    use super::*;

    fn variant(price: i64) -> PurchasableVariant {
        PurchasableVariant {
            variant_id: VariantId::generate(),
            product_id: ProductId::generate(),
            product_name: "Chicken Feast".to_string(),
            image_url: None,
            weight_grams: 500,
            price: Money::from_rupees(price),
            sku: None,
        }
    }

    fn cart_of(v: &PurchasableVariant, stale_price: i64, quantity: u32) -> Cart {
        let mut cart = Cart::new();
        cart.add_item(CartItem {
            product_id: v.product_id,
            variant_id: v.variant_id,
            product_name: v.product_name.clone(),
            weight_grams: v.weight_grams,
            price: Money::from_rupees(stale_price),
            quantity,
            sku: None,
            product_image: None,
        });
        cart
    }

    fn snapshot(pincode: &str) -> CustomerSnapshot {
        CustomerSnapshot {
            first_name: "Asha".to_string(),
            phone: "9876543210".to_string(),
            address_line1: "22 Hauz Khas Village".to_string(),
            city: "New Delhi".to_string(),
            state: "Delhi".to_string(),
            pincode: pincode.to_string(),
            ..CustomerSnapshot::default()
        }
    }

    #[test]
    fn test_prices_from_database_not_cart() {
        let v = variant(250);
        let cart = cart_of(&v, 1, 2);
        let priced = build_order(
            &cart,
            std::slice::from_ref(&v),
            snapshot("110017"),
            OrderOptions::default(),
            "ORD-00000001".to_string(),
        )
        .unwrap();

        assert_eq!(priced.order.subtotal, Money::from_rupees(500));
        assert_eq!(priced.order.delivery_fee, Money::ZERO);
        assert_eq!(priced.order.total_amount, Money::from_rupees(500));
        assert_eq!(priced.order.items.len(), 1);
        assert_eq!(priced.order.items[0].unit_price, Money::from_rupees(250));
    }

    #[test]
    fn test_local_fee_below_threshold() {
        let v = variant(220);
        let priced = build_order(
            &cart_of(&v, 220, 1),
            std::slice::from_ref(&v),
            snapshot("110017"),
            OrderOptions::default(),
            "ORD-00000002".to_string(),
        )
        .unwrap();
        assert_eq!(priced.order.delivery_fee, Money::from_rupees(40));
        assert_eq!(priced.order.total_amount, Money::from_rupees(260));
    }

    #[test]
    fn test_rejects_empty_cart() {
        let err = build_order(
            &Cart::new(),
            &[],
            snapshot("110017"),
            OrderOptions::default(),
            "ORD-1".to_string(),
        )
        .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
    }

    #[test]
    fn test_rejects_missing_variant() {
        let v = variant(300);
        let err = build_order(
            &cart_of(&v, 300, 1),
            &[],
            snapshot("110017"),
            OrderOptions::default(),
            "ORD-1".to_string(),
        )
        .unwrap_err();
        assert!(matches!(err, CheckoutError::Unavailable(name) if name == "Chicken Feast"));
    }

    #[test]
    fn test_rejects_unserviceable_and_below_minimum() {
        let v = variant(300);
        let cart = cart_of(&v, 300, 1);
        let err = build_order(
            &cart,
            std::slice::from_ref(&v),
            snapshot("799001"),
            OrderOptions::default(),
            "ORD-1".to_string(),
        )
        .unwrap_err();
        assert!(matches!(err, CheckoutError::NotServiceable(_)));

        let err = build_order(
            &cart,
            std::slice::from_ref(&v),
            snapshot("560034"),
            OrderOptions::default(),
            "ORD-1".to_string(),
        )
        .unwrap_err();
        assert!(matches!(err, CheckoutError::BelowMinimum(_)));
    }

    #[test]
    fn test_guest_cannot_pay_online() {
        let v = variant(600);
        let cart = cart_of(&v, 600, 1);
        let online = || OrderOptions {
            payment_method: PaymentMethod::Online,
            ..OrderOptions::default()
        };
        let guest = CustomerSnapshot {
            is_guest: true,
            ..snapshot("110017")
        };

        let err = build_order(
            &cart,
            std::slice::from_ref(&v),
            guest.clone(),
            online(),
            "ORD-1".to_string(),
        )
        .unwrap_err();
        assert!(matches!(err, CheckoutError::GuestOnlinePayment));

        let cod = build_order(
            &cart,
            std::slice::from_ref(&v),
            guest,
            OrderOptions::default(),
            "ORD-1".to_string(),
        )
        .unwrap();
        assert_eq!(cod.order.payment_method, PaymentMethod::Cod);

        let member = build_order(
            &cart,
            std::slice::from_ref(&v),
            snapshot("110017"),
            online(),
            "ORD-1".to_string(),
        )
        .unwrap();
        assert_eq!(member.order.payment_method, PaymentMethod::Online);
    }

    #[test]
    fn test_order_number_format() {
        let number = generate_order_number();
        assert_eq!(number.len(), 12);
        assert!(number.starts_with("ORD-"));
        assert!(number[4..].bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn test_customer_info_validation() {
        let address = AddressInput {
            address_line1: "22 Hauz Khas Village".to_string(),
            address_line2: None,
            landmark: None,
            city: "New Delhi".to_string(),
            state: "Delhi".to_string(),
            pincode: "110016".to_string(),
            latitude: None,
            longitude: None,
            is_default: false,
            delivery_notes: None,
        };
        let info = CustomerInfo {
            first_name: "Asha".to_string(),
            last_name: Some(" ".to_string()),
            phone: "+91 98765 43210".to_string(),
            email: Some("Asha@Example.com".to_string()),
            whatsapp_number: None,
            is_whatsapp_preferred: false,
        };
        let snap = info.clone().into_snapshot(&address, true).unwrap();
        assert_eq!(snap.phone, "+919876543210");
        assert_eq!(snap.email.as_deref(), Some("asha@example.com"));
        assert_eq!(snap.last_name, None);
        assert!(snap.is_guest);

        let bad = CustomerInfo {
            phone: "12345".to_string(),
            ..info
        };
        assert_eq!(bad.into_snapshot(&address, true).unwrap_err().field, "phone");
    }
}
