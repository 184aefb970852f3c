//! Shopping cart arithmetic.
//!
//! The cart is a plain value owned by the caller (the storefront keeps it in
//! the customer's session). Lines are keyed by variant: adding a variant
//! that is already present increases its quantity instead of adding a line.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Money, ProductId, VariantId};

/// Orders at or above this subtotal ship free.
pub const FREE_DELIVERY_THRESHOLD_RUPEES: i64 = 500;

/// Flat delivery fee charged below the free-delivery threshold.
pub const STANDARD_DELIVERY_FEE_RUPEES: i64 = 40;

/// One cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub product_name: String,
    pub weight_grams: i32,
    /// Unit price at the time the item was added.
    pub price: Money,
    pub quantity: u32,
    pub sku: Option<String>,
    pub product_image: Option<String>,
}

impl CartItem {
    /// `price x quantity` for this line.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

/// A customer's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Add an item, merging with an existing line for the same variant.
    ///
    /// A zero quantity is ignored.
    pub fn add_item(&mut self, item: CartItem) {
        if item.quantity == 0 {
            return;
        }
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|i| i.variant_id == item.variant_id)
        {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            self.items.push(item);
        }
    }

    /// Remove the line for `variant_id`. Returns whether a line was removed.
    pub fn remove_item(&mut self, variant_id: VariantId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.variant_id != variant_id);
        self.items.len() != before
    }

    /// Set the quantity of a line. Zero or negative removes the line.
    ///
    /// Returns `false` when the variant is not in the cart.
    pub fn update_quantity(&mut self, variant_id: VariantId, quantity: i64) -> bool {
        if quantity <= 0 {
            return self.remove_item(variant_id);
        }
        let Some(item) = self.items.iter_mut().find(|i| i.variant_id == variant_id) else {
            return false;
        };
        item.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn items_count(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }

    /// Quantity of a given product variant, zero when absent.
    #[must_use]
    pub fn item_quantity(&self, product_id: ProductId, variant_id: VariantId) -> u32 {
        self.items
            .iter()
            .find(|i| i.product_id == product_id && i.variant_id == variant_id)
            .map_or(0, |i| i.quantity)
    }

    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    #[must_use]
    pub fn free_delivery_threshold() -> Money {
        Money::from_rupees(FREE_DELIVERY_THRESHOLD_RUPEES)
    }

    #[must_use]
    pub fn is_free_delivery(&self) -> bool {
        self.subtotal() >= Self::free_delivery_threshold()
    }

    /// Flat-rate fee: free at or above the threshold, otherwise ₹40.
    #[must_use]
    pub fn delivery_fee(&self) -> Money {
        if self.is_free_delivery() {
            Money::ZERO
        } else {
            Money::from_rupees(STANDARD_DELIVERY_FEE_RUPEES)
        }
    }

    #[must_use]
    pub fn total(&self) -> Money {
        self.subtotal() + self.delivery_fee()
    }

    /// How much more the customer must add to qualify for free delivery.
    #[must_use]
    pub fn amount_for_free_delivery(&self) -> Money {
        Self::free_delivery_threshold().saturating_sub(self.subtotal())
    }

    /// Fill in missing product images, e.g. after a catalog refresh.
    pub fn attach_images(&mut self, images: &HashMap<ProductId, String>) {
        for item in self.items.iter_mut().filter(|i| i.product_image.is_none()) {
            if let Some(url) = images.get(&item.product_id) {
                item.product_image = Some(url.clone());
            }
        }
    }

    /// Replace each line's unit price with the current catalog price, and
    /// drop lines whose variant no longer exists. Returns the removed lines.
    pub fn reprice(&mut self, prices: &HashMap<VariantId, Money>) -> Vec<CartItem> {
        let (kept, removed): (Vec<_>, Vec<_>) = self
            .items
            .drain(..)
            .partition(|i| prices.contains_key(&i.variant_id));
        self.items = kept;
        for item in &mut self.items {
            if let Some(price) = prices.get(&item.variant_id) {
                item.price = *price;
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn item(product: ProductId, variant: VariantId, rupees: i64, quantity: u32) -> CartItem {
        CartItem {
            product_id: product,
            variant_id: variant,
            product_name: "Chicken Feast".to_owned(),
            weight_grams: 500,
            price: Money::from_rupees(rupees),
            quantity,
            sku: None,
            product_image: None,
        }
    }

    #[test]
    fn test_add_merges_same_variant() {
        let (p, v) = (ProductId::generate(), VariantId::generate());
        let mut cart = Cart::new();
        cart.add_item(item(p, v, 150, 1));
        cart.add_item(item(p, v, 150, 2));
        assert_eq!(cart.items_count(), 1);
        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.item_quantity(p, v), 3);
    }

    #[test]
    fn test_add_distinct_variants() {
        let p = ProductId::generate();
        let mut cart = Cart::new();
        cart.add_item(item(p, VariantId::generate(), 150, 1));
        cart.add_item(item(p, VariantId::generate(), 280, 1));
        assert_eq!(cart.items_count(), 2);
        assert_eq!(cart.subtotal(), Money::from_rupees(430));
    }

    #[test]
    fn test_update_quantity_zero_or_negative_removes() {
        let (p, v) = (ProductId::generate(), VariantId::generate());
        let mut cart = Cart::new();
        cart.add_item(item(p, v, 100, 2));
        assert!(cart.update_quantity(v, 5));
        assert_eq!(cart.total_items(), 5);
        assert!(cart.update_quantity(v, 0));
        assert!(!cart.has_items());

        cart.add_item(item(p, v, 100, 2));
        assert!(cart.update_quantity(v, -3));
        assert!(!cart.has_items());
    }

    #[test]
    fn test_update_missing_variant() {
        let mut cart = Cart::new();
        assert!(!cart.update_quantity(VariantId::generate(), 2));
        assert_eq!(cart.item_quantity(ProductId::generate(), VariantId::generate()), 0);
    }

    #[test]
    fn test_delivery_fee_threshold() {
        let p = ProductId::generate();
        let mut cart = Cart::new();
        cart.add_item(item(p, VariantId::generate(), 499, 1));
        assert_eq!(cart.delivery_fee(), Money::from_rupees(40));
        assert_eq!(cart.total(), Money::from_rupees(539));
        assert_eq!(cart.amount_for_free_delivery(), Money::from_rupees(1));

        let mut cart = Cart::new();
        cart.add_item(item(p, VariantId::generate(), 500, 1));
        assert!(cart.is_free_delivery());
        assert_eq!(cart.delivery_fee(), Money::ZERO);
        assert_eq!(cart.amount_for_free_delivery(), Money::ZERO);
    }

    #[test]
    fn test_free_delivery_gap_never_negative() {
        let mut cart = Cart::new();
        cart.add_item(item(ProductId::generate(), VariantId::generate(), 900, 2));
        assert_eq!(cart.amount_for_free_delivery(), Money::ZERO);
    }

    #[test]
    fn test_fractional_prices() {
        let mut cart = Cart::new();
        let mut line = item(ProductId::generate(), VariantId::generate(), 0, 3);
        line.price = Money::new(Decimal::new(16_650, 2));
        cart.add_item(line);
        assert_eq!(cart.subtotal(), Money::new(Decimal::new(49_950, 2)));
        assert_eq!(cart.delivery_fee(), Money::from_rupees(40));
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new();
        cart.add_item(item(ProductId::generate(), VariantId::generate(), 10, 1));
        cart.clear();
        assert_eq!(cart.total_items(), 0);
        assert_eq!(cart.subtotal(), Money::ZERO);
    }

    #[test]
    fn test_reprice_and_drop_missing() {
        let p = ProductId::generate();
        let (v1, v2) = (VariantId::generate(), VariantId::generate());
        let mut cart = Cart::new();
        cart.add_item(item(p, v1, 100, 1));
        cart.add_item(item(p, v2, 200, 1));

        let prices = HashMap::from([(v1, Money::from_rupees(120))]);
        let removed = cart.reprice(&prices);

        assert_eq!(removed.len(), 1);
        assert_eq!(cart.items_count(), 1);
        assert_eq!(cart.subtotal(), Money::from_rupees(120));
    }

    #[test]
    fn test_attach_images_keeps_existing() {
        let (p, q) = (ProductId::generate(), ProductId::generate());
        let mut cart = Cart::new();
        let mut with_image = item(q, VariantId::generate(), 10, 1);
        with_image.product_image = Some("old.jpg".to_owned());
        cart.add_item(item(p, VariantId::generate(), 10, 1));
        cart.add_item(with_image);

        let images = HashMap::from([(p, "p.jpg".to_owned()), (q, "q.jpg".to_owned())]);
        cart.attach_images(&images);

        let imgs: Vec<_> = cart.items().iter().map(|i| i.product_image.as_deref()).collect();
        assert_eq!(imgs, [Some("p.jpg"), Some("old.jpg")]);
    }
}
