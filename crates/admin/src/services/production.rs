//! Ingredient requirements for the production queue.
//!
//! Pure arithmetic over order items and recipe lines; the database layer
//! loads the inputs and these functions turn them into requirement rows.
//!
//! For each item the cooked weight is `weight_grams * quantity`. Each recipe
//! line of the product needs `weight * percentage / 100` grams of its
//! ingredient, converted into the ingredient's stock unit.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use cozycat_core::{IngredientId, OrderId, OrderStatus, ProductId, StockStatus};

use crate::models::{OrderDetail, OrderItem};

/// One order line as the kitchen needs it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductionItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub weight_grams: i32,
    pub quantity: i32,
}

impl ProductionItem {
    /// Cooked weight of this line in grams.
    #[must_use]
    pub fn batch_grams(&self) -> Decimal {
        Decimal::from(self.weight_grams) * Decimal::from(self.quantity)
    }
}

impl From<&OrderItem> for ProductionItem {
    fn from(item: &OrderItem) -> Self {
        Self {
            order_id: item.order_id,
            product_id: item.product_id,
            weight_grams: item.weight_grams,
            quantity: item.quantity,
        }
    }
}

/// A recipe line joined with the ingredient's stock and supplier.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecipeLine {
    pub product_id: ProductId,
    pub ingredient_id: IngredientId,
    pub ingredient_name: String,
    pub unit: String,
    pub percentage: Decimal,
    pub current_stock: Decimal,
    pub supplier_name: Option<String>,
    pub supplier_phone: Option<String>,
    pub supplier_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientRequirement {
    pub ingredient_id: IngredientId,
    pub ingredient_name: String,
    pub unit: String,
    pub required_quantity: Decimal,
    pub current_stock: Decimal,
    pub stock_status: StockStatus,
    pub supplier_name: Option<String>,
    pub supplier_phone: Option<String>,
    pub supplier_email: Option<String>,
}

/// Requirement for one ingredient summed over many orders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativeRequirement {
    pub ingredient_id: IngredientId,
    pub ingredient_name: String,
    pub unit: String,
    pub total_required: Decimal,
    pub current_stock: Decimal,
    pub shortage: Decimal,
    pub affected_orders: Vec<OrderId>,
    pub supplier_name: Option<String>,
    pub supplier_phone: Option<String>,
    pub supplier_email: Option<String>,
}

/// Convert grams into an ingredient's stock unit.
///
/// `kg` divides by 1000; `g`, `grams` and any unit we do not recognise are
/// treated as grams.
#[must_use]
pub fn grams_to_unit(grams: Decimal, unit: &str) -> Decimal {
    match unit.trim().to_ascii_lowercase().as_str() {
        "kg" | "kgs" | "kilogram" | "kilograms" => grams / Decimal::ONE_THOUSAND,
        _ => grams,
    }
}

/// Required amount of one recipe line for `grams` of cooked product.
#[must_use]
pub fn line_requirement(grams: Decimal, line: &RecipeLine) -> Decimal {
    grams_to_unit(grams * line.percentage / Decimal::ONE_HUNDRED, &line.unit)
}

/// Per-ingredient requirements for a set of items, ingredient name order.
#[must_use]
pub fn requirements_for(
    items: &[ProductionItem],
    recipes: &[RecipeLine],
) -> Vec<IngredientRequirement> {
    let mut by_ingredient: BTreeMap<(String, IngredientId), IngredientRequirement> =
        BTreeMap::new();

    for item in items {
        let grams = item.batch_grams();
        for line in recipes.iter().filter(|l| l.product_id == item.product_id) {
            let amount = line_requirement(grams, line);
            by_ingredient
                .entry((line.ingredient_name.clone(), line.ingredient_id))
                .and_modify(|r| r.required_quantity += amount)
                .or_insert_with(|| IngredientRequirement {
                    ingredient_id: line.ingredient_id,
                    ingredient_name: line.ingredient_name.clone(),
                    unit: line.unit.clone(),
                    required_quantity: amount,
                    current_stock: line.current_stock,
                    stock_status: StockStatus::Sufficient,
                    supplier_name: line.supplier_name.clone(),
                    supplier_phone: line.supplier_phone.clone(),
                    supplier_email: line.supplier_email.clone(),
                });
        }
    }

    by_ingredient
        .into_values()
        .map(|mut r| {
            r.stock_status = StockStatus::classify(r.current_stock, r.required_quantity);
            r
        })
        .collect()
}

/// Whether every requirement is covered by stock.
#[must_use]
pub fn can_produce(requirements: &[IngredientRequirement]) -> bool {
    requirements
        .iter()
        .all(|r| r.stock_status == StockStatus::Sufficient)
}

#[must_use]
pub fn insufficient_count(requirements: &[IngredientRequirement]) -> usize {
    requirements
        .iter()
        .filter(|r| r.stock_status != StockStatus::Sufficient)
        .count()
}

/// Sum requirements per ingredient across orders.
///
/// `shortage` is how much the total exceeds current stock, never negative.
#[must_use]
pub fn cumulative(
    per_order: &[(OrderId, Vec<IngredientRequirement>)],
) -> Vec<CumulativeRequirement> {
    let mut totals: BTreeMap<(String, IngredientId), CumulativeRequirement> = BTreeMap::new();

    for (order_id, requirements) in per_order {
        for req in requirements {
            let entry = totals
                .entry((req.ingredient_name.clone(), req.ingredient_id))
                .or_insert_with(|| CumulativeRequirement {
                    ingredient_id: req.ingredient_id,
                    ingredient_name: req.ingredient_name.clone(),
                    unit: req.unit.clone(),
                    total_required: Decimal::ZERO,
                    current_stock: req.current_stock,
                    shortage: Decimal::ZERO,
                    affected_orders: Vec::new(),
                    supplier_name: req.supplier_name.clone(),
                    supplier_phone: req.supplier_phone.clone(),
                    supplier_email: req.supplier_email.clone(),
                });
            entry.total_required += req.required_quantity;
            if !entry.affected_orders.contains(order_id) {
                entry.affected_orders.push(*order_id);
            }
        }
    }

    totals
        .into_values()
        .map(|mut r| {
            r.shortage = (r.total_required - r.current_stock).max(Decimal::ZERO);
            r
        })
        .collect()
}

/// An order in the kitchen queue with what it takes to cook it.
#[derive(Debug, Clone, Serialize)]
pub struct QueueEntry {
    #[serde(flatten)]
    pub detail: OrderDetail,
    pub requirements: Vec<IngredientRequirement>,
    pub can_produce: bool,
    pub insufficient_count: usize,
    pub total_weight_grams: i64,
    /// 1 for the oldest order.
    pub priority: usize,
}

fn items_of(detail: &OrderDetail) -> Vec<ProductionItem> {
    detail.items.iter().map(ProductionItem::from).collect()
}

/// Queue entries in the order given, which must be oldest first.
#[must_use]
pub fn build_queue(orders: Vec<OrderDetail>, recipes: &[RecipeLine]) -> Vec<QueueEntry> {
    orders
        .into_iter()
        .enumerate()
        .map(|(index, detail)| {
            let items = items_of(&detail);
            let requirements = requirements_for(&items, recipes);
            let total_weight_grams = detail
                .items
                .iter()
                .map(|i| i64::from(i.weight_grams) * i64::from(i.quantity))
                .sum();
            QueueEntry {
                can_produce: can_produce(&requirements),
                insufficient_count: insufficient_count(&requirements),
                requirements,
                total_weight_grams,
                priority: index + 1,
                detail,
            }
        })
        .collect()
}

/// Cumulative requirements over the `pending` orders among `orders`.
#[must_use]
pub fn pending_requirements(
    orders: &[OrderDetail],
    recipes: &[RecipeLine],
) -> Vec<CumulativeRequirement> {
    let per_order: Vec<(OrderId, Vec<IngredientRequirement>)> = orders
        .iter()
        .filter(|d| d.order.status == OrderStatus::Pending)
        .map(|d| (d.order.id, requirements_for(&items_of(d), recipes)))
        .collect();
    cumulative(&per_order)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn line(
        product: ProductId,
        ingredient: IngredientId,
        name: &str,
        unit: &str,
        pct: &str,
        stock: &str,
    ) -> RecipeLine {
        RecipeLine {
            product_id: product,
            ingredient_id: ingredient,
            ingredient_name: name.to_string(),
            unit: unit.to_string(),
            percentage: dec(pct),
            current_stock: dec(stock),
            supplier_name: Some("Fresh Farms".to_string()),
            supplier_phone: None,
            supplier_email: None,
        }
    }

    fn item(order: OrderId, product: ProductId, grams: i32, qty: i32) -> ProductionItem {
        ProductionItem {
            order_id: order,
            product_id: product,
            weight_grams: grams,
            quantity: qty,
        }
    }

    #[test]
    fn test_unit_conversion() {
        assert_eq!(grams_to_unit(dec("1500"), "kg"), dec("1.5"));
        assert_eq!(grams_to_unit(dec("1500"), " KG "), dec("1.5"));
        assert_eq!(grams_to_unit(dec("1500"), "g"), dec("1500"));
        assert_eq!(grams_to_unit(dec("1500"), "grams"), dec("1500"));
        assert_eq!(grams_to_unit(dec("1500"), "pieces"), dec("1500"));
    }

    #[test]
    fn test_requirements_for_single_item() {
        let order = OrderId::generate();
        let product = ProductId::generate();
        let chicken = IngredientId::generate();
        let pumpkin = IngredientId::generate();
        let recipes = vec![
            line(product, chicken, "Chicken", "kg", "70", "10"),
            line(product, pumpkin, "Pumpkin", "g", "30", "100"),
        ];

        // 2 x 500g = 1000g cooked
        let reqs = requirements_for(&[item(order, product, 500, 2)], &recipes);
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].ingredient_name, "Chicken");
        assert_eq!(reqs[0].required_quantity, dec("0.7"));
        assert_eq!(reqs[0].stock_status, StockStatus::Sufficient);
        assert_eq!(reqs[1].required_quantity, dec("300"));
        assert_eq!(reqs[1].stock_status, StockStatus::Insufficient);

        assert!(!can_produce(&reqs));
        assert_eq!(insufficient_count(&reqs), 1);
    }

    #[test]
    fn test_requirements_merge_lines_of_same_ingredient() {
        let order = OrderId::generate();
        let feast = ProductId::generate();
        let treat = ProductId::generate();
        let chicken = IngredientId::generate();
        let recipes = vec![
            line(feast, chicken, "Chicken", "kg", "50", "5"),
            line(treat, chicken, "Chicken", "kg", "100", "5"),
        ];

        let reqs = requirements_for(
            &[item(order, feast, 1000, 1), item(order, treat, 250, 2)],
            &recipes,
        );
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].required_quantity, dec("1"));
        assert!(can_produce(&reqs));
    }

    #[test]
    fn test_product_without_recipe_needs_nothing() {
        let reqs = requirements_for(
            &[item(OrderId::generate(), ProductId::generate(), 500, 1)],
            &[],
        );
        assert!(reqs.is_empty());
        assert!(can_produce(&reqs));
    }

    #[test]
    fn test_out_of_stock() {
        let product = ProductId::generate();
        let recipes = vec![line(product, IngredientId::generate(), "Salmon", "kg", "10", "0")];
        let reqs = requirements_for(&[item(OrderId::generate(), product, 100, 1)], &recipes);
        assert_eq!(reqs[0].stock_status, StockStatus::OutOfStock);
    }

    #[test]
    fn test_cumulative_shortage() {
        let product = ProductId::generate();
        let chicken = IngredientId::generate();
        let recipes = vec![line(product, chicken, "Chicken", "kg", "100", "1.5")];
        let first = OrderId::generate();
        let second = OrderId::generate();

        let per_order = vec![
            (first, requirements_for(&[item(first, product, 1000, 1)], &recipes)),
            (second, requirements_for(&[item(second, product, 500, 2)], &recipes)),
        ];
        let totals = cumulative(&per_order);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].total_required, dec("2"));
        assert_eq!(totals[0].shortage, dec("0.5"));
        assert_eq!(totals[0].affected_orders, vec![first, second]);
    }

    #[test]
    fn test_cumulative_shortage_never_negative() {
        let product = ProductId::generate();
        let recipes = vec![line(product, IngredientId::generate(), "Rice", "kg", "10", "50")];
        let order = OrderId::generate();
        let per_order = vec![(order, requirements_for(&[item(order, product, 1000, 1)], &recipes))];
        assert_eq!(cumulative(&per_order)[0].shortage, Decimal::ZERO);
    }
}
