//! Inventory overview: stock levels, low-stock list and stock value.

use rust_decimal::Decimal;
use serde::Serialize;

use cozycat_core::Money;

use crate::models::Ingredient;

/// How current stock compares with the reorder level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    /// At or below a quarter of the reorder level.
    Critical,
    /// At or below half of the reorder level.
    Low,
    Good,
}

impl StockLevel {
    /// Ingredients without a reorder level are always `Good`.
    #[must_use]
    pub fn classify(current_stock: Decimal, reorder_level: Decimal) -> Self {
        if reorder_level <= Decimal::ZERO {
            return Self::Good;
        }
        let percent = current_stock * Decimal::ONE_HUNDRED / reorder_level;
        if percent <= Decimal::from(25) {
            Self::Critical
        } else if percent <= Decimal::from(50) {
            Self::Low
        } else {
            Self::Good
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Low => "low",
            Self::Good => "good",
        }
    }

    #[must_use]
    pub const fn needs_reorder(self) -> bool {
        matches!(self, Self::Critical | Self::Low)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryLine {
    #[serde(flatten)]
    pub ingredient: Ingredient,
    pub level: StockLevel,
    pub stock_value: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryReport {
    pub ingredients: Vec<InventoryLine>,
    pub low_stock: Vec<InventoryLine>,
    pub critical_count: usize,
    pub low_count: usize,
    pub total_stock_value: Money,
}

impl InventoryReport {
    #[must_use]
    pub fn build(ingredients: Vec<Ingredient>) -> Self {
        let ingredients: Vec<InventoryLine> = ingredients
            .into_iter()
            .map(|ingredient| InventoryLine {
                level: StockLevel::classify(ingredient.current_stock, ingredient.reorder_level),
                stock_value: Money::new(ingredient.current_stock * ingredient.unit_cost.amount()),
                ingredient,
            })
            .collect();

        let low_stock: Vec<InventoryLine> = ingredients
            .iter()
            .filter(|line| line.level.needs_reorder())
            .cloned()
            .collect();

        Self {
            critical_count: low_stock
                .iter()
                .filter(|l| l.level == StockLevel::Critical)
                .count(),
            low_count: low_stock.iter().filter(|l| l.level == StockLevel::Low).count(),
            total_stock_value: ingredients.iter().map(|l| l.stock_value).sum(),
            low_stock,
            ingredients,
        }
    }

    /// Plain-text body for the low-stock alert email.
    #[must_use]
    pub fn alert_text(&self) -> String {
        let mut body = format!(
            "{} ingredient(s) are at or below half their reorder level.\n\n",
            self.low_stock.len()
        );
        for line in &self.low_stock {
            let i = &line.ingredient;
            body.push_str(&format!(
                "- {} [{}]: {} {} in stock, reorder level {} {}{}\n",
                i.name,
                match line.level {
                    StockLevel::Critical => "CRITICAL",
                    StockLevel::Low | StockLevel::Good => "low",
                },
                i.current_stock.normalize(),
                i.unit,
                i.reorder_level.normalize(),
                i.unit,
                i.vendor_name
                    .as_deref()
                    .map(|v| format!(" (vendor: {v})"))
                    .unwrap_or_default(),
            ));
        }
        body
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;
    use cozycat_core::IngredientId;

    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn ingredient(name: &str, stock: &str, reorder: &str, cost: i64) -> Ingredient {
        Ingredient {
            id: IngredientId::generate(),
            name: name.to_string(),
            unit: "kg".to_string(),
            current_stock: dec(stock),
            reorder_level: dec(reorder),
            unit_cost: Money::from_rupees(cost),
            vendor_id: None,
            vendor_name: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_stock_level_thresholds() {
        assert_eq!(StockLevel::classify(dec("2.5"), dec("10")), StockLevel::Critical);
        assert_eq!(StockLevel::classify(dec("5"), dec("10")), StockLevel::Low);
        assert_eq!(StockLevel::classify(dec("5.1"), dec("10")), StockLevel::Good);
        assert_eq!(StockLevel::classify(dec("0"), dec("0")), StockLevel::Good);
    }

    #[test]
    fn test_report_totals() {
        let report = InventoryReport::build(vec![
            ingredient("Chicken", "2", "10", 300),
            ingredient("Pumpkin", "4", "10", 50),
            ingredient("Rice", "40", "10", 60),
        ]);
        assert_eq!(report.ingredients.len(), 3);
        assert_eq!(report.low_stock.len(), 2);
        assert_eq!(report.critical_count, 1);
        assert_eq!(report.low_count, 1);
        // 2*300 + 4*50 + 40*60
        assert_eq!(report.total_stock_value, Money::from_rupees(3200));

        let text = report.alert_text();
        assert!(text.contains("Chicken [CRITICAL]"));
        assert!(!text.contains("Rice"));
    }
}
