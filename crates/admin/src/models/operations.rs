//! Kitchen and dispatch records: vendors, ingredients, recipes, batches,
//! delivery partners and deliveries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cozycat_core::validation::ValidationError;
use cozycat_core::{
    BatchId, BatchStatus, DeliveryId, DeliveryPartnerId, DeliveryStatus, IngredientId, Money,
    OrderId, OrderItemId, OrderStatus, ProductId, RecipeId, UserId, VendorId,
};

use super::order::{CustomerSnapshot, DeliveryAddress};

// =============================================================================
// Vendors
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Vendor {
    pub id: VendorId,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub payment_terms: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VendorInput {
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub payment_terms: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl VendorInput {
    /// # Errors
    ///
    /// Returns `ValidationError` when the name is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "vendor name is required"));
        }
        Ok(())
    }
}

// =============================================================================
// Ingredients
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub unit: String,
    pub current_stock: Decimal,
    pub reorder_level: Decimal,
    pub unit_cost: Money,
    pub vendor_id: Option<VendorId>,
    pub vendor_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const MAX_INGREDIENT_NAME: usize = 100;
const MAX_UNIT_LENGTH: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientInput {
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub current_stock: Decimal,
    #[serde(default = "default_reorder_level")]
    pub reorder_level: Decimal,
    #[serde(default)]
    pub unit_cost: Money,
    pub vendor_id: Option<VendorId>,
}

fn default_reorder_level() -> Decimal {
    Decimal::TEN
}

impl IngredientInput {
    /// # Errors
    ///
    /// Returns `ValidationError` for blank or overlong names and units, or
    /// negative quantities.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name = self.name.trim();
        if name.is_empty() || name.chars().count() > MAX_INGREDIENT_NAME {
            return Err(ValidationError::new(
                "name",
                format!("name must be 1-{MAX_INGREDIENT_NAME} characters"),
            ));
        }
        let unit = self.unit.trim();
        if unit.is_empty() || unit.chars().count() > MAX_UNIT_LENGTH {
            return Err(ValidationError::new(
                "unit",
                format!("unit must be 1-{MAX_UNIT_LENGTH} characters"),
            ));
        }
        if self.current_stock.is_sign_negative() {
            return Err(ValidationError::new("current_stock", "stock must be non-negative"));
        }
        if self.reorder_level.is_sign_negative() {
            return Err(ValidationError::new(
                "reorder_level",
                "reorder level must be non-negative",
            ));
        }
        if self.unit_cost.is_negative() {
            return Err(ValidationError::new("unit_cost", "cost must be non-negative"));
        }
        Ok(())
    }
}

// =============================================================================
// Recipes
// =============================================================================

/// One recipe line: the share of an ingredient in a product, by weight.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Recipe {
    pub id: RecipeId,
    pub product_id: ProductId,
    pub product_name: String,
    pub ingredient_id: IngredientId,
    pub ingredient_name: String,
    pub unit: String,
    pub percentage: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeInput {
    pub product_id: ProductId,
    pub ingredient_id: IngredientId,
    pub percentage: Decimal,
}

impl RecipeInput {
    /// # Errors
    ///
    /// Returns `ValidationError` when the percentage is outside 0..=100.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.percentage < Decimal::ZERO || self.percentage > Decimal::ONE_HUNDRED {
            return Err(ValidationError::new(
                "percentage",
                "percentage must be between 0 and 100",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Production batches
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Batch {
    pub id: BatchId,
    pub batch_number: String,
    pub order_id: Option<OrderId>,
    pub status: BatchStatus,
    pub notes: Option<String>,
    pub created_by: Option<UserId>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub delivery_created: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Batch list row with the order it cooks for.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BatchSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub batch: Batch,
    pub order_number: Option<String>,
    pub order_status: Option<OrderStatus>,
    pub item_count: i64,
    pub total_weight_grams: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBatch {
    pub order_id: OrderId,
    pub item_ids: Vec<OrderItemId>,
    pub notes: Option<String>,
}

// =============================================================================
// Deliveries
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DeliveryPartner {
    pub id: DeliveryPartnerId,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub vehicle_type: Option<String>,
    pub vehicle_number: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryPartnerInput {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub vehicle_type: Option<String>,
    pub vehicle_number: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl DeliveryPartnerInput {
    /// # Errors
    ///
    /// Returns `ValidationError` for a blank name or invalid phone.
    pub fn validate(&self) -> Result<String, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "partner name is required"));
        }
        let phone = cozycat_core::Phone::parse(&self.phone)
            .map_err(|e| ValidationError::new("phone", e.to_string()))?;
        Ok(phone.as_str().to_string())
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Delivery {
    pub id: DeliveryId,
    pub delivery_number: String,
    pub order_id: OrderId,
    pub batch_id: Option<BatchId>,
    pub delivery_partner_id: Option<DeliveryPartnerId>,
    pub status: DeliveryStatus,
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDelivery {
    pub batch_id: BatchId,
    pub order_id: OrderId,
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignPartner {
    pub delivery_partner_id: DeliveryPartnerId,
    pub tracking_number: Option<String>,
}

/// Filters for the delivery list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryFilter {
    pub status: Option<DeliveryStatus>,
    pub search: Option<String>,
}

/// Order fields shown on a delivery card.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DeliveryOrder {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub customer_id: Option<cozycat_core::CustomerId>,
    pub delivery_address_id: Option<cozycat_core::AddressId>,
    #[serde(skip)]
    pub customer_snapshot: sqlx::types::Json<CustomerSnapshot>,
}

/// Delivery assembled with its order, customer, address and partner.
///
/// Each link is looked up separately; a missing one leaves its fields
/// empty instead of failing the whole view.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryView {
    #[serde(flatten)]
    pub delivery: Delivery,
    pub order_number: Option<String>,
    pub order_status: Option<OrderStatus>,
    pub total_amount: Option<Money>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub address: Option<DeliveryAddress>,
    pub partner_name: Option<String>,
    pub partner_phone: Option<String>,
}

impl DeliveryView {
    #[must_use]
    pub const fn bare(delivery: Delivery) -> Self {
        Self {
            delivery,
            order_number: None,
            order_status: None,
            total_amount: None,
            customer_name: None,
            customer_phone: None,
            address: None,
            partner_name: None,
            partner_phone: None,
        }
    }

    /// Whether the view matches a free-text search on numbers, names and phones.
    #[must_use]
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        [
            Some(self.delivery.delivery_number.as_str()),
            self.order_number.as_deref(),
            self.customer_name.as_deref(),
            self.customer_phone.as_deref(),
            self.partner_name.as_deref(),
            self.delivery.tracking_number.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&term))
    }
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ingredient(name: &str, unit: &str) -> IngredientInput {
        IngredientInput {
            name: name.to_string(),
            unit: unit.to_string(),
            current_stock: Decimal::ZERO,
            reorder_level: Decimal::TEN,
            unit_cost: Money::ZERO,
            vendor_id: None,
        }
    }

    #[test]
    fn test_ingredient_defaults() {
        let input: IngredientInput =
            serde_json::from_str(r#"{"name": "Chicken breast", "unit": "kg"}"#).unwrap();
        assert_eq!(input.reorder_level, Decimal::TEN);
        assert_eq!(input.current_stock, Decimal::ZERO);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_ingredient_validation() {
        assert!(ingredient("", "kg").validate().is_err());
        assert!(ingredient("Pumpkin", "").validate().is_err());
        assert!(ingredient(&"x".repeat(101), "kg").validate().is_err());
        assert!(ingredient("Pumpkin", "kilograms-by-the-sack").validate().is_err());

        let mut negative = ingredient("Pumpkin", "kg");
        negative.current_stock = Decimal::NEGATIVE_ONE;
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_recipe_percentage_bounds() {
        let mut input = RecipeInput {
            product_id: ProductId::generate(),
            ingredient_id: IngredientId::generate(),
            percentage: Decimal::ONE_HUNDRED,
        };
        assert!(input.validate().is_ok());
        input.percentage = Decimal::new(1005, 1);
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_partner_phone_normalized() {
        let input = DeliveryPartnerInput {
            name: "Ravi".to_string(),
            phone: "98765-43210".to_string(),
            email: None,
            vehicle_type: Some("bike".to_string()),
            vehicle_number: None,
            is_active: true,
        };
        assert_eq!(input.validate().unwrap(), "9876543210");
    }

    #[test]
    fn test_delivery_view_search() {
        let now = Utc::now();
        let mut view = DeliveryView::bare(Delivery {
            id: DeliveryId::generate(),
            delivery_number: "DEL-12345678".to_string(),
            order_id: OrderId::generate(),
            batch_id: None,
            delivery_partner_id: None,
            status: DeliveryStatus::Pending,
            estimated_delivery_date: None,
            actual_delivery_date: None,
            tracking_number: None,
            notes: None,
            created_at: now,
            updated_at: now,
        });
        assert!(view.matches("del-1234"));
        assert!(!view.matches("Meera"));
        view.customer_name = Some("Meera Iyer".to_string());
        assert!(view.matches("meera"));
    }
}
