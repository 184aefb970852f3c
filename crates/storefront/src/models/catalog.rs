//! Catalog types: categories, products and their weight variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cozycat_core::{CategoryId, Money, ProductId, VariantId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub nutritional_info: Option<serde_json::Value>,
    pub ingredients_display: Option<String>,
    pub image_url: Option<String>,
    pub display_order: i32,
    /// Cheapest variant price, used for listing and price filters.
    pub min_price: Option<Money>,
    pub created_at: DateTime<Utc>,
}

/// A purchasable size of a product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub weight_grams: i32,
    pub price: Money,
    pub sku: Option<String>,
}

/// A variant joined with the product fields needed to put it in a cart.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PurchasableVariant {
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub product_name: String,
    pub image_url: Option<String>,
    pub weight_grams: i32,
    pub price: Money,
    pub sku: Option<String>,
}

/// A product with all of its variants, lightest first.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<Variant>,
}

/// Listing order for the product catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Featured,
    PriceAsc,
    PriceDesc,
    Name,
    Newest,
}

impl ProductSort {
    /// `ORDER BY` clause for this sort. Only ever interpolates constants.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Featured => "p.display_order ASC, p.name ASC",
            Self::PriceAsc => "min_price ASC NULLS LAST, p.name ASC",
            Self::PriceDesc => "min_price DESC NULLS LAST, p.name ASC",
            Self::Name => "p.name ASC",
            Self::Newest => "p.created_at DESC",
        }
    }
}

/// Catalog listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub sort: ProductSort,
}
