//! Catalog management types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cozycat_core::validation::{self, ValidationError};
use cozycat_core::{CategoryId, Money, ProductId, VariantId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A product as staff see it, inactive ones included.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub nutritional_info: Option<serde_json::Value>,
    pub ingredients_display: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub weight_grams: i32,
    pub price: Money,
    pub sku: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductWithVariants {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

impl CategoryInput {
    /// Trimmed name and a slug derived from the name when none is given.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an empty name or malformed slug.
    pub fn normalized(&self) -> Result<(String, String), ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::new("name", "name is required"));
        }
        let slug = match &self.slug {
            Some(s) => validation::slug(s)?,
            None => validation::slug(&validation::slugify(name))?,
        };
        Ok((name.to_string(), slug))
    }
}

/// Create or full-replace payload for a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub nutritional_info: Option<serde_json::Value>,
    pub ingredients_display: Option<String>,
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: i32,
}

const fn default_true() -> bool {
    true
}

impl ProductInput {
    /// Validate and fill in the slug from the name when missing.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an empty name or malformed slug.
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::new("name", "name is required"));
        }
        let slug = match self.slug.as_deref() {
            Some(s) => validation::slug(s)?,
            None => validation::slug(&validation::slugify(&name))?,
        };
        self.name = name;
        self.slug = Some(slug);
        Ok(self)
    }

    /// The slug after [`Self::validated`].
    #[must_use]
    pub fn slug(&self) -> &str {
        self.slug.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariantInput {
    pub weight_grams: i32,
    pub price: Money,
    pub sku: Option<String>,
}

impl VariantInput {
    /// # Errors
    ///
    /// Returns `ValidationError` for a non-positive weight or negative price.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.weight_grams <= 0 {
            return Err(ValidationError::new(
                "weight_grams",
                "weight must be greater than zero",
            ));
        }
        if self.price.is_negative() {
            return Err(ValidationError::new("price", "price cannot be negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(name: &str, slug: Option<&str>) -> ProductInput {
        ProductInput {
            category_id: None,
            name: name.to_string(),
            slug: slug.map(String::from),
            description: None,
            short_description: None,
            nutritional_info: None,
            ingredients_display: None,
            image_url: None,
            is_active: true,
            display_order: 0,
        }
    }

    #[test]
    fn test_product_slug_derived_from_name() {
        let input = product("  Chicken Feast ", None).validated().unwrap();
        assert_eq!(input.name, "Chicken Feast");
        assert_eq!(input.slug(), "chicken-feast");
    }

    #[test]
    fn test_product_requires_name() {
        assert!(product("   ", None).validated().is_err());
    }

    #[test]
    fn test_variant_validation() {
        let ok = VariantInput {
            weight_grams: 250,
            price: Money::from_rupees(199),
            sku: None,
        };
        assert!(ok.validate().is_ok());

        let weightless = VariantInput { weight_grams: 0, ..ok.clone() };
        assert!(weightless.validate().is_err());

        let negative = VariantInput {
            price: Money::from_rupees(-1),
            ..ok
        };
        assert!(negative.validate().is_err());
    }
}
