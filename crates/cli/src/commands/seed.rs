//! Seed catalog and kitchen data from YAML.
//!
//! Everything is upserted by natural key in one transaction, so a seed file
//! can be re-applied after edits:
//!
//! | Table              | Key                                        |
//! |--------------------|--------------------------------------------|
//! | `categories`       | `slug`                                     |
//! | `products`         | `slug`                                     |
//! | `product_variants` | `sku`, else `(product, weight_grams)`      |
//! | `vendors`          | `name`                                     |
//! | `ingredients`      | `name`                                     |
//! | `product_recipes`  | `(product, ingredient)`                    |
//!
//! ```yaml
//! categories:
//!   - { name: Meals, slug: meals }
//! products:
//!   - name: Chicken Feast
//!     category: meals
//!     variants:
//!       - { weight_grams: 500, price: 349.00, sku: CF-500 }
//!     recipe:
//!       - { ingredient: Chicken breast, percentage: 70 }
//! vendors:
//!   - { name: Fresh Farms, phone: "+919800000000" }
//! ingredients:
//!   - { name: Chicken breast, unit: kg, current_stock: 25, reorder_level: 10, unit_cost: 280, vendor: Fresh Farms }
//! ```

use std::collections::HashMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, Postgres, Transaction};

use cozycat_core::validation;
use cozycat_core::{CategoryId, IngredientId, ProductId, VendorId};

use super::{CommandError, connect};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedFile {
    pub categories: Vec<SeedCategory>,
    pub products: Vec<SeedProduct>,
    pub vendors: Vec<SeedVendor>,
    pub ingredients: Vec<SeedIngredient>,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    pub slug: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub ingredients_display: Option<String>,
    pub image_url: Option<String>,
    pub nutritional_info: Option<serde_json::Value>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub variants: Vec<SeedVariant>,
    #[serde(default)]
    pub recipe: Vec<SeedRecipeLine>,
}

#[derive(Debug, Deserialize)]
pub struct SeedVariant {
    pub weight_grams: i32,
    pub price: Decimal,
    pub sku: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedRecipeLine {
    /// Ingredient name.
    pub ingredient: String,
    pub percentage: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct SeedVendor {
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub payment_terms: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedIngredient {
    pub name: String,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub current_stock: Decimal,
    #[serde(default)]
    pub reorder_level: Decimal,
    #[serde(default)]
    pub unit_cost: Decimal,
    /// Vendor name.
    pub vendor: Option<String>,
}

fn default_unit() -> String {
    "kg".to_string()
}

fn slug_for(name: &str, slug: Option<&str>) -> Result<String, CommandError> {
    let slug = slug.map_or_else(|| validation::slugify(name), str::to_string);
    validation::slug(&slug).map_err(|e| CommandError::Invalid(format!("{name}: {e}")))
}

impl SeedFile {
    /// Reject entries that would fail table constraints, with the offending name.
    fn validate(&self) -> Result<(), CommandError> {
        let invalid = |what: &str, name: &str, why: &str| {
            Err(CommandError::Invalid(format!("{what} {name}: {why}")))
        };
        for product in &self.products {
            for variant in &product.variants {
                if variant.weight_grams <= 0 {
                    return invalid("product", &product.name, "variant weight must be positive");
                }
                if variant.price.is_sign_negative() {
                    return invalid("product", &product.name, "variant price is negative");
                }
            }
            for line in &product.recipe {
                if line.percentage < Decimal::ZERO || line.percentage > Decimal::ONE_HUNDRED {
                    return invalid("product", &product.name, "recipe percentage outside 0..=100");
                }
            }
        }
        for ingredient in &self.ingredients {
            if ingredient.current_stock.is_sign_negative()
                || ingredient.reorder_level.is_sign_negative()
                || ingredient.unit_cost.is_sign_negative()
            {
                return invalid(
                    "ingredient",
                    &ingredient.name,
                    "stock, reorder level and cost must not be negative",
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SeedSummary {
    categories: usize,
    products: usize,
    variants: usize,
    vendors: usize,
    ingredients: usize,
    recipes: usize,
}

/// Apply a seed file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, references an
/// unknown category or ingredient, or a write fails. Nothing is written
/// unless the whole file applies.
pub async fn run(path: &Path) -> Result<(), CommandError> {
    tracing::info!(path = %path.display(), "Loading seed file");
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;
    seed.validate()?;

    let pool = connect().await?;
    let mut tx = pool.begin().await?;
    let summary = apply(&mut tx, &seed).await?;
    tx.commit().await?;

    tracing::info!("Seeding complete!");
    tracing::info!("  Categories: {}", summary.categories);
    tracing::info!("  Products: {} ({} variants)", summary.products, summary.variants);
    tracing::info!("  Vendors: {}", summary.vendors);
    tracing::info!("  Ingredients: {}", summary.ingredients);
    tracing::info!("  Recipe lines: {}", summary.recipes);
    Ok(())
}

async fn apply(
    tx: &mut Transaction<'_, Postgres>,
    seed: &SeedFile,
) -> Result<SeedSummary, CommandError> {
    let mut summary = SeedSummary::default();

    let mut categories: HashMap<String, CategoryId> = HashMap::new();
    for category in &seed.categories {
        let slug = slug_for(&category.name, category.slug.as_deref())?;
        let id = upsert_category(tx, category, &slug).await?;
        categories.insert(slug, id);
        summary.categories += 1;
    }

    let mut vendors: HashMap<&str, VendorId> = HashMap::new();
    for vendor in &seed.vendors {
        let id = upsert_vendor(tx, vendor).await?;
        vendors.insert(vendor.name.as_str(), id);
        summary.vendors += 1;
    }

    let mut ingredients: HashMap<&str, IngredientId> = HashMap::new();
    for ingredient in &seed.ingredients {
        let vendor_id = match ingredient.vendor.as_deref() {
            Some(name) => Some(*vendors.get(name).ok_or_else(|| {
                CommandError::Invalid(format!(
                    "ingredient {}: unknown vendor {name}",
                    ingredient.name
                ))
            })?),
            None => None,
        };
        let id = upsert_ingredient(tx, ingredient, vendor_id).await?;
        ingredients.insert(ingredient.name.as_str(), id);
        summary.ingredients += 1;
    }

    for product in &seed.products {
        let category_id = match product.category.as_deref() {
            Some(slug) => Some(*categories.get(slug).ok_or_else(|| {
                CommandError::Invalid(format!(
                    "product {}: unknown category {slug}",
                    product.name
                ))
            })?),
            None => None,
        };
        let slug = slug_for(&product.name, product.slug.as_deref())?;
        let product_id = upsert_product(tx, product, &slug, category_id).await?;
        summary.products += 1;

        for variant in &product.variants {
            upsert_variant(tx, product_id, variant).await?;
            summary.variants += 1;
        }
        for line in &product.recipe {
            let ingredient_id = *ingredients.get(line.ingredient.as_str()).ok_or_else(|| {
                CommandError::Invalid(format!(
                    "product {}: unknown ingredient {}",
                    product.name, line.ingredient
                ))
            })?;
            upsert_recipe_line(tx, product_id, ingredient_id, line.percentage).await?;
            summary.recipes += 1;
        }
    }

    Ok(summary)
}

async fn upsert_category(
    conn: &mut PgConnection,
    category: &SeedCategory,
    slug: &str,
) -> Result<CategoryId, CommandError> {
    let id = sqlx::query_scalar(
        r"
        INSERT INTO categories (name, slug, description, display_order)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (slug) DO UPDATE
        SET name = EXCLUDED.name, description = EXCLUDED.description,
            display_order = EXCLUDED.display_order
        RETURNING id
        ",
    )
    .bind(category.name.trim())
    .bind(slug)
    .bind(category.description.as_deref())
    .bind(category.display_order)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

async fn upsert_product(
    conn: &mut PgConnection,
    product: &SeedProduct,
    slug: &str,
    category_id: Option<CategoryId>,
) -> Result<ProductId, CommandError> {
    let id = sqlx::query_scalar(
        r"
        INSERT INTO products (category_id, name, slug, description, short_description,
                              ingredients_display, image_url, nutritional_info, display_order)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (slug) DO UPDATE
        SET category_id = EXCLUDED.category_id, name = EXCLUDED.name,
            description = EXCLUDED.description,
            short_description = EXCLUDED.short_description,
            ingredients_display = EXCLUDED.ingredients_display,
            image_url = EXCLUDED.image_url, nutritional_info = EXCLUDED.nutritional_info,
            display_order = EXCLUDED.display_order, updated_at = NOW()
        RETURNING id
        ",
    )
    .bind(category_id)
    .bind(product.name.trim())
    .bind(slug)
    .bind(product.description.as_deref())
    .bind(product.short_description.as_deref())
    .bind(product.ingredients_display.as_deref())
    .bind(product.image_url.as_deref())
    .bind(product.nutritional_info.as_ref())
    .bind(product.display_order)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

async fn upsert_variant(
    conn: &mut PgConnection,
    product_id: ProductId,
    variant: &SeedVariant,
) -> Result<(), CommandError> {
    if let Some(sku) = variant.sku.as_deref() {
        sqlx::query(
            r"
            INSERT INTO product_variants (product_id, weight_grams, price, sku)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (sku) DO UPDATE
            SET product_id = EXCLUDED.product_id, weight_grams = EXCLUDED.weight_grams,
                price = EXCLUDED.price
            ",
        )
        .bind(product_id)
        .bind(variant.weight_grams)
        .bind(variant.price)
        .bind(sku)
        .execute(conn)
        .await?;
        return Ok(());
    }

    let updated = sqlx::query(
        "UPDATE product_variants SET price = $3 WHERE product_id = $1 AND weight_grams = $2",
    )
    .bind(product_id)
    .bind(variant.weight_grams)
    .bind(variant.price)
    .execute(&mut *conn)
    .await?;
    if updated.rows_affected() == 0 {
        sqlx::query(
            "INSERT INTO product_variants (product_id, weight_grams, price) VALUES ($1, $2, $3)",
        )
        .bind(product_id)
        .bind(variant.weight_grams)
        .bind(variant.price)
        .execute(conn)
        .await?;
    }
    Ok(())
}

async fn upsert_vendor(
    conn: &mut PgConnection,
    vendor: &SeedVendor,
) -> Result<VendorId, CommandError> {
    let existing: Option<VendorId> =
        sqlx::query_scalar("SELECT id FROM vendors WHERE name = $1 ORDER BY created_at LIMIT 1")
            .bind(vendor.name.trim())
            .fetch_optional(&mut *conn)
            .await?;

    let id = if let Some(id) = existing {
        sqlx::query(
            r"
            UPDATE vendors
            SET contact_person = $2, phone = $3, email = $4, address = $5,
                payment_terms = $6, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(vendor.contact_person.as_deref())
        .bind(vendor.phone.as_deref())
        .bind(vendor.email.as_deref())
        .bind(vendor.address.as_deref())
        .bind(vendor.payment_terms.as_deref())
        .execute(conn)
        .await?;
        id
    } else {
        sqlx::query_scalar(
            r"
            INSERT INTO vendors (name, contact_person, phone, email, address, payment_terms)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(vendor.name.trim())
        .bind(vendor.contact_person.as_deref())
        .bind(vendor.phone.as_deref())
        .bind(vendor.email.as_deref())
        .bind(vendor.address.as_deref())
        .bind(vendor.payment_terms.as_deref())
        .fetch_one(conn)
        .await?
    };
    Ok(id)
}

async fn upsert_ingredient(
    conn: &mut PgConnection,
    ingredient: &SeedIngredient,
    vendor_id: Option<VendorId>,
) -> Result<IngredientId, CommandError> {
    let id = sqlx::query_scalar(
        r"
        INSERT INTO ingredients (name, unit, current_stock, reorder_level, unit_cost, vendor_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (name) DO UPDATE
        SET unit = EXCLUDED.unit, current_stock = EXCLUDED.current_stock,
            reorder_level = EXCLUDED.reorder_level, unit_cost = EXCLUDED.unit_cost,
            vendor_id = EXCLUDED.vendor_id, updated_at = NOW()
        RETURNING id
        ",
    )
    .bind(ingredient.name.trim())
    .bind(ingredient.unit.trim())
    .bind(ingredient.current_stock)
    .bind(ingredient.reorder_level)
    .bind(ingredient.unit_cost)
    .bind(vendor_id)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

async fn upsert_recipe_line(
    conn: &mut PgConnection,
    product_id: ProductId,
    ingredient_id: IngredientId,
    percentage: Decimal,
) -> Result<(), CommandError> {
    sqlx::query(
        r"
        INSERT INTO product_recipes (product_id, ingredient_id, percentage)
        VALUES ($1, $2, $3)
        ON CONFLICT (product_id, ingredient_id) DO UPDATE SET percentage = EXCLUDED.percentage
        ",
    )
    .bind(product_id)
    .bind(ingredient_id)
    .bind(percentage)
    .execute(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
categories:
  - { name: Meals, slug: meals }
products:
  - name: Chicken Feast
    category: meals
    variants:
      - { weight_grams: 500, price: 349.00, sku: CF-500 }
      - { weight_grams: 1000, price: "649.50" }
    recipe:
      - { ingredient: Chicken breast, percentage: 70 }
vendors:
  - { name: Fresh Farms, phone: "+919800000000" }
ingredients:
  - { name: Chicken breast, current_stock: 25, reorder_level: 10, unit_cost: 280, vendor: Fresh Farms }
"#;

    #[test]
    fn test_parse_sample() {
        let seed: SeedFile = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(seed.categories.len(), 1);
        assert_eq!(seed.products[0].variants.len(), 2);
        assert_eq!(seed.products[0].variants[1].price, Decimal::new(64950, 2));
        assert_eq!(seed.ingredients[0].unit, "kg");
        assert_eq!(seed.ingredients[0].vendor.as_deref(), Some("Fresh Farms"));
        seed.validate().unwrap();
    }

    #[test]
    fn test_empty_file_is_valid() {
        let seed: SeedFile = serde_yaml::from_str("{}").unwrap();
        assert!(seed.products.is_empty());
        seed.validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_percentage() {
        let seed: SeedFile = serde_yaml::from_str(
            "products:\n  - name: Fish Bites\n    recipe:\n      - { ingredient: Tuna, percentage: 120 }\n",
        )
        .unwrap();
        let err = seed.validate().unwrap_err();
        assert!(err.to_string().contains("Fish Bites"));
    }

    #[test]
    fn test_slug_defaults_to_name() {
        assert_eq!(slug_for("Chicken Feast", None).unwrap(), "chicken-feast");
        assert_eq!(slug_for("Chicken Feast", Some("feast")).unwrap(), "feast");
        assert!(slug_for("Chicken Feast", Some("Not A Slug")).is_err());
    }
}
