//! Catalog management: categories, products and variants.

use std::collections::HashMap;

use sqlx::PgPool;

use cozycat_core::{CategoryId, ProductId, VariantId};

use super::{RepositoryError, conflict_on_reference, conflict_on_unique};
use crate::models::{
    Category, CategoryInput, Product, ProductInput, ProductWithVariants, Variant, VariantInput,
};

const PRODUCT_SELECT: &str = "SELECT p.id, p.category_id, c.name AS category_name, p.name, \
     p.slug, p.description, p.short_description, p.nutritional_info, p.ingredients_display, \
     p.image_url, p.is_active, p.display_order, p.created_at, p.updated_at \
     FROM products p LEFT JOIN categories c ON c.id = p.category_id";

const VARIANT_COLUMNS: &str = "id, product_id, weight_grams, price, sku, created_at";

pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, description, display_order, is_active, created_at
             FROM categories ORDER BY display_order, name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create_category(
        &self,
        name: &str,
        slug: &str,
        input: &CategoryInput,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            r"
            INSERT INTO categories (name, slug, description, display_order)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, slug, description, display_order, is_active, created_at
            ",
        )
        .bind(name)
        .bind(slug)
        .bind(&input.description)
        .bind(input.display_order)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "category slug"))
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Every product, inactive ones included, with variants lightest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_products(&self) -> Result<Vec<ProductWithVariants>, RepositoryError> {
        let sql = format!("{PRODUCT_SELECT} ORDER BY p.display_order, p.name");
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(self.pool)
            .await?;

        let sql = format!("SELECT {VARIANT_COLUMNS} FROM product_variants ORDER BY weight_grams");
        let variants = sqlx::query_as::<_, Variant>(&sql)
            .fetch_all(self.pool)
            .await?;

        let mut by_product: HashMap<ProductId, Vec<Variant>> = HashMap::new();
        for variant in variants {
            by_product.entry(variant.product_id).or_default().push(variant);
        }

        Ok(products
            .into_iter()
            .map(|product| ProductWithVariants {
                variants: by_product.remove(&product.id).unwrap_or_default(),
                product,
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn get_product(&self, id: ProductId) -> Result<ProductWithVariants, RepositoryError> {
        let sql = format!("{PRODUCT_SELECT} WHERE p.id = $1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let sql = format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variants WHERE product_id = $1 ORDER BY weight_grams"
        );
        let variants = sqlx::query_as::<_, Variant>(&sql)
            .bind(id)
            .fetch_all(self.pool)
            .await?;

        Ok(ProductWithVariants { product, variants })
    }

    /// Insert a product. `input` must already be validated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create_product(&self, input: &ProductInput) -> Result<ProductId, RepositoryError> {
        sqlx::query_scalar(
            r"
            INSERT INTO products
                (category_id, name, slug, description, short_description, nutritional_info,
                 ingredients_display, image_url, is_active, display_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            ",
        )
        .bind(input.category_id)
        .bind(&input.name)
        .bind(input.slug())
        .bind(&input.description)
        .bind(&input.short_description)
        .bind(&input.nutritional_info)
        .bind(&input.ingredients_display)
        .bind(&input.image_url)
        .bind(input.is_active)
        .bind(input.display_order)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "product slug"))
    }

    /// Replace a product's fields. `input` must already be validated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE products
            SET category_id = $2, name = $3, slug = $4, description = $5,
                short_description = $6, nutritional_info = $7, ingredients_display = $8,
                image_url = $9, is_active = $10, display_order = $11, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(input.category_id)
        .bind(&input.name)
        .bind(input.slug())
        .bind(&input.description)
        .bind(&input.short_description)
        .bind(&input.nutritional_info)
        .bind(&input.ingredients_display)
        .bind(&input.image_url)
        .bind(input.is_active)
        .bind(input.display_order)
        .execute(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "product slug"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Hide a product from the shop. Orders keep referencing it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn deactivate_product(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Variants
    // =========================================================================

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if the SKU is taken.
    pub async fn add_variant(
        &self,
        product_id: ProductId,
        input: &VariantInput,
    ) -> Result<Variant, RepositoryError> {
        let sql = format!(
            "INSERT INTO product_variants (product_id, weight_grams, price, sku)
             VALUES ($1, $2, $3, $4) RETURNING {VARIANT_COLUMNS}"
        );
        sqlx::query_as::<_, Variant>(&sql)
            .bind(product_id)
            .bind(input.weight_grams)
            .bind(input.price)
            .bind(&input.sku)
            .fetch_one(self.pool)
            .await
            .map_err(|e| match conflict_on_reference(e, "product") {
                RepositoryError::Conflict(_) => RepositoryError::NotFound,
                RepositoryError::Database(e) => conflict_on_unique(e, "SKU"),
                other => other,
            })
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the variant does not exist.
    /// Returns `RepositoryError::Conflict` if the SKU is taken.
    pub async fn update_variant(
        &self,
        id: VariantId,
        input: &VariantInput,
    ) -> Result<Variant, RepositoryError> {
        let sql = format!(
            "UPDATE product_variants SET weight_grams = $2, price = $3, sku = $4
             WHERE id = $1 RETURNING {VARIANT_COLUMNS}"
        );
        sqlx::query_as::<_, Variant>(&sql)
            .bind(id)
            .bind(input.weight_grams)
            .bind(input.price)
            .bind(&input.sku)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "SKU"))?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a variant that no order has used.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the variant does not exist.
    /// Returns `RepositoryError::Conflict` if order items reference it.
    pub async fn delete_variant(&self, id: VariantId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM product_variants WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                conflict_on_reference(e, "Variant has been ordered; change its price instead")
            })?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category_exists(&self, id: CategoryId) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
            .bind(id)
            .fetch_one(self.pool)
            .await?;
        Ok(exists)
    }
}
