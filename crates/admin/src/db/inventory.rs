//! Vendors, ingredients and product recipes.

use sqlx::PgPool;

use cozycat_core::{IngredientId, ProductId, RecipeId, VendorId};

use super::{RepositoryError, conflict_on_reference, conflict_on_unique};
use crate::models::{Ingredient, IngredientInput, Recipe, RecipeInput, Vendor, VendorInput};

const VENDOR_COLUMNS: &str = "id, name, contact_person, phone, email, address, payment_terms, \
     is_active, created_at, updated_at";

const INGREDIENT_SELECT: &str = "SELECT g.id, g.name, g.unit, g.current_stock, g.reorder_level, \
     g.unit_cost, g.vendor_id, v.name AS vendor_name, g.created_at, g.updated_at \
     FROM ingredients g LEFT JOIN vendors v ON v.id = g.vendor_id";

const RECIPE_SELECT: &str = "SELECT r.id, r.product_id, p.name AS product_name, r.ingredient_id, \
     g.name AS ingredient_name, g.unit, r.percentage, r.created_at \
     FROM product_recipes r \
     JOIN products p ON p.id = r.product_id \
     JOIN ingredients g ON g.id = r.ingredient_id";

pub struct InventoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InventoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Vendors
    // =========================================================================

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_vendors(&self) -> Result<Vec<Vendor>, RepositoryError> {
        let sql = format!("SELECT {VENDOR_COLUMNS} FROM vendors ORDER BY name");
        let rows = sqlx::query_as::<_, Vendor>(&sql).fetch_all(self.pool).await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_vendor(&self, input: &VendorInput) -> Result<Vendor, RepositoryError> {
        let sql = format!(
            "INSERT INTO vendors (name, contact_person, phone, email, address, payment_terms, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {VENDOR_COLUMNS}"
        );
        let vendor = sqlx::query_as::<_, Vendor>(&sql)
            .bind(input.name.trim())
            .bind(input.contact_person.as_deref())
            .bind(input.phone.as_deref())
            .bind(input.email.as_deref())
            .bind(input.address.as_deref())
            .bind(input.payment_terms.as_deref())
            .bind(input.is_active)
            .fetch_one(self.pool)
            .await?;
        Ok(vendor)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the vendor does not exist.
    pub async fn update_vendor(
        &self,
        id: VendorId,
        input: &VendorInput,
    ) -> Result<Vendor, RepositoryError> {
        let sql = format!(
            "UPDATE vendors
             SET name = $2, contact_person = $3, phone = $4, email = $5, address = $6,
                 payment_terms = $7, is_active = $8, updated_at = NOW()
             WHERE id = $1 RETURNING {VENDOR_COLUMNS}"
        );
        sqlx::query_as::<_, Vendor>(&sql)
            .bind(id)
            .bind(input.name.trim())
            .bind(input.contact_person.as_deref())
            .bind(input.phone.as_deref())
            .bind(input.email.as_deref())
            .bind(input.address.as_deref())
            .bind(input.payment_terms.as_deref())
            .bind(input.is_active)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    // =========================================================================
    // Ingredients
    // =========================================================================

    /// Every ingredient with its vendor name, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_ingredients(&self) -> Result<Vec<Ingredient>, RepositoryError> {
        let sql = format!("{INGREDIENT_SELECT} ORDER BY g.name");
        let rows = sqlx::query_as::<_, Ingredient>(&sql)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the ingredient does not exist.
    pub async fn get_ingredient(&self, id: IngredientId) -> Result<Ingredient, RepositoryError> {
        let sql = format!("{INGREDIENT_SELECT} WHERE g.id = $1");
        sqlx::query_as::<_, Ingredient>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken or the vendor is unknown.
    pub async fn create_ingredient(
        &self,
        input: &IngredientInput,
    ) -> Result<Ingredient, RepositoryError> {
        let id: IngredientId = sqlx::query_scalar(
            r"
            INSERT INTO ingredients (name, unit, current_stock, reorder_level, unit_cost, vendor_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(input.name.trim())
        .bind(input.unit.trim())
        .bind(input.current_stock)
        .bind(input.reorder_level)
        .bind(input.unit_cost)
        .bind(input.vendor_id)
        .fetch_one(self.pool)
        .await
        .map_err(ingredient_write_error)?;

        self.get_ingredient(id).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the ingredient does not exist.
    /// Returns `RepositoryError::Conflict` if the name is taken or the vendor is unknown.
    pub async fn update_ingredient(
        &self,
        id: IngredientId,
        input: &IngredientInput,
    ) -> Result<Ingredient, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE ingredients
            SET name = $2, unit = $3, current_stock = $4, reorder_level = $5,
                unit_cost = $6, vendor_id = $7, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(input.unit.trim())
        .bind(input.current_stock)
        .bind(input.reorder_level)
        .bind(input.unit_cost)
        .bind(input.vendor_id)
        .execute(self.pool)
        .await
        .map_err(ingredient_write_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get_ingredient(id).await
    }

    // =========================================================================
    // Recipes
    // =========================================================================

    /// Recipe lines, optionally for one product, largest share first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_recipes(
        &self,
        product_id: Option<ProductId>,
    ) -> Result<Vec<Recipe>, RepositoryError> {
        let sql = format!(
            "{RECIPE_SELECT} WHERE $1::uuid IS NULL OR r.product_id = $1 \
             ORDER BY p.name, r.percentage DESC"
        );
        let rows = sqlx::query_as::<_, Recipe>(&sql)
            .bind(product_id)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_recipe(&self, id: RecipeId) -> Result<Recipe, RepositoryError> {
        let sql = format!("{RECIPE_SELECT} WHERE r.id = $1");
        sqlx::query_as::<_, Recipe>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product or ingredient does not exist.
    /// Returns `RepositoryError::Conflict` if the product already uses the ingredient.
    pub async fn create_recipe(&self, input: &RecipeInput) -> Result<Recipe, RepositoryError> {
        let id: RecipeId = sqlx::query_scalar(
            "INSERT INTO product_recipes (product_id, ingredient_id, percentage) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(input.product_id)
        .bind(input.ingredient_id)
        .bind(input.percentage)
        .fetch_one(self.pool)
        .await
        .map_err(|e| match conflict_on_reference(e, "reference") {
            RepositoryError::Conflict(_) => RepositoryError::NotFound,
            RepositoryError::Database(e) => conflict_on_unique(e, "Recipe for this ingredient"),
            other => other,
        })?;

        self.get_recipe(id).await
    }

    /// Change the share of an ingredient in a recipe.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the recipe line does not exist.
    pub async fn update_recipe(
        &self,
        id: RecipeId,
        percentage: rust_decimal::Decimal,
    ) -> Result<Recipe, RepositoryError> {
        let result = sqlx::query("UPDATE product_recipes SET percentage = $2 WHERE id = $1")
            .bind(id)
            .bind(percentage)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get_recipe(id).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the recipe line does not exist.
    pub async fn delete_recipe(&self, id: RecipeId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM product_recipes WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

fn ingredient_write_error(e: sqlx::Error) -> RepositoryError {
    match conflict_on_reference(e, "Unknown vendor") {
        RepositoryError::Database(e) => conflict_on_unique(e, "Ingredient"),
        other => other,
    }
}
