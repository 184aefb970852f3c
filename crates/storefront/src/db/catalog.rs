//! Catalog queries.
//!
//! Only active categories and products are visible to the shop.

use sqlx::{PgPool, Postgres, QueryBuilder};

use cozycat_core::pagination::PageRequest;
use cozycat_core::{ProductId, VariantId};

use super::RepositoryError;
use crate::models::{Category, Product, ProductDetail, ProductFilter, PurchasableVariant, Variant};

macro_rules! product_from {
    () => {
        r"
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN LATERAL (
        SELECT MIN(price) AS min_price FROM product_variants WHERE product_id = p.id
    ) v ON TRUE
    WHERE p.is_active
"
    };
}

const PRODUCT_FROM: &str = product_from!();

const PRODUCT_SELECT: &str = concat!(
    r"
    SELECT p.id, p.category_id, c.name AS category_name, c.slug AS category_slug,
           p.name, p.slug, p.description, p.short_description, p.nutritional_info,
           p.ingredients_display, p.image_url, p.display_order, v.min_price, p.created_at",
    product_from!()
);

/// Escape `%`, `_` and `\` for use inside an `ILIKE` pattern.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if let Some(category) = &filter.category {
        qb.push(" AND c.slug = ").push_bind(category.clone());
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND v.min_price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND v.min_price <= ").push_bind(max);
    }
}

/// Repository for catalog reads.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active categories in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, Category>(
            r"
            SELECT id, name, slug, description, display_order, created_at
            FROM categories
            WHERE is_active
            ORDER BY display_order, name
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// A page of active products matching `filter`, plus the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
        count.push(PRODUCT_FROM);
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY ")
            .push(filter.sort.order_by())
            .push(" LIMIT ")
            .push_bind(page.limit_i64())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let products = qb.build_query_as::<Product>().fetch_all(self.pool).await?;

        Ok((products, total))
    }

    /// Name and description search, best matches (name hits) first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, term: &str, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let pattern = like_pattern(term.trim());
        let sql = format!(
            "{PRODUCT_SELECT} AND (p.name ILIKE $1 OR p.description ILIKE $1 OR p.ingredients_display ILIKE $1)
             ORDER BY (p.name ILIKE $1) DESC, p.display_order, p.name
             LIMIT $2"
        );
        let rows = sqlx::query_as::<_, Product>(&sql)
            .bind(pattern)
            .bind(limit)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// Product detail by slug, with variants lightest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<ProductDetail>, RepositoryError> {
        let sql = format!("{PRODUCT_SELECT} AND p.slug = $1");
        let Some(product) = sqlx::query_as::<_, Product>(&sql)
            .bind(slug)
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };

        let variants = self.variants_for(product.id).await?;
        Ok(Some(ProductDetail { product, variants }))
    }

    /// Variants of one product, lightest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variants_for(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Variant>, RepositoryError> {
        let rows = sqlx::query_as::<_, Variant>(
            r"
            SELECT id, product_id, weight_grams, price, sku
            FROM product_variants
            WHERE product_id = $1
            ORDER BY weight_grams
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Current prices and names for the given variants of active products.
    ///
    /// Unknown variants and variants of deactivated products are omitted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn purchasable_variants(
        &self,
        ids: &[VariantId],
    ) -> Result<Vec<PurchasableVariant>, RepositoryError> {
        let rows = sqlx::query_as::<_, PurchasableVariant>(
            r"
            SELECT v.id AS variant_id, p.id AS product_id, p.name AS product_name,
                   p.image_url, v.weight_grams, v.price, v.sku
            FROM product_variants v
            JOIN products p ON p.id = v.product_id
            WHERE v.id = ANY($1) AND p.is_active
            ",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("tuna"), "%tuna%");
        assert_eq!(like_pattern("100%_fish"), "%100\\%\\_fish%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
