//! Cached catalog reads.
//!
//! Categories, product pages and unfiltered listing pages are cached for
//! five minutes with `moka`. Searches and filtered listings always hit the
//! database.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, instrument};

use cozycat_core::pagination::PageRequest;

use crate::db::{CatalogRepository, RepositoryError};
use crate::models::{Category, Product, ProductDetail, ProductFilter, ProductSort};

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Categories,
    Product(String),
    Products {
        category: Option<String>,
        sort: ProductSort,
        page: PageRequest,
    },
}

#[derive(Debug, Clone)]
enum CacheValue {
    Categories(Arc<Vec<Category>>),
    Product(Arc<ProductDetail>),
    Products(Arc<(Vec<Product>, i64)>),
}

/// Shared catalog cache, cloned into [`crate::state::AppState`].
#[derive(Clone)]
pub struct CatalogCache {
    inner: Cache<CacheKey, CacheValue>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

impl CatalogCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(1000)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

/// Catalog reads through the cache.
pub struct CatalogService<'a> {
    repo: CatalogRepository<'a>,
    cache: &'a CatalogCache,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CatalogCache) -> Self {
        Self {
            repo: CatalogRepository::new(pool),
            cache,
        }
    }

    /// Active categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database read fails.
    pub async fn categories(&self) -> Result<Arc<Vec<Category>>, RepositoryError> {
        if let Some(CacheValue::Categories(categories)) =
            self.cache.inner.get(&CacheKey::Categories).await
        {
            return Ok(categories);
        }

        let categories = Arc::new(self.repo.list_categories().await?);
        self.cache
            .inner
            .insert(CacheKey::Categories, CacheValue::Categories(categories.clone()))
            .await;
        Ok(categories)
    }

    /// Product detail by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database read fails.
    #[instrument(skip(self))]
    pub async fn product(&self, slug: &str) -> Result<Option<Arc<ProductDetail>>, RepositoryError> {
        let key = CacheKey::Product(slug.to_owned());
        if let Some(CacheValue::Product(product)) = self.cache.inner.get(&key).await {
            debug!("product cache hit");
            return Ok(Some(product));
        }

        let Some(product) = self.repo.get_by_slug(slug).await? else {
            return Ok(None);
        };
        let product = Arc::new(product);
        self.cache
            .inner
            .insert(key, CacheValue::Product(product.clone()))
            .await;
        Ok(Some(product))
    }

    /// A listing page. Only category and sort listings are cached.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database read fails.
    pub async fn products(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<Arc<(Vec<Product>, i64)>, RepositoryError> {
        let cacheable =
            filter.search.is_none() && filter.min_price.is_none() && filter.max_price.is_none();
        let key = CacheKey::Products {
            category: filter.category.clone(),
            sort: filter.sort,
            page,
        };

        if cacheable
            && let Some(CacheValue::Products(listing)) = self.cache.inner.get(&key).await
        {
            return Ok(listing);
        }

        let listing = Arc::new(self.repo.list_products(filter, page).await?);
        if cacheable {
            self.cache
                .inner
                .insert(key, CacheValue::Products(listing.clone()))
                .await;
        }
        Ok(listing)
    }

    /// Uncached search.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database read fails.
    pub async fn search(&self, term: &str, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        self.repo.search(term, limit).await
    }
}
