//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use cozycat_core::Money;
use cozycat_core::pagination::{Page, PageRequest};

use crate::error::{AppError, Result};
use crate::models::{ProductFilter, ProductSort};
use crate::services::catalog::CatalogService;
use crate::state::AppState;

/// Largest number of search results returned.
const SEARCH_LIMIT: i64 = 20;

/// Query parameters for `GET /api/products`.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    #[serde(default)]
    pub sort_by: ProductSort,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductListQuery {
    fn into_parts(self) -> (ProductFilter, PageRequest) {
        let page = PageRequest::new(self.page, self.limit);
        let filter = ProductFilter {
            category: self.category.filter(|c| !c.is_empty()),
            search: self.search.filter(|s| !s.trim().is_empty()),
            min_price: self.min_price,
            max_price: self.max_price,
            sort: self.sort_by,
        };
        (filter, page)
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// GET /api/categories
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let categories = CatalogService::new(state.pool(), state.catalog_cache())
        .categories()
        .await?;
    Ok(Json(serde_json::json!({ "categories": *categories })))
}

/// GET /api/products
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse> {
    let (filter, page) = query.into_parts();
    if let (Some(min), Some(max)) = (filter.min_price, filter.max_price)
        && min > max
    {
        return Err(AppError::BadRequest(
            "min_price must not exceed max_price".to_string(),
        ));
    }

    let listing = CatalogService::new(state.pool(), state.catalog_cache())
        .products(&filter, page)
        .await?;
    let (products, total) = &*listing;

    Ok(Json(Page::new(products.clone(), page, *total)))
}

/// GET /api/products/search?q=
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse> {
    let term = query.q.unwrap_or_default();
    let term = term.trim();
    if term.is_empty() {
        return Ok(Json(serde_json::json!({ "products": [] })));
    }

    let products = CatalogService::new(state.pool(), state.catalog_cache())
        .search(term, SEARCH_LIMIT)
        .await?;
    Ok(Json(serde_json::json!({ "products": products })))
}

/// GET /api/products/{slug}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let product = CatalogService::new(state.pool(), state.catalog_cache())
        .product(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
    Ok(Json(serde_json::json!({ "product": *product })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults_and_blank_filters() {
        let query: ProductListQuery =
            serde_json::from_value(serde_json::json!({ "category": "", "search": "  " })).unwrap();
        let (filter, page) = query.into_parts();
        assert_eq!(filter.category, None);
        assert_eq!(filter.search, None);
        assert_eq!(filter.sort, ProductSort::Featured);
        assert_eq!(page, PageRequest::default());
    }

    #[test]
    fn test_sort_parsing() {
        let query: ProductListQuery =
            serde_json::from_value(serde_json::json!({ "sort_by": "price_desc", "limit": 500 }))
                .unwrap();
        let (filter, page) = query.into_parts();
        assert_eq!(filter.sort, ProductSort::PriceDesc);
        assert_eq!(page.limit, 100);
    }
}
