//! Catalog management: categories, products and variants.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, instrument};

use cozycat_core::{ProductId, VariantId};

use crate::db::CatalogRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{CategoryInput, ProductInput, VariantInput};
use crate::state::AppState;

/// GET /api/admin/categories
#[instrument(skip(state, _admin))]
pub async fn categories(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let categories = CatalogRepository::new(state.pool()).list_categories().await?;
    Ok(Json(categories))
}

/// POST /api/admin/categories
#[instrument(skip(state, _admin, input))]
pub async fn create_category(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> Result<impl IntoResponse> {
    let (name, slug) = input.normalized()?;
    let category = CatalogRepository::new(state.pool())
        .create_category(&name, &slug, &input)
        .await?;
    info!(slug = %category.slug, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /api/admin/products
#[instrument(skip(state, _admin))]
pub async fn products(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let products = CatalogRepository::new(state.pool()).list_products().await?;
    Ok(Json(products))
}

async fn check_category(repo: &CatalogRepository<'_>, input: &ProductInput) -> Result<()> {
    if let Some(category_id) = input.category_id
        && !repo.category_exists(category_id).await?
    {
        return Err(AppError::BadRequest("Unknown category".to_string()));
    }
    Ok(())
}

/// POST /api/admin/products
#[instrument(skip(state, _admin, input))]
pub async fn create_product(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> Result<impl IntoResponse> {
    let input = input.validated()?;
    let repo = CatalogRepository::new(state.pool());
    check_category(&repo, &input).await?;

    let id = repo.create_product(&input).await?;
    info!(product_id = %id, slug = input.slug(), "Product created");
    Ok((StatusCode::CREATED, Json(repo.get_product(id).await?)))
}

/// PUT /api/admin/products/{id}
#[instrument(skip(state, _admin, input))]
pub async fn update_product(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<impl IntoResponse> {
    let input = input.validated()?;
    let repo = CatalogRepository::new(state.pool());
    check_category(&repo, &input).await?;

    repo.update_product(id, &input).await?;
    Ok(Json(repo.get_product(id).await?))
}

/// DELETE /api/admin/products/{id}
///
/// Products are deactivated rather than deleted so past orders keep their lines.
#[instrument(skip(state, _admin))]
pub async fn deactivate_product(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse> {
    CatalogRepository::new(state.pool())
        .deactivate_product(id)
        .await?;
    info!(product_id = %id, "Product deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/products/{id}/variants
#[instrument(skip(state, _admin, input))]
pub async fn add_variant(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(input): Json<VariantInput>,
) -> Result<impl IntoResponse> {
    input.validate()?;
    let variant = CatalogRepository::new(state.pool())
        .add_variant(id, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(variant)))
}

/// PUT /api/admin/variants/{id}
#[instrument(skip(state, _admin, input))]
pub async fn update_variant(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<VariantId>,
    Json(input): Json<VariantInput>,
) -> Result<impl IntoResponse> {
    input.validate()?;
    let variant = CatalogRepository::new(state.pool())
        .update_variant(id, &input)
        .await?;
    Ok(Json(variant))
}

/// DELETE /api/admin/variants/{id}
#[instrument(skip(state, _admin))]
pub async fn delete_variant(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<VariantId>,
) -> Result<impl IntoResponse> {
    CatalogRepository::new(state.pool()).delete_variant(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
