//! Vendors, ingredients, recipes and stock alerts.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument};

use cozycat_core::validation::ValidationError;
use cozycat_core::{IngredientId, ProductId, RecipeId, VendorId};

use crate::db::InventoryRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireStaff;
use crate::models::{IngredientInput, RecipeInput, VendorInput};
use crate::services::InventoryReport;
use crate::state::AppState;

// =============================================================================
// Vendors
// =============================================================================

/// GET /api/operations/vendors
#[instrument(skip(state, _staff))]
pub async fn vendors(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    Ok(Json(InventoryRepository::new(state.pool()).list_vendors().await?))
}

/// POST /api/operations/vendors
#[instrument(skip(state, _staff, input))]
pub async fn create_vendor(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Json(input): Json<VendorInput>,
) -> Result<impl IntoResponse> {
    input.validate()?;
    let vendor = InventoryRepository::new(state.pool())
        .create_vendor(&input)
        .await?;
    info!(vendor = %vendor.name, "Vendor created");
    Ok((StatusCode::CREATED, Json(vendor)))
}

/// PUT /api/operations/vendors/{id}
#[instrument(skip(state, _staff, input))]
pub async fn update_vendor(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<VendorId>,
    Json(input): Json<VendorInput>,
) -> Result<impl IntoResponse> {
    input.validate()?;
    let vendor = InventoryRepository::new(state.pool())
        .update_vendor(id, &input)
        .await?;
    Ok(Json(vendor))
}

// =============================================================================
// Ingredients
// =============================================================================

/// GET /api/operations/ingredients
#[instrument(skip(state, _staff))]
pub async fn ingredients(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    Ok(Json(
        InventoryRepository::new(state.pool())
            .list_ingredients()
            .await?,
    ))
}

/// GET /api/operations/ingredients/{id}
#[instrument(skip(state, _staff))]
pub async fn ingredient(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<IngredientId>,
) -> Result<impl IntoResponse> {
    Ok(Json(
        InventoryRepository::new(state.pool())
            .get_ingredient(id)
            .await?,
    ))
}

/// POST /api/operations/ingredients
#[instrument(skip(state, _staff, input))]
pub async fn create_ingredient(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Json(input): Json<IngredientInput>,
) -> Result<impl IntoResponse> {
    input.validate()?;
    let ingredient = InventoryRepository::new(state.pool())
        .create_ingredient(&input)
        .await?;
    info!(ingredient = %ingredient.name, "Ingredient created");
    Ok((StatusCode::CREATED, Json(ingredient)))
}

/// PUT /api/operations/ingredients/{id}
#[instrument(skip(state, _staff, input))]
pub async fn update_ingredient(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<IngredientId>,
    Json(input): Json<IngredientInput>,
) -> Result<impl IntoResponse> {
    input.validate()?;
    let ingredient = InventoryRepository::new(state.pool())
        .update_ingredient(id, &input)
        .await?;
    Ok(Json(ingredient))
}

// =============================================================================
// Stock overview
// =============================================================================

/// GET /api/operations/inventory
#[instrument(skip(state, _staff))]
pub async fn overview(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let ingredients = InventoryRepository::new(state.pool())
        .list_ingredients()
        .await?;
    Ok(Json(InventoryReport::build(ingredients)))
}

/// POST /api/operations/inventory/low-stock-alert
///
/// Emails the low-stock list to the configured recipient. Nothing is sent
/// when every ingredient is above half its reorder level.
#[instrument(skip(state, staff), fields(staff = %staff.id))]
pub async fn low_stock_alert(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let email = state
        .email()
        .ok_or_else(|| AppError::Unavailable("Email is not configured".to_string()))?;

    let ingredients = InventoryRepository::new(state.pool())
        .list_ingredients()
        .await?;
    let report = InventoryReport::build(ingredients);
    let count = report.low_stock.len();

    if count == 0 {
        info!("Low-stock alert skipped, nothing below threshold");
        return Ok(Json(serde_json::json!({ "sent": false, "count": 0 })));
    }

    email.send_low_stock_alert(&report).await?;
    info!(count, critical = report.critical_count, "Low-stock alert sent");

    Ok(Json(serde_json::json!({
        "sent": true,
        "recipient": email.alert_recipient(),
        "count": count,
    })))
}

// =============================================================================
// Recipes
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RecipeQuery {
    pub product_id: Option<ProductId>,
}

#[derive(Debug, Deserialize)]
pub struct RecipePercentage {
    pub percentage: Decimal,
}

/// GET /api/operations/recipes?product_id=
#[instrument(skip(state, _staff))]
pub async fn recipes(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<RecipeQuery>,
) -> Result<impl IntoResponse> {
    let recipes = InventoryRepository::new(state.pool())
        .list_recipes(query.product_id)
        .await?;
    Ok(Json(recipes))
}

/// POST /api/operations/recipes
#[instrument(skip(state, _staff, input))]
pub async fn create_recipe(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Json(input): Json<RecipeInput>,
) -> Result<impl IntoResponse> {
    input.validate()?;
    let recipe = InventoryRepository::new(state.pool())
        .create_recipe(&input)
        .await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

/// PUT /api/operations/recipes/{id}
#[instrument(skip(state, _staff))]
pub async fn update_recipe(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<RecipeId>,
    Json(body): Json<RecipePercentage>,
) -> Result<impl IntoResponse> {
    if body.percentage < Decimal::ZERO || body.percentage > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new(
            "percentage",
            "percentage must be between 0 and 100",
        )
        .into());
    }
    let recipe = InventoryRepository::new(state.pool())
        .update_recipe(id, body.percentage)
        .await?;
    Ok(Json(recipe))
}

/// DELETE /api/operations/recipes/{id}
#[instrument(skip(state, _staff))]
pub async fn delete_recipe(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<RecipeId>,
) -> Result<impl IntoResponse> {
    InventoryRepository::new(state.pool())
        .delete_recipe(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
