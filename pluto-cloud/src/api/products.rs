//! Product catalog endpoints

use axum::Json;
use axum::extract::{Path, Query, State};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::product::{Product, ProductCreate, ProductUpdate, UOM_CHOICES};

use crate::db;
use crate::state::AppState;

use super::ApiResult;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Include inactive products (admin views)
    #[serde(default)]
    pub include_inactive: bool,
}

/// GET /api/products
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Product>> {
    let products = db::products::list(&state.pool, !query.include_inactive).await?;
    Ok(Json(products))
}

/// GET /api/products/{id}
pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Product> {
    let product = db::products::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    Ok(Json(product))
}

/// POST /api/products
pub async fn create(
    State(state): State<AppState>,
    Json(data): Json<ProductCreate>,
) -> ApiResult<Product> {
    validate_fields(
        Some(&data.name),
        Some(data.price),
        Some(data.stock),
        data.uom.as_deref(),
    )?;

    let product = db::products::create(&state.pool, &data).await?;
    tracing::info!(product_id = product.id, name = %product.name, "Product created");
    Ok(Json(product))
}

/// PATCH /api/products/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(data): Json<ProductUpdate>,
) -> ApiResult<serde_json::Value> {
    validate_fields(
        data.name.as_deref(),
        data.price,
        data.stock,
        data.uom.as_deref(),
    )?;

    let rows = db::products::update(&state.pool, id, &data).await?;
    if rows == 0 {
        return Err(AppError::new(ErrorCode::ProductNotFound).into());
    }
    Ok(Json(serde_json::json!({
        "message": "Product updated successfully"
    })))
}

/// DELETE /api/products/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let rows = db::products::delete(&state.pool, id).await?;
    if rows == 0 {
        return Err(AppError::new(ErrorCode::ProductNotFound).into());
    }
    Ok(Json(serde_json::json!({
        "message": "Product deleted successfully"
    })))
}

fn validate_fields(
    name: Option<&str>,
    price: Option<Decimal>,
    stock: Option<i64>,
    uom: Option<&str>,
) -> Result<(), AppError> {
    if let Some(name) = name
        && name.trim().is_empty()
    {
        return Err(AppError::validation("Product name must not be empty"));
    }
    if let Some(price) = price
        && price.is_sign_negative()
    {
        return Err(AppError::new(ErrorCode::ProductInvalidPrice));
    }
    if let Some(stock) = stock
        && stock < 0
    {
        return Err(AppError::validation("Stock must not be negative"));
    }
    if let Some(uom) = uom
        && !UOM_CHOICES.contains(&uom)
    {
        return Err(AppError::validation("Invalid unit of measure"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_price() {
        let err = validate_fields(None, Some("-1.00".parse().unwrap()), None, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductInvalidPrice);
    }

    #[test]
    fn rejects_unknown_uom() {
        assert!(validate_fields(None, None, None, Some("dozen")).is_err());
        assert!(validate_fields(None, None, None, Some("kg")).is_ok());
    }

    #[test]
    fn rejects_blank_name_and_negative_stock() {
        assert!(validate_fields(Some("  "), None, None, None).is_err());
        assert!(validate_fields(None, None, Some(-1), None).is_err());
        assert!(validate_fields(Some("Apples"), None, Some(0), None).is_ok());
    }
}
