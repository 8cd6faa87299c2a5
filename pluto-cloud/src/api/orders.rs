//! Order endpoints
//!
//! Creation and line-item mutations delegate to the ledger so stock and
//! totals stay consistent; status updates are restricted to the status
//! field.

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::order::{Order, OrderStatus};
use validator::Validate;

use crate::db::orders::OrderWithItems;
use crate::state::AppState;
use crate::{db, ledger};

use super::ApiResult;

/// GET /api/orders
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Order>> {
    let orders = db::orders::list(&state.pool).await?;
    Ok(Json(orders))
}

/// GET /api/orders/{id}
pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<OrderWithItems> {
    let order = db::orders::find_with_items(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    Ok(Json(order))
}

/// POST /api/orders
pub async fn create(
    State(state): State<AppState>,
    Json(data): Json<ledger::CreateOrder>,
) -> ApiResult<OrderWithItems> {
    data.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let order_id = ledger::create_order(&state.pool, &data).await?;
    tracing::info!(order_id, customer = %data.customer_name, "Order created");

    let order = db::orders::find_with_items(&state.pool, order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    Ok(Json(order))
}

/// PATCH /api/orders/{id}/status
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<serde_json::Value> {
    let status = OrderStatus::from_db(&req.status)
        .ok_or_else(|| AppError::validation("Invalid order status"))?;

    ledger::set_status(&state.pool, id, status).await?;
    tracing::info!(order_id = id, status = status.as_db(), "Order status updated");

    Ok(Json(serde_json::json!({ "status": status.as_db() })))
}

/// POST /api/orders/{id}/items
#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub product_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i64,
}

pub async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<AddItemRequest>,
) -> ApiResult<serde_json::Value> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let item_id = ledger::add_item(&state.pool, id, req.product_id, req.quantity).await?;
    Ok(Json(serde_json::json!({ "item_id": item_id })))
}

/// PATCH /api/orders/{id}/items/{item_id}
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(range(min = 1))]
    pub quantity: i64,
}

pub async fn update_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(i64, i64)>,
    Json(req): Json<UpdateItemRequest>,
) -> ApiResult<serde_json::Value> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    ledger::update_item_quantity(&state.pool, id, item_id, req.quantity).await?;
    Ok(Json(serde_json::json!({ "quantity": req.quantity })))
}

/// DELETE /api/orders/{id}/items/{item_id}
pub async fn remove_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(i64, i64)>,
) -> ApiResult<serde_json::Value> {
    ledger::remove_item(&state.pool, id, item_id).await?;
    Ok(Json(serde_json::json!({ "message": "Item removed" })))
}
