//! Payment endpoint: Stripe checkout session per order

use axum::Json;
use axum::extract::{Path, State};
use shared::error::{AppError, ErrorCode};
use shared::models::order::total_minor_units;

use crate::db;
use crate::state::AppState;

use super::ApiResult;

/// POST /api/orders/{id}/payment
///
/// Creates a checkout session denominated in the order's total. An order
/// already marked Paid is a conflict and performs no provider call.
pub async fn create_checkout(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let order = db::orders::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

    if order.is_paid() {
        return Err(AppError::new(ErrorCode::OrderAlreadyPaid).into());
    }

    let amount_minor = total_minor_units(order.total)
        .filter(|&n| n > 0)
        .ok_or_else(|| AppError::new(ErrorCode::OrderEmpty))?;

    let session = state
        .stripe
        .create_checkout_session(order.id, amount_minor)
        .await
        .map_err(|e| {
            tracing::error!(order_id = order.id, error = %e, "Failed to create Stripe checkout");
            AppError::new(ErrorCode::PaymentSetupFailed)
        })?;

    // The order can turn Paid between the check above and this write; the
    // guarded update loses that race and the unused session simply expires.
    if !db::orders::set_payment_intent(&state.pool, order.id, session.payment_intent.as_deref())
        .await?
    {
        return Err(AppError::new(ErrorCode::OrderAlreadyPaid).into());
    }

    tracing::info!(order_id = order.id, "Checkout session created");

    Ok(Json(serde_json::json!({
        "checkout_url": session.url,
    })))
}
