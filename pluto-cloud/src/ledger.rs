//! Order/stock ledger
//!
//! Explicit domain-service methods for the order and line-item lifecycle.
//! Each operation runs in a single transaction spanning the order, its line
//! items and the referenced product rows, so a line item can never be
//! observed alongside a stale stock count or order total. Product rows are
//! locked (`FOR UPDATE`) before their stock is recomputed.
//!
//! Stock decrements clamp at zero instead of rejecting over-sold
//! quantities; see [`shared::models::product::clamp_stock_decrement`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::order::{OrderStatus, PaymentMethod};
use shared::models::product::clamp_stock_decrement;
use sqlx::{PgConnection, PgPool};
use validator::Validate;

use crate::error::{ServiceError, ServiceResult};

/// Customer order creation command
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrder {
    #[validate(length(min = 1, max = 200))]
    pub customer_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 15))]
    pub phone_number: String,
    #[validate(length(min = 1))]
    pub address: String,
    pub delivery_date: Option<i64>,
    /// COD | Card | Online (defaults to Card)
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "Order has no line items"), nested)]
    pub items: Vec<CreateOrderItem>,
}

/// Requested line item
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateOrderItem {
    pub product_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i64,
}

/// Create an order with all of its line items atomically.
///
/// Snapshots each product's current unit price onto the line item,
/// decrements stock (clamped at zero) and computes the order total, all in
/// one transaction. Returns the new order id.
pub async fn create_order(pool: &PgPool, data: &CreateOrder) -> ServiceResult<i64> {
    let payment_method = match &data.payment_method {
        Some(s) => PaymentMethod::from_db(s)
            .ok_or_else(|| AppError::new(ErrorCode::PaymentInvalidMethod))?,
        None => PaymentMethod::Card,
    };

    let now = shared::util::now_millis();
    let order_id = shared::util::snowflake_id();

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO orders (id, customer_name, email, phone_number, address, delivery_date,
                             total, status, payment_method, payment_status, notes,
                             created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, 0, 'Pending', $7, 'Pending', $8, $9, $9)",
    )
    .bind(order_id)
    .bind(&data.customer_name)
    .bind(&data.email)
    .bind(&data.phone_number)
    .bind(&data.address)
    .bind(data.delivery_date)
    .bind(payment_method.as_db())
    .bind(&data.notes)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for item in &data.items {
        insert_item(&mut tx, order_id, item.product_id, item.quantity, now).await?;
    }

    recompute_total(&mut tx, order_id, now).await?;
    tx.commit().await?;

    Ok(order_id)
}

/// Add a line item to an existing order (admin).
pub async fn add_item(
    pool: &PgPool,
    order_id: i64,
    product_id: i64,
    quantity: i64,
) -> ServiceResult<i64> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    lock_order(&mut tx, order_id).await?;
    let item_id = insert_item(&mut tx, order_id, product_id, quantity, now).await?;
    recompute_total(&mut tx, order_id, now).await?;
    tx.commit().await?;

    Ok(item_id)
}

/// Change a line item's quantity (admin).
///
/// Only the delta (new − old) is applied to the product's stock, clamped at
/// zero; a reduction hands stock back.
pub async fn update_item_quantity(
    pool: &PgPool,
    order_id: i64,
    item_id: i64,
    new_quantity: i64,
) -> ServiceResult<()> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    lock_order(&mut tx, order_id).await?;

    let item: Option<(i64, i64)> = sqlx::query_as(
        "SELECT product_id, quantity FROM order_items WHERE id = $1 AND order_id = $2 FOR UPDATE",
    )
    .bind(item_id)
    .bind(order_id)
    .fetch_optional(&mut *tx)
    .await?;
    let Some((product_id, old_quantity)) = item else {
        return Err(AppError::new(ErrorCode::OrderItemNotFound).into());
    };

    let delta = new_quantity - old_quantity;
    adjust_stock(&mut tx, product_id, delta, now).await?;

    sqlx::query("UPDATE order_items SET quantity = $2 WHERE id = $1")
        .bind(item_id)
        .bind(new_quantity)
        .execute(&mut *tx)
        .await?;

    recompute_total(&mut tx, order_id, now).await?;
    tx.commit().await?;

    Ok(())
}

/// Delete a line item (admin), restoring its quantity to stock.
pub async fn remove_item(pool: &PgPool, order_id: i64, item_id: i64) -> ServiceResult<()> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    lock_order(&mut tx, order_id).await?;

    let item: Option<(i64, i64)> = sqlx::query_as(
        "SELECT product_id, quantity FROM order_items WHERE id = $1 AND order_id = $2 FOR UPDATE",
    )
    .bind(item_id)
    .bind(order_id)
    .fetch_optional(&mut *tx)
    .await?;
    let Some((product_id, quantity)) = item else {
        return Err(AppError::new(ErrorCode::OrderItemNotFound).into());
    };

    sqlx::query("UPDATE products SET stock = stock + $2, updated_at = $3 WHERE id = $1")
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM order_items WHERE id = $1")
        .bind(item_id)
        .execute(&mut *tx)
        .await?;

    recompute_total(&mut tx, order_id, now).await?;
    tx.commit().await?;

    Ok(())
}

/// Cancel an order and restore stock for every line item.
///
/// The transition is claimed with a conditional update, so the restock runs
/// at most once no matter how many callers race; a second call is a no-op.
/// Returns whether this call performed the transition.
pub async fn cancel_order(pool: &PgPool, order_id: i64) -> Result<bool, sqlx::Error> {
    cancel_where(pool, order_id, "status <> 'Cancelled'").await
}

/// Reaper variant: cancel only while the order is still Pending/Pending.
///
/// Overlapping sweeps (or a sweep racing a payment webhook) contend on this
/// single conditional update; the loser sees zero rows and restores nothing.
pub async fn cancel_if_unpaid(pool: &PgPool, order_id: i64) -> Result<bool, sqlx::Error> {
    cancel_where(
        pool,
        order_id,
        "status = 'Pending' AND payment_status = 'Pending'",
    )
    .await
}

async fn cancel_where(pool: &PgPool, order_id: i64, guard: &str) -> Result<bool, sqlx::Error> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    let claimed: Option<(i64,)> = sqlx::query_as(&format!(
        "UPDATE orders SET status = 'Cancelled', updated_at = $2
         WHERE id = $1 AND {guard}
         RETURNING id"
    ))
    .bind(order_id)
    .bind(now)
    .fetch_optional(&mut *tx)
    .await?;

    if claimed.is_none() {
        tx.commit().await?;
        return Ok(false);
    }

    sqlx::query(
        "UPDATE products p SET stock = p.stock + agg.qty, updated_at = $2
         FROM (SELECT product_id, SUM(quantity) AS qty
               FROM order_items WHERE order_id = $1
               GROUP BY product_id) AS agg
         WHERE p.id = agg.product_id",
    )
    .bind(order_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(true)
}

/// Admin status update, restricted to the status field. Transitioning into
/// Cancelled routes through [`cancel_order`] so stock is restored.
pub async fn set_status(pool: &PgPool, order_id: i64, status: OrderStatus) -> ServiceResult<()> {
    let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::new(ErrorCode::OrderNotFound).into());
    }

    if status == OrderStatus::Cancelled {
        // Already-Cancelled is a no-op, not an error
        cancel_order(pool, order_id).await?;
        return Ok(());
    }

    sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
        .bind(order_id)
        .bind(status.as_db())
        .bind(shared::util::now_millis())
        .execute(pool)
        .await?;
    Ok(())
}

// ── transaction-scoped helpers ──

/// Lock the order row for the duration of a line-item mutation, failing
/// with OrderNotFound when it is missing.
async fn lock_order(tx: &mut PgConnection, order_id: i64) -> ServiceResult<()> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM orders WHERE id = $1 FOR UPDATE")
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;
    if row.is_none() {
        return Err(AppError::new(ErrorCode::OrderNotFound).into());
    }
    Ok(())
}

/// Insert a line item with a snapshot of the product's unit price and
/// decrement its stock (clamped at zero).
async fn insert_item(
    tx: &mut PgConnection,
    order_id: i64,
    product_id: i64,
    quantity: i64,
    now: i64,
) -> Result<i64, ServiceError> {
    let product: Option<(Decimal, i64, bool)> =
        sqlx::query_as("SELECT price, stock, is_active FROM products WHERE id = $1 FOR UPDATE")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?;
    let Some((price, stock, is_active)) = product else {
        return Err(AppError::new(ErrorCode::ProductNotFound).into());
    };
    if !is_active {
        return Err(AppError::new(ErrorCode::ProductInactive).into());
    }

    let item_id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO order_items (id, order_id, product_id, quantity, price)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(item_id)
    .bind(order_id)
    .bind(product_id)
    .bind(quantity)
    .bind(price)
    .execute(&mut *tx)
    .await?;

    let new_stock = clamp_stock_decrement(stock, quantity);
    sqlx::query("UPDATE products SET stock = $2, updated_at = $3 WHERE id = $1")
        .bind(product_id)
        .bind(new_stock)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    Ok(item_id)
}

/// Apply a net stock delta to a locked-for-update product, clamped at zero.
async fn adjust_stock(
    tx: &mut PgConnection,
    product_id: i64,
    delta: i64,
    now: i64,
) -> Result<(), ServiceError> {
    let stock: Option<(i64,)> =
        sqlx::query_as("SELECT stock FROM products WHERE id = $1 FOR UPDATE")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?;
    let Some((stock,)) = stock else {
        return Err(AppError::new(ErrorCode::ProductNotFound).into());
    };

    let new_stock = clamp_stock_decrement(stock, delta);
    sqlx::query("UPDATE products SET stock = $2, updated_at = $3 WHERE id = $1")
        .bind(product_id)
        .bind(new_stock)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    Ok(())
}

/// Recompute the parent order's total as the sum over its current line
/// items' quantity×price.
async fn recompute_total(
    tx: &mut PgConnection,
    order_id: i64,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE orders
         SET total = (SELECT COALESCE(SUM(quantity * price), 0)
                      FROM order_items WHERE order_id = $1),
             updated_at = $2
         WHERE id = $1",
    )
    .bind(order_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    Ok(())
}
