//! Order database operations
//!
//! Payment-status writes are guarded conditional updates so webhook
//! deliveries and reaper sweeps stay idempotent under at-least-once
//! delivery and overlapping execution.

use serde::Serialize;
use shared::models::order::Order;
use sqlx::PgPool;

const ORDER_COLUMNS: &str = "id, customer_name, email, phone_number, address, delivery_date, \
     total, status, payment_method, payment_status, stripe_payment_intent, \
     notes, created_at, updated_at";

/// Line item joined with its product name for API reads
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItemDetail {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub price: rust_decimal::Decimal,
}

/// Order with its line items embedded
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemDetail>,
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn items_of(pool: &PgPool, order_id: i64) -> Result<Vec<OrderItemDetail>, sqlx::Error> {
    sqlx::query_as::<_, OrderItemDetail>(
        "SELECT oi.id, oi.product_id, p.name AS product_name, oi.quantity, oi.price
         FROM order_items oi
         JOIN products p ON p.id = oi.product_id
         WHERE oi.order_id = $1
         ORDER BY oi.id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
}

/// Load an order with its line items, or None when the order is missing.
pub async fn find_with_items(
    pool: &PgPool,
    id: i64,
) -> Result<Option<OrderWithItems>, sqlx::Error> {
    let Some(order) = find_by_id(pool, id).await? else {
        return Ok(None);
    };
    let items = items_of(pool, id).await?;
    Ok(Some(OrderWithItems { order, items }))
}

/// Resolve an order by its stored PaymentIntent reference (webhook
/// fallback when event metadata lacks the order id).
pub async fn find_id_by_payment_intent(
    pool: &PgPool,
    intent_id: &str,
) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM orders WHERE stripe_payment_intent = $1")
            .bind(intent_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|r| r.0))
}

pub async fn payment_intent_of(
    pool: &PgPool,
    order_id: i64,
) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT stripe_payment_intent FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.and_then(|r| r.0))
}

/// Record the checkout session's PaymentIntent and reset payment_status to
/// Pending (a fresh session supersedes any earlier Failed attempt). The
/// update is refused if the order turned Paid since the caller's conflict
/// check, so a racing success webhook is never downgraded. Returns whether
/// the reference was stored.
pub async fn set_payment_intent(
    pool: &PgPool,
    order_id: i64,
    intent_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "UPDATE orders SET stripe_payment_intent = $2, payment_status = 'Pending', updated_at = $3
         WHERE id = $1 AND payment_status <> 'Paid'",
    )
    .bind(order_id)
    .bind(intent_id)
    .bind(shared::util::now_millis())
    .execute(pool)
    .await?
    .rows_affected();
    Ok(rows > 0)
}

/// Mark an order Paid. Conditional on not already being Paid, so a webhook
/// delivered twice is a no-op. Returns whether this call made the change.
pub async fn mark_paid(pool: &PgPool, order_id: i64) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "UPDATE orders SET payment_status = 'Paid', updated_at = $2
         WHERE id = $1 AND payment_status <> 'Paid'",
    )
    .bind(order_id)
    .bind(shared::util::now_millis())
    .execute(pool)
    .await?
    .rows_affected();
    Ok(rows > 0)
}

/// Mark an order's payment Failed. Never downgrades a Paid order.
pub async fn mark_payment_failed(pool: &PgPool, order_id: i64) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "UPDATE orders SET payment_status = 'Failed', updated_at = $2
         WHERE id = $1 AND payment_status <> 'Paid'",
    )
    .bind(order_id)
    .bind(shared::util::now_millis())
    .execute(pool)
    .await?
    .rows_affected();
    Ok(rows > 0)
}

/// Orders eligible for the stale-order reaper: unpaid, still Pending, and
/// created at or before the cutoff.
pub async fn list_stale_pending(pool: &PgPool, cutoff: i64) -> Result<Vec<i64>, sqlx::Error> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT id FROM orders
         WHERE payment_status = 'Pending' AND status = 'Pending' AND created_at <= $1
         ORDER BY created_at",
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}
