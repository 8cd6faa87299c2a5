//! Product database operations
//!
//! Stock is only written here for direct admin corrections; ledger traffic
//! (line-item lifecycle) adjusts stock inside ledger transactions.

use shared::models::product::{Product, ProductCreate, ProductUpdate};
use sqlx::PgPool;

pub async fn list(pool: &PgPool, only_active: bool) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "SELECT id, name, description, price, stock, uom,
                is_best_seller, is_best_offer, is_active, created_at, updated_at
         FROM products
         WHERE ($1 = FALSE OR is_active)
         ORDER BY created_at DESC",
    )
    .bind(only_active)
    .fetch_all(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "SELECT id, name, description, price, stock, uom,
                is_best_seller, is_best_offer, is_active, created_at, updated_at
         FROM products
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn create(pool: &PgPool, data: &ProductCreate) -> Result<Product, sqlx::Error> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, name, description, price, stock, uom,
                               is_best_seller, is_best_offer, is_active, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, $9, $9)
         RETURNING id, name, description, price, stock, uom,
                   is_best_seller, is_best_offer, is_active, created_at, updated_at",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.price)
    .bind(data.stock)
    .bind(data.uom.as_deref().unwrap_or("pcs"))
    .bind(data.is_best_seller.unwrap_or(false))
    .bind(data.is_best_offer.unwrap_or(false))
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn update(pool: &PgPool, id: i64, data: &ProductUpdate) -> Result<u64, sqlx::Error> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE products SET
            name = COALESCE($1, name),
            description = COALESCE($2, description),
            price = COALESCE($3, price),
            stock = COALESCE($4, stock),
            uom = COALESCE($5, uom),
            is_best_seller = COALESCE($6, is_best_seller),
            is_best_offer = COALESCE($7, is_best_offer),
            is_active = COALESCE($8, is_active),
            updated_at = $9
         WHERE id = $10",
    )
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.price)
    .bind(data.stock)
    .bind(&data.uom)
    .bind(data.is_best_seller)
    .bind(data.is_best_offer)
    .bind(data.is_active)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(rows)
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<u64, sqlx::Error> {
    let rows = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(rows)
}
