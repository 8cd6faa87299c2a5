//! Processed-webhook-event ledger
//!
//! Stripe delivers webhooks at-least-once. INSERT first and check
//! rows_affected, which eliminates the check-then-insert race.

use sqlx::PgPool;

/// Record an event id; returns false when the event was already processed.
pub async fn record(
    pool: &PgPool,
    event_id: &str,
    event_type: &str,
) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "INSERT INTO processed_webhook_events (event_id, event_type, processed_at)
         VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
    )
    .bind(event_id)
    .bind(event_type)
    .bind(shared::util::now_millis())
    .execute(pool)
    .await?
    .rows_affected();
    Ok(rows > 0)
}
