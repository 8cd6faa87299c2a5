//! Stripe webhook handler
//!
//! POST /stripe/webhook — handles Stripe events (raw body for signature
//! verification). Delivery is at-least-once: a duplicate event id is
//! skipped, and the payment-status writes themselves are guarded so a
//! replay of a processed event is still a no-op.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use crate::db;
use crate::state::AppState;

/// Handle incoming Stripe webhook events
///
/// Must receive raw body (not JSON) for HMAC signature verification.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    // 1. Get Stripe-Signature header
    let sig_header = match headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    {
        Some(s) => s,
        None => {
            tracing::warn!("Missing Stripe-Signature header");
            return StatusCode::BAD_REQUEST;
        }
    };

    // 2. Verify signature
    if let Err(e) = state.stripe.verify_webhook(&body, sig_header) {
        tracing::warn!(error = e, "Webhook signature verification failed");
        return StatusCode::BAD_REQUEST;
    }

    // 3. Parse JSON event
    let event: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse webhook JSON");
            return StatusCode::BAD_REQUEST;
        }
    };

    let event_type = event["type"].as_str().unwrap_or("");
    tracing::info!(event_type = event_type, "Received Stripe webhook");

    // 4. Idempotency: INSERT first, check rows_affected (eliminates TOCTOU race)
    let event_id = match event["id"].as_str() {
        Some(id) => id,
        None => {
            tracing::warn!("Webhook event missing id");
            return StatusCode::BAD_REQUEST;
        }
    };

    match db::webhook_events::record(&state.pool, event_id, event_type).await {
        Ok(false) => {
            tracing::info!(event_id = event_id, "Duplicate webhook event, skipping");
            return StatusCode::OK;
        }
        Err(e) => {
            tracing::error!(%e, "DB error recording webhook event");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        Ok(true) => {} // New event, proceed
    }

    // 5. Handle event types
    match event_type {
        "checkout.session.completed" | "payment_intent.succeeded" => {
            handle_payment_succeeded(&state, &event).await
        }
        "payment_intent.payment_failed" => handle_payment_failed(&state, &event).await,
        _ => {
            tracing::debug!(event_type = event_type, "Unhandled webhook event type");
            StatusCode::OK
        }
    }
}

/// checkout.session.completed / payment_intent.succeeded → order Paid
async fn handle_payment_succeeded(state: &AppState, event: &serde_json::Value) -> StatusCode {
    let order_id = match resolve_order(state, event).await {
        Ok(Some(id)) => id,
        // Accepted so the provider stops retrying, but flagged for operators
        Ok(None) => {
            tracing::warn!("No order resolved for payment-succeeded event");
            return StatusCode::OK;
        }
        Err(e) => {
            tracing::error!(%e, "DB error resolving order from webhook");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    match db::orders::mark_paid(&state.pool, order_id).await {
        Ok(true) => {
            tracing::info!(order_id, "Order marked Paid via Stripe webhook");
            StatusCode::OK
        }
        Ok(false) => {
            tracing::info!(order_id, "Order already Paid, webhook no-op");
            StatusCode::OK
        }
        Err(e) => {
            tracing::error!(order_id, %e, "Failed to mark order Paid");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// payment_intent.payment_failed → order payment Failed (never downgrades Paid)
async fn handle_payment_failed(state: &AppState, event: &serde_json::Value) -> StatusCode {
    let order_id = match resolve_order(state, event).await {
        Ok(Some(id)) => id,
        Ok(None) => {
            tracing::warn!("No order resolved for payment-failed event");
            return StatusCode::OK;
        }
        Err(e) => {
            tracing::error!(%e, "DB error resolving order from webhook");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    match db::orders::mark_payment_failed(&state.pool, order_id).await {
        Ok(changed) => {
            tracing::info!(order_id, changed, "Order payment marked Failed");
            StatusCode::OK
        }
        Err(e) => {
            tracing::error!(order_id, %e, "Failed to mark payment Failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Resolve the order an event refers to: metadata first, then the stored
/// PaymentIntent reference.
async fn resolve_order(
    state: &AppState,
    event: &serde_json::Value,
) -> Result<Option<i64>, sqlx::Error> {
    let Some(obj) = event.get("data").and_then(|d| d.get("object")) else {
        return Ok(None);
    };

    if let Some(id) = metadata_order_id(obj) {
        return Ok(Some(id));
    }

    match payment_intent_ref(obj) {
        Some(intent) => db::orders::find_id_by_payment_intent(&state.pool, intent).await,
        None => Ok(None),
    }
}

/// Order id carried in the event object's metadata, if any.
fn metadata_order_id(obj: &serde_json::Value) -> Option<i64> {
    obj.get("metadata")?
        .get("order_id")?
        .as_str()?
        .parse()
        .ok()
}

/// PaymentIntent reference of the event object: the object's own id for
/// payment_intent objects, its `payment_intent` field for sessions.
fn payment_intent_ref(obj: &serde_json::Value) -> Option<&str> {
    match obj["object"].as_str() {
        Some("payment_intent") => obj["id"].as_str(),
        _ => obj["payment_intent"].as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_order_id_parses_string_id() {
        let obj = serde_json::json!({
            "object": "checkout.session",
            "metadata": { "order_id": "42" }
        });
        assert_eq!(metadata_order_id(&obj), Some(42));
    }

    #[test]
    fn metadata_order_id_missing_or_invalid() {
        let empty = serde_json::json!({ "object": "checkout.session", "metadata": {} });
        assert_eq!(metadata_order_id(&empty), None);

        let absent = serde_json::json!({ "object": "checkout.session" });
        assert_eq!(metadata_order_id(&absent), None);

        let junk = serde_json::json!({ "metadata": { "order_id": "not-a-number" } });
        assert_eq!(metadata_order_id(&junk), None);
    }

    #[test]
    fn intent_ref_for_payment_intent_object() {
        let obj = serde_json::json!({
            "object": "payment_intent",
            "id": "pi_123",
            "payment_intent": serde_json::Value::Null
        });
        assert_eq!(payment_intent_ref(&obj), Some("pi_123"));
    }

    #[test]
    fn intent_ref_for_checkout_session_object() {
        let obj = serde_json::json!({
            "object": "checkout.session",
            "id": "cs_456",
            "payment_intent": "pi_789"
        });
        assert_eq!(payment_intent_ref(&obj), Some("pi_789"));
    }

    #[test]
    fn intent_ref_absent() {
        let obj = serde_json::json!({ "object": "checkout.session", "id": "cs_456" });
        assert_eq!(payment_intent_ref(&obj), None);
    }
}
