//! Stale-order reaper
//!
//! Periodically cancels orders left unpaid past the configured age,
//! restoring their reserved stock and cancelling the provider
//! PaymentIntent best-effort. Each order is claimed with a conditional
//! update before its stock is restored, so overlapping sweeps (or a sweep
//! racing a payment webhook) cannot double-restore.

use std::time::Duration;

use crate::state::AppState;
use crate::{db, ledger};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Spawn the reaper loop. Sweep failures are logged and contained; the
/// loop never exits.
pub fn spawn(state: AppState, interval: Duration, max_age: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = sweep(&state, max_age).await {
                tracing::error!(error = %e, "Stale-order sweep failed");
            }
        }
    });
}

/// One sweep pass: cancel every unpaid Pending order older than `max_age`.
pub async fn sweep(state: &AppState, max_age: Duration) -> Result<(), BoxError> {
    let cutoff = shared::util::now_millis() - max_age.as_millis() as i64;
    let stale = db::orders::list_stale_pending(&state.pool, cutoff).await?;

    if stale.is_empty() {
        return Ok(());
    }
    tracing::info!(count = stale.len(), "Reaping stale unpaid orders");

    for order_id in stale {
        match reap_order(state, order_id).await {
            Ok(true) => tracing::info!(order_id, "Stale order cancelled, stock restored"),
            // Lost the claim: paid or cancelled since the scan
            Ok(false) => tracing::debug!(order_id, "Order no longer Pending/Pending, skipped"),
            Err(e) => tracing::error!(order_id, error = %e, "Failed to reap order"),
        }
    }
    Ok(())
}

async fn reap_order(state: &AppState, order_id: i64) -> Result<bool, BoxError> {
    // The intent reference is read before the claim; after cancellation the
    // order no longer qualifies for a second claim, so a stale read is
    // harmless.
    let intent = db::orders::payment_intent_of(&state.pool, order_id).await?;

    if !ledger::cancel_if_unpaid(&state.pool, order_id).await? {
        return Ok(false);
    }

    // Best-effort: the order is cancelled locally regardless
    if let Some(intent) = intent {
        if let Err(e) = state.stripe.cancel_payment_intent(&intent).await {
            tracing::warn!(
                order_id,
                intent = %intent,
                error = %e,
                "Failed to cancel PaymentIntent at provider"
            );
        } else {
            tracing::info!(order_id, intent = %intent, "PaymentIntent cancelled");
        }
    }

    Ok(true)
}
