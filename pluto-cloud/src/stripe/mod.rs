//! Stripe integration via REST API (no SDK dependency)

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::Config;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Checkout session created for an order payment
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    /// Redirect URL the customer completes payment at
    pub url: String,
    /// PaymentIntent reference attached to the session
    pub payment_intent: Option<String>,
}

/// Stripe REST gateway
///
/// Credentials, currency and redirect URLs are injected at construction;
/// every request runs with a bounded timeout so a slow provider cannot
/// hold a request handler or the reaper indefinitely.
#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
    currency: String,
    success_url: String,
    cancel_url: String,
}

impl StripeGateway {
    pub fn new(config: &Config) -> Result<Self, BoxError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.stripe_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            secret_key: config.stripe_secret_key.clone(),
            webhook_secret: config.stripe_webhook_secret.clone(),
            currency: config.checkout_currency.clone(),
            success_url: config.checkout_success_url.clone(),
            cancel_url: config.checkout_cancel_url.clone(),
        })
    }

    /// Create a one-time Checkout Session (payment mode) for an order.
    ///
    /// The order id rides along as metadata on both the session and its
    /// PaymentIntent, so succeeded and failed intent events can be
    /// reconciled back to the order.
    pub async fn create_checkout_session(
        &self,
        order_id: i64,
        amount_minor: i64,
    ) -> Result<CheckoutSession, BoxError> {
        let order_ref = order_id.to_string();
        let amount = amount_minor.to_string();
        let description = format!("Order {order_id} Payment");

        let resp: serde_json::Value = self
            .client
            .post("https://api.stripe.com/v1/checkout/sessions")
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("mode", "payment"),
                ("payment_method_types[0]", "card"),
                ("line_items[0][price_data][currency]", self.currency.as_str()),
                (
                    "line_items[0][price_data][product_data][name]",
                    description.as_str(),
                ),
                ("line_items[0][price_data][unit_amount]", amount.as_str()),
                ("line_items[0][quantity]", "1"),
                ("success_url", self.success_url.as_str()),
                ("cancel_url", self.cancel_url.as_str()),
                ("metadata[order_id]", order_ref.as_str()),
                (
                    "payment_intent_data[metadata][order_id]",
                    order_ref.as_str(),
                ),
            ])
            .send()
            .await?
            .json()
            .await?;

        let url = resp["url"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| format!("Stripe create_checkout failed: {resp}"))?;
        let payment_intent = resp["payment_intent"].as_str().map(String::from);

        Ok(CheckoutSession {
            url,
            payment_intent,
        })
    }

    /// Cancel a PaymentIntent. Callers on the reaper path treat failure as
    /// best-effort (logged, not propagated).
    pub async fn cancel_payment_intent(&self, intent_id: &str) -> Result<(), BoxError> {
        let resp: serde_json::Value = self
            .client
            .post(format!(
                "https://api.stripe.com/v1/payment_intents/{intent_id}/cancel"
            ))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?
            .json()
            .await?;

        if resp.get("error").is_some() {
            return Err(format!("Stripe cancel_payment_intent failed: {resp}").into());
        }
        Ok(())
    }

    /// Verify an inbound webhook payload against the signing secret.
    pub fn verify_webhook(&self, payload: &[u8], sig_header: &str) -> Result<(), &'static str> {
        verify_webhook_signature(payload, sig_header, &self.webhook_secret)
    }
}

/// Verify Stripe webhook signature (HMAC-SHA256)
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signature = "";
    for part in sig_header.split(',') {
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signature = v;
        }
    }

    if timestamp.is_empty() || signature.is_empty() {
        return Err("Invalid Stripe-Signature header");
    }

    let signed_payload = format!("{timestamp}.{}", std::str::from_utf8(payload).unwrap_or(""));
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(signed_payload.as_bytes());

    // Decode hex signature and use constant-time comparison via hmac::verify_slice
    let sig_bytes = hex::decode(signature).map_err(|_| "Invalid signature hex")?;
    mac.verify_slice(&sig_bytes)
        .map_err(|_| "Webhook signature mismatch")?;

    // Reject events older than 5 minutes to prevent replay attacks
    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    let now = chrono::Utc::now().timestamp();
    if (now - ts).abs() > 300 {
        return Err("Webhook timestamp too old");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn sign(payload: &[u8], timestamp: i64, secret: &str) -> String {
        let signed_payload = format!("{timestamp}.{}", std::str::from_utf8(payload).unwrap());
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed_payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_valid_signature() {
        let payload = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let ts = chrono::Utc::now().timestamp();
        let header = format!("t={ts},v1={}", sign(payload, ts, SECRET));
        assert!(verify_webhook_signature(payload, &header, SECRET).is_ok());
    }

    #[test]
    fn rejects_wrong_secret() {
        let payload = br#"{"id":"evt_1"}"#;
        let ts = chrono::Utc::now().timestamp();
        let header = format!("t={ts},v1={}", sign(payload, ts, "whsec_other"));
        assert_eq!(
            verify_webhook_signature(payload, &header, SECRET),
            Err("Webhook signature mismatch")
        );
    }

    #[test]
    fn rejects_tampered_payload() {
        let payload = br#"{"id":"evt_1","amount":100}"#;
        let ts = chrono::Utc::now().timestamp();
        let header = format!("t={ts},v1={}", sign(payload, ts, SECRET));
        let tampered = br#"{"id":"evt_1","amount":999}"#;
        assert!(verify_webhook_signature(tampered, &header, SECRET).is_err());
    }

    #[test]
    fn rejects_missing_header_parts() {
        let payload = b"{}";
        assert_eq!(
            verify_webhook_signature(payload, "v1=abcd", SECRET),
            Err("Invalid Stripe-Signature header")
        );
        assert_eq!(
            verify_webhook_signature(payload, "t=123", SECRET),
            Err("Invalid Stripe-Signature header")
        );
        assert_eq!(
            verify_webhook_signature(payload, "", SECRET),
            Err("Invalid Stripe-Signature header")
        );
    }

    #[test]
    fn rejects_non_hex_signature() {
        let payload = b"{}";
        let ts = chrono::Utc::now().timestamp();
        let header = format!("t={ts},v1=not-hex!");
        assert_eq!(
            verify_webhook_signature(payload, &header, SECRET),
            Err("Invalid signature hex")
        );
    }

    #[test]
    fn rejects_stale_timestamp() {
        let payload = br#"{"id":"evt_1"}"#;
        let ts = chrono::Utc::now().timestamp() - 600;
        let header = format!("t={ts},v1={}", sign(payload, ts, SECRET));
        assert_eq!(
            verify_webhook_signature(payload, &header, SECRET),
            Err("Webhook timestamp too old")
        );
    }
}
