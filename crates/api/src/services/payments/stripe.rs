//! Stripe payment intents and webhook verification.
//!
//! Talks to the REST API directly with `reqwest` (form-encoded requests,
//! bearer auth) instead of pulling in an SDK; only two calls are needed.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, instrument, warn};

use shopfront_core::{CurrencyCode, OrderId, Price};

use super::{PaymentError, constant_time_eq};
use crate::config::StripeConfig;

const PAYMENT_INTENTS_URL: &str = "https://api.stripe.com/v1/payment_intents";

/// Maximum age of a signed webhook before it's treated as a replay.
const WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Metadata key carrying our order ID on payment intents.
pub const ORDER_ID_METADATA: &str = "order_id";

/// A created payment intent.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// A verified webhook event. Only the fields used for payment intents are
/// modelled; other event types deserialize with defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: WebhookData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    pub object: WebhookObject,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookObject {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl WebhookEvent {
    /// Order ID recorded in the payment intent's metadata, if any.
    #[must_use]
    pub fn order_id(&self) -> Option<OrderId> {
        self.data
            .object
            .metadata
            .get(ORDER_ID_METADATA)
            .and_then(|id| id.parse().ok())
            .map(OrderId::new)
    }
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: SecretString,
    webhook_secret: Option<SecretString>,
    currency: CurrencyCode,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("currency", &self.currency)
            .field("webhook_secret", &self.webhook_secret.is_some())
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Create a client sharing the application's HTTP connection pool.
    #[must_use]
    pub fn new(http: reqwest::Client, config: &StripeConfig) -> Self {
        Self {
            http,
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
            currency: config.currency,
        }
    }

    /// Currency intents are created in.
    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Create a card payment intent for `amount` (standard units).
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidAmount` if the amount isn't positive,
    /// `PaymentError::Http` or `PaymentError::Provider` if Stripe fails.
    #[instrument(skip(self), fields(currency = self.currency.as_lower_str()))]
    pub async fn create_payment_intent(
        &self,
        amount: Decimal,
        order_id: Option<OrderId>,
    ) -> Result<PaymentIntent, PaymentError> {
        let minor_units = Price::new(amount, self.currency)
            .to_minor_units()
            .filter(|cents| *cents > 0)
            .ok_or(PaymentError::InvalidAmount)?;

        let mut form = vec![
            ("amount", minor_units.to_string()),
            ("currency", self.currency.as_lower_str().to_string()),
            ("payment_method_types[]", "card".to_string()),
        ];
        if let Some(order_id) = order_id {
            form.push(("metadata[order_id]", order_id.to_string()));
        }

        let response = self
            .http
            .post(PAYMENT_INTENTS_URL)
            .bearer_auth(self.secret_key.expose_secret())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| format!("HTTP {status}"));
            warn!(%status, %message, "Stripe rejected payment intent");
            return Err(PaymentError::Provider(message));
        }

        let intent: PaymentIntent = response
            .json()
            .await
            .map_err(|e| PaymentError::Provider(format!("unexpected response: {e}")))?;
        debug!(intent_id = %intent.id, minor_units, "Created payment intent");
        Ok(intent)
    }

    /// Verify a webhook's `Stripe-Signature` header and parse the event.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::NotConfigured` without a webhook secret and
    /// `PaymentError::InvalidSignature` if verification or parsing fails.
    pub fn verify_webhook(&self, payload: &str, header: &str) -> Result<WebhookEvent, PaymentError> {
        let secret = self
            .webhook_secret
            .as_ref()
            .ok_or(PaymentError::NotConfigured("Stripe webhook"))?;

        verify_signature(
            secret.expose_secret(),
            payload,
            header,
            chrono::Utc::now().timestamp(),
        )?;

        serde_json::from_str(payload)
            .map_err(|e| PaymentError::InvalidSignature(format!("malformed event: {e}")))
    }
}

/// Check a `t=…,v1=…` signature header against `payload` at time `now`.
///
/// Any one matching `v1` entry is accepted, so rolled secrets keep working.
///
/// # Errors
///
/// Returns `PaymentError::InvalidSignature` if the header is malformed, the
/// timestamp is outside the tolerance window, or no signature matches.
pub fn verify_signature(
    secret: &str,
    payload: &str,
    header: &str,
    now: i64,
) -> Result<(), PaymentError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| PaymentError::InvalidSignature("missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(PaymentError::InvalidSignature(
            "missing v1 signature".to_string(),
        ));
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| PaymentError::InvalidSignature("invalid timestamp".to_string()))?;
    if (now - ts).abs() > WEBHOOK_TOLERANCE_SECS {
        return Err(PaymentError::InvalidSignature(
            "timestamp outside tolerance".to_string(),
        ));
    }

    let expected = sign(secret, timestamp, payload)?;
    if signatures
        .iter()
        .any(|candidate| constant_time_eq(&expected, candidate))
    {
        Ok(())
    } else {
        Err(PaymentError::InvalidSignature(
            "signature mismatch".to_string(),
        ))
    }
}

fn sign(secret: &str, timestamp: &str, payload: &str) -> Result<String, PaymentError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::InvalidSignature(e.to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const PAYLOAD: &str = r#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{"id":"pi_1","metadata":{"order_id":"42"}}}}"#;
    const NOW: i64 = 1_700_000_000;

    fn header(ts: i64, payload: &str) -> String {
        format!("t={ts},v1={}", sign(SECRET, &ts.to_string(), payload).unwrap())
    }

    #[test]
    fn test_valid_signature() {
        assert!(verify_signature(SECRET, PAYLOAD, &header(NOW, PAYLOAD), NOW).is_ok());
    }

    #[test]
    fn test_any_matching_v1_is_accepted() {
        let good = header(NOW, PAYLOAD);
        let rolled = format!("t={NOW},v1=deadbeef,{}", good.split_once(',').unwrap().1);
        assert!(verify_signature(SECRET, PAYLOAD, &rolled, NOW).is_ok());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let tampered = PAYLOAD.replace("42", "43");
        assert!(matches!(
            verify_signature(SECRET, &tampered, &header(NOW, PAYLOAD), NOW),
            Err(PaymentError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        assert!(verify_signature("whsec_other", PAYLOAD, &header(NOW, PAYLOAD), NOW).is_err());
    }

    #[test]
    fn test_expired_timestamp_rejected() {
        let stale = header(NOW - WEBHOOK_TOLERANCE_SECS - 1, PAYLOAD);
        assert!(verify_signature(SECRET, PAYLOAD, &stale, NOW).is_err());

        let edge = header(NOW - WEBHOOK_TOLERANCE_SECS, PAYLOAD);
        assert!(verify_signature(SECRET, PAYLOAD, &edge, NOW).is_ok());
    }

    #[test]
    fn test_malformed_headers_rejected() {
        for bad in ["", "garbage", "t=abc,v1=00", "v1=00", &format!("t={NOW}")] {
            assert!(
                matches!(
                    verify_signature(SECRET, PAYLOAD, bad, NOW),
                    Err(PaymentError::InvalidSignature(_))
                ),
                "header {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_event_parses_order_id() {
        let event: WebhookEvent = serde_json::from_str(PAYLOAD).unwrap();
        assert_eq!(event.kind, "payment_intent.succeeded");
        assert_eq!(event.data.object.id, "pi_1");
        assert_eq!(event.order_id(), Some(OrderId::new(42)));
    }

    #[test]
    fn test_event_without_metadata_parses() {
        let event: WebhookEvent = serde_json::from_str(
            r#"{"id":"evt_2","type":"customer.created","data":{"object":{"object":"customer"}}}"#,
        )
        .unwrap();
        assert_eq!(event.order_id(), None);
    }
}
