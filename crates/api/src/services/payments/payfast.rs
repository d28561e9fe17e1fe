//! PayFast redirect payments.
//!
//! Checkout sends the buyer to PayFast's process page with a signed query
//! string; PayFast reports the outcome server-to-server through an ITN
//! (Instant Transaction Notification) POST to the notify URL.
//!
//! Signatures are the lowercase MD5 of the `key=value` pairs joined by `&`,
//! values encoded the way PHP's `urlencode` does it, with
//! `&passphrase=...` appended when the merchant has one set.

use md5::{Digest, Md5};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use shopfront_core::{OrderId, round_to_cents};

use super::{PaymentError, constant_time_eq};
use crate::config::PayFastConfig;

const SANDBOX_PROCESS_URL: &str = "https://sandbox.payfast.co.za/eng/process";
const LIVE_PROCESS_URL: &str = "https://www.payfast.co.za/eng/process";

/// PayFast rejects longer item names.
pub const MAX_ITEM_NAME_CHARS: usize = 100;

/// Everything needed to build one payment redirect.
#[derive(Debug, Clone)]
pub struct PayFastPayment {
    pub return_url: String,
    pub cancel_url: String,
    pub notify_url: String,
    pub name_first: String,
    pub name_last: String,
    pub email_address: String,
    pub order_id: OrderId,
    pub amount: Decimal,
    pub item_name: String,
    pub item_description: String,
}

/// Payment outcome reported by an ITN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItnStatus {
    Complete,
    Failed,
    Cancelled,
    Other(String),
}

impl ItnStatus {
    fn parse(s: &str) -> Self {
        match s {
            "COMPLETE" => Self::Complete,
            "FAILED" => Self::Failed,
            "CANCELLED" => Self::Cancelled,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A signature-verified ITN.
#[derive(Debug, Clone)]
pub struct ItnNotification {
    pub order_id: OrderId,
    pub pf_payment_id: String,
    pub status: ItnStatus,
    pub amount_gross: Decimal,
}

/// PayFast merchant client.
#[derive(Clone)]
pub struct PayFastClient {
    merchant_id: String,
    merchant_key: SecretString,
    passphrase: Option<SecretString>,
    sandbox: bool,
}

impl std::fmt::Debug for PayFastClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayFastClient")
            .field("merchant_id", &self.merchant_id)
            .field("sandbox", &self.sandbox)
            .finish_non_exhaustive()
    }
}

impl PayFastClient {
    #[must_use]
    pub fn new(config: &PayFastConfig) -> Self {
        Self {
            merchant_id: config.merchant_id.clone(),
            merchant_key: config.merchant_key.clone(),
            passphrase: config.passphrase.clone(),
            sandbox: config.sandbox,
        }
    }

    /// The process page buyers are redirected to.
    #[must_use]
    pub const fn process_url(&self) -> &'static str {
        if self.sandbox {
            SANDBOX_PROCESS_URL
        } else {
            LIVE_PROCESS_URL
        }
    }

    /// Build the signed redirect URL for a payment.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidAmount` if the amount isn't positive.
    pub fn payment_url(&self, payment: &PayFastPayment) -> Result<String, PaymentError> {
        let amount = round_to_cents(payment.amount);
        if amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidAmount);
        }

        let fields = [
            ("merchant_id", self.merchant_id.clone()),
            ("merchant_key", self.merchant_key.expose_secret().to_string()),
            ("return_url", payment.return_url.clone()),
            ("cancel_url", payment.cancel_url.clone()),
            ("notify_url", payment.notify_url.clone()),
            ("name_first", payment.name_first.clone()),
            ("name_last", payment.name_last.clone()),
            ("email_address", payment.email_address.clone()),
            ("m_payment_id", payment.order_id.to_string()),
            ("amount", format!("{amount:.2}")),
            ("item_name", truncate_chars(&payment.item_name, MAX_ITEM_NAME_CHARS)),
            ("item_description", payment.item_description.clone()),
        ];

        // Empty values are left out of both the query and the signature.
        let query = param_string(
            fields
                .iter()
                .filter(|(_, value)| !value.trim().is_empty())
                .map(|(key, value)| (*key, value.as_str())),
        );
        let signature = self.sign(&query);
        debug!(order_id = %payment.order_id, sandbox = self.sandbox, "Built PayFast redirect");

        Ok(format!(
            "{}?{query}&signature={signature}",
            self.process_url()
        ))
    }

    /// Verify an ITN's signature and merchant, then parse its fields.
    ///
    /// `fields` must be in the order they were received; every field except
    /// `signature` is signed, empty ones included.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidSignature` if the signature is missing
    /// or wrong, the merchant doesn't match, or required fields are absent.
    pub fn verify_itn(&self, fields: &[(String, String)]) -> Result<ItnNotification, PaymentError> {
        let received = field(fields, "signature")
            .ok_or_else(|| PaymentError::InvalidSignature("missing signature".to_string()))?;

        let signed = param_string(
            fields
                .iter()
                .filter(|(key, _)| key != "signature")
                .map(|(key, value)| (key.as_str(), value.as_str())),
        );
        if !constant_time_eq(&self.sign(&signed), &received.to_ascii_lowercase()) {
            return Err(PaymentError::InvalidSignature(
                "signature mismatch".to_string(),
            ));
        }

        if field(fields, "merchant_id") != Some(self.merchant_id.as_str()) {
            return Err(PaymentError::InvalidSignature(
                "merchant mismatch".to_string(),
            ));
        }

        let order_id = field(fields, "m_payment_id")
            .and_then(|id| id.parse().ok())
            .map(OrderId::new)
            .ok_or_else(|| PaymentError::InvalidSignature("missing m_payment_id".to_string()))?;
        let amount_gross = field(fields, "amount_gross")
            .and_then(|amount| amount.parse::<Decimal>().ok())
            .ok_or_else(|| PaymentError::InvalidSignature("missing amount_gross".to_string()))?;

        Ok(ItnNotification {
            order_id,
            pf_payment_id: field(fields, "pf_payment_id").unwrap_or_default().to_string(),
            status: ItnStatus::parse(field(fields, "payment_status").unwrap_or_default()),
            amount_gross,
        })
    }

    fn sign(&self, param_string: &str) -> String {
        let mut input = param_string.to_string();
        if let Some(passphrase) = &self.passphrase {
            input.push_str("&passphrase=");
            input.push_str(&php_urlencode(passphrase.expose_secret()));
        }
        hex::encode(Md5::digest(input.as_bytes()))
    }
}

fn field<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn param_string<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    pairs
        .map(|(key, value)| format!("{key}={}", php_urlencode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Encode like PHP's `urlencode`: spaces become `+` and `~` is escaped.
fn php_urlencode(value: &str) -> String {
    urlencoding::encode(value.trim())
        .replace("%20", "+")
        .replace('~', "%7E")
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(passphrase: Option<&str>) -> PayFastClient {
        PayFastClient {
            merchant_id: "10000100".to_string(),
            merchant_key: SecretString::from("46f0cd694581a"),
            passphrase: passphrase.map(SecretString::from),
            sandbox: true,
        }
    }

    fn payment() -> PayFastPayment {
        PayFastPayment {
            return_url: "https://shop.example.com/payfast/return?orderId=7".to_string(),
            cancel_url: "https://shop.example.com/payfast/cancel".to_string(),
            notify_url: "https://api.example.com/payfast/notify".to_string(),
            name_first: "Jane".to_string(),
            name_last: "Doe".to_string(),
            email_address: "jane@example.com".to_string(),
            order_id: OrderId::new(7),
            amount: Decimal::new(11055, 2),
            item_name: "Order #7: Trail Shoe, Rain Jacket".to_string(),
            item_description: "2 items".to_string(),
        }
    }

    fn itn_fields() -> Vec<(String, String)> {
        [
            ("m_payment_id", "7"),
            ("pf_payment_id", "1089250"),
            ("payment_status", "COMPLETE"),
            ("item_name", "Order #7"),
            ("item_description", ""),
            ("amount_gross", "110.55"),
            ("amount_fee", "-2.53"),
            ("amount_net", "108.02"),
            ("name_first", "Jane"),
            ("name_last", "Doe"),
            ("email_address", "jane@example.com"),
            ("merchant_id", "10000100"),
            ("signature", "31fedd0486b18dead3c327283e878264"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_php_urlencode() {
        assert_eq!(php_urlencode("a b"), "a+b");
        assert_eq!(php_urlencode("x~y"), "x%7Ey");
        assert_eq!(php_urlencode("jane@example.com"), "jane%40example.com");
        assert_eq!(php_urlencode("  padded "), "padded");
        assert_eq!(php_urlencode("https://a.b/c?d=1"), "https%3A%2F%2Fa.b%2Fc%3Fd%3D1");
    }

    #[test]
    fn test_payment_url_signature_known_vector() {
        let url = client(None).payment_url(&payment()).unwrap();
        assert!(url.starts_with(
            "https://sandbox.payfast.co.za/eng/process?merchant_id=10000100&merchant_key=46f0cd694581a&"
        ));
        assert!(url.contains("&amount=110.55&item_name=Order+%237%3A+Trail+Shoe%2C+Rain+Jacket&"));
        assert!(url.ends_with("&signature=ccde8c1ce2b22e698a716e3a69a415cc"));
    }

    #[test]
    fn test_payment_url_signature_with_passphrase() {
        let url = client(Some("jt7NOE43FZPn")).payment_url(&payment()).unwrap();
        assert!(url.ends_with("&signature=5dac5f99cb6dffbc61c4ce08cadb78c8"));
        assert!(!url.contains("passphrase"));
    }

    #[test]
    fn test_payment_url_rejects_non_positive_amount() {
        let mut free = payment();
        free.amount = Decimal::ZERO;
        assert!(matches!(
            client(None).payment_url(&free),
            Err(PaymentError::InvalidAmount)
        ));
    }

    #[test]
    fn test_item_name_is_truncated() {
        let mut long = payment();
        long.item_name = "x".repeat(150);
        let url = client(None).payment_url(&long).unwrap();
        assert!(url.contains(&format!("item_name={}&", "x".repeat(MAX_ITEM_NAME_CHARS))));
    }

    #[test]
    fn test_process_url_by_mode() {
        let mut live = client(None);
        assert_eq!(live.process_url(), SANDBOX_PROCESS_URL);
        live.sandbox = false;
        assert_eq!(live.process_url(), LIVE_PROCESS_URL);
    }

    #[test]
    fn test_verify_itn_accepts_valid_notification() {
        let itn = client(None).verify_itn(&itn_fields()).unwrap();
        assert_eq!(itn.order_id, OrderId::new(7));
        assert_eq!(itn.pf_payment_id, "1089250");
        assert_eq!(itn.status, ItnStatus::Complete);
        assert_eq!(itn.amount_gross, Decimal::new(11055, 2));
    }

    #[test]
    fn test_verify_itn_rejects_tampered_amount() {
        let mut fields = itn_fields();
        for (key, value) in &mut fields {
            if key == "amount_gross" {
                *value = "1.00".to_string();
            }
        }
        assert!(matches!(
            client(None).verify_itn(&fields),
            Err(PaymentError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_verify_itn_rejects_missing_signature() {
        let fields: Vec<_> = itn_fields()
            .into_iter()
            .filter(|(key, _)| key != "signature")
            .collect();
        assert!(client(None).verify_itn(&fields).is_err());
    }

    #[test]
    fn test_verify_itn_rejects_other_merchant() {
        let mut other = client(None);
        other.merchant_id = "10000200".to_string();
        assert!(other.verify_itn(&itn_fields()).is_err());
    }
}
