//! Payment provider integrations.
//!
//! - [`stripe`] creates card payment intents and verifies webhook signatures.
//! - [`payfast`] builds signed redirect URLs and verifies ITN callbacks.
//!
//! Both providers are optional; when one is not configured its routes answer
//! 503 via [`PaymentError::NotConfigured`].

pub mod payfast;
pub mod stripe;

pub use payfast::{ItnNotification, PayFastClient, PayFastPayment};
pub use stripe::{PaymentIntent, StripeClient, WebhookEvent};

use thiserror::Error;

/// Errors from payment providers.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The provider has no credentials configured.
    #[error("{0} payments are not configured")]
    NotConfigured(&'static str),

    /// Amount is zero, negative or too large for minor units.
    #[error("Payment amount must be positive")]
    InvalidAmount,

    /// Webhook or ITN signature did not verify.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the request or answered unexpectedly.
    #[error("Provider error: {0}")]
    Provider(String),
}

/// Compare two strings without short-circuiting on the first difference.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
