//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `SHOPFRONT_BASE_URL` - Public URL of this API (used for payment callbacks)
//! - `SHOPFRONT_ORIGIN` - Frontend origin (CORS and post-payment redirects)
//!
//! ## Optional
//! - `SHOPFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `SHOPFRONT_PORT` - Listen port (default: 8000)
//! - `SHOPFRONT_SHIPPING_FEE` - Flat shipping fee per order (default: 5.55)
//! - `SHOPFRONT_FLAT_TAX` - Flat tax per order (default: 5.00)
//! - `SHOPFRONT_TRUST_PROXY` - Take the client IP from `X-Forwarded-For` /
//!   `X-Real-IP` (default: false; enable only behind a proxy that sets them)
//! - `OTP_EXPIRATION_SECONDS` - OTP lifetime (default: 120)
//! - `PASSWORD_RESET_TOKEN_EXPIRATION_SECONDS` - Reset link lifetime (default: 3600)
//! - `STRIPE_SECRET_KEY`, `STRIPE_WEBHOOK_SECRET`, `STRIPE_CURRENCY` - Stripe
//! - `PAYFAST_MERCHANT_ID`, `PAYFAST_MERCHANT_KEY`, `PAYFAST_PASSPHRASE`, `PAYFAST_SANDBOX` - PayFast
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM` - Outgoing mail
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//!
//! Stripe, PayFast and SMTP are independent optional blocks. A block that is
//! absent disables the matching feature; a block that is half-configured is
//! an error.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use shopfront_core::CurrencyCode;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of this API
    pub base_url: String,
    /// Frontend origin allowed by CORS
    pub origin: String,
    /// Whether forwarded-for headers identify the client for rate limiting
    pub trust_proxy: bool,
    /// Checkout pricing
    pub checkout: CheckoutConfig,
    /// Token lifetimes for OTP and password reset
    pub tokens: TokenConfig,
    /// Stripe configuration (card payments disabled when absent)
    pub stripe: Option<StripeConfig>,
    /// PayFast configuration (redirect payments disabled when absent)
    pub payfast: Option<PayFastConfig>,
    /// SMTP configuration (emails are logged when absent)
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Flat fees added to every order.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutConfig {
    /// Shipping fee per order.
    pub shipping_fee: Decimal,
    /// Flat tax per order.
    pub flat_tax: Decimal,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            shipping_fee: Decimal::new(555, 2),
            flat_tax: Decimal::new(500, 2),
        }
    }
}

/// Lifetimes of emailed one-time secrets.
#[derive(Debug, Clone, Copy)]
pub struct TokenConfig {
    /// How long an emailed OTP stays valid.
    pub otp_ttl: Duration,
    /// How long a password reset link stays valid.
    pub password_reset_ttl: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            otp_ttl: Duration::from_secs(120),
            password_reset_ttl: Duration::from_secs(3600),
        }
    }
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_live_...` / `sk_test_...`)
    pub secret_key: SecretString,
    /// Webhook endpoint signing secret (`whsec_...`)
    pub webhook_secret: Option<SecretString>,
    /// Currency used for payment intents
    pub currency: CurrencyCode,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("currency", &self.currency)
            .finish()
    }
}

/// PayFast merchant configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct PayFastConfig {
    /// Merchant ID issued by PayFast
    pub merchant_id: String,
    /// Merchant key issued by PayFast
    pub merchant_key: SecretString,
    /// Optional salt passphrase used when signing
    pub passphrase: Option<SecretString>,
    /// Use the sandbox host instead of the live one
    pub sandbox: bool,
}

impl std::fmt::Debug for PayFastConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayFastConfig")
            .field("merchant_id", &self.merchant_id)
            .field("merchant_key", &"[REDACTED]")
            .field("passphrase", &self.passphrase.as_ref().map(|_| "[REDACTED]"))
            .field("sandbox", &self.sandbox)
            .finish()
    }
}

/// SMTP configuration for transactional email.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP relay host
    pub smtp_host: String,
    /// SMTP port (587 for STARTTLS)
    pub smtp_port: u16,
    /// SMTP username
    pub smtp_username: String,
    /// SMTP password
    pub smtp_password: SecretString,
    /// From address for outgoing mail
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SHOPFRONT_DATABASE_URL")?;
        let host = parse_env("SHOPFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("SHOPFRONT_PORT", "8000")?;
        let base_url = get_required_env("SHOPFRONT_BASE_URL")?;
        let origin = get_required_env("SHOPFRONT_ORIGIN")?;
        let trust_proxy = parse_env("SHOPFRONT_TRUST_PROXY", "false")?;

        let checkout = CheckoutConfig {
            shipping_fee: parse_env("SHOPFRONT_SHIPPING_FEE", "5.55")?,
            flat_tax: parse_env("SHOPFRONT_FLAT_TAX", "5.00")?,
        };
        let tokens = TokenConfig {
            otp_ttl: Duration::from_secs(parse_env("OTP_EXPIRATION_SECONDS", "120")?),
            password_reset_ttl: Duration::from_secs(parse_env(
                "PASSWORD_RESET_TOKEN_EXPIRATION_SECONDS",
                "3600",
            )?),
        };

        let stripe = StripeConfig::from_env()?;
        let payfast = PayFastConfig::from_env()?;
        let email = EmailConfig::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            base_url: base_url.trim_end_matches('/').to_owned(),
            origin: origin.trim_end_matches('/').to_owned(),
            trust_proxy,
            checkout,
            tokens,
            stripe,
            payfast,
            email,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl StripeConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(secret_key) = get_optional_env("STRIPE_SECRET_KEY") else {
            return Ok(None);
        };
        validate_secret_strength(&secret_key, "STRIPE_SECRET_KEY")?;

        let webhook_secret = get_optional_env("STRIPE_WEBHOOK_SECRET")
            .map(|value| {
                validate_secret_strength(&value, "STRIPE_WEBHOOK_SECRET")?;
                Ok::<_, ConfigError>(SecretString::from(value))
            })
            .transpose()?;

        let currency = get_env_or_default("STRIPE_CURRENCY", "usd")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("STRIPE_CURRENCY".to_string(), e))?;

        Ok(Some(Self {
            secret_key: SecretString::from(secret_key),
            webhook_secret,
            currency,
        }))
    }
}

impl PayFastConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(merchant_id) = get_optional_env("PAYFAST_MERCHANT_ID") else {
            return Ok(None);
        };
        let merchant_key = get_required_secret("PAYFAST_MERCHANT_KEY")?;
        let passphrase = get_optional_env("PAYFAST_PASSPHRASE")
            .filter(|p| !p.is_empty())
            .map(SecretString::from);
        let sandbox = parse_env("PAYFAST_SANDBOX", "true")?;

        Ok(Some(Self {
            merchant_id,
            merchant_key,
            passphrase,
            sandbox,
        }))
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };
        let smtp_port = parse_env("SMTP_PORT", "587")?;

        Ok(Some(Self {
            smtp_host,
            smtp_port,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_validated_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("SMTP_FROM")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

impl ApiConfig {
    /// Local-only configuration with every optional provider disabled.
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            database_url: SecretString::from("postgres://localhost/test"),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 8000,
            base_url: "http://localhost:8000".to_string(),
            origin: "http://localhost:3000".to_string(),
            trust_proxy: false,
            checkout: CheckoutConfig::default(),
            tokens: TokenConfig::default(),
            stripe: None,
            payfast: None,
            email: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> ApiConfig {
        ApiConfig::for_tests()
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_stripe_test_key() {
        let result = validate_secret_strength(
            "sk_test_51NvQx2Kd8Lm3Pq7Rs9Tu4Vw6Xy1Za0Bc5De",
            "STRIPE_SECRET_KEY",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_value_decimal() {
        let fee: Decimal = parse_value("SHOPFRONT_SHIPPING_FEE", "5.55").unwrap();
        assert_eq!(fee, Decimal::new(555, 2));
    }

    #[test]
    fn test_parse_value_invalid() {
        let result: Result<u16, _> = parse_value("SHOPFRONT_PORT", "eighty");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(key, _)) if key == "SHOPFRONT_PORT"));
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8000);
    }

    #[test]
    fn test_is_secure() {
        let mut config = test_config();
        assert!(!config.is_secure());
        config.base_url = "https://api.shop.test".to_string();
        assert!(config.is_secure());
    }

    #[test]
    fn test_checkout_defaults() {
        let checkout = CheckoutConfig::default();
        assert_eq!(checkout.shipping_fee.to_string(), "5.55");
        assert_eq!(checkout.flat_tax.to_string(), "5.00");
    }

    #[test]
    fn test_payment_configs_debug_redacts_secrets() {
        let stripe = StripeConfig {
            secret_key: SecretString::from("sk_test_super_secret_value"),
            webhook_secret: Some(SecretString::from("whsec_super_secret_value")),
            currency: CurrencyCode::USD,
        };
        let payfast = PayFastConfig {
            merchant_id: "10000100".to_string(),
            merchant_key: SecretString::from("46f0cd694581a"),
            passphrase: Some(SecretString::from("jt7NOE43FZPn")),
            sandbox: true,
        };

        let stripe_debug = format!("{stripe:?}");
        assert!(stripe_debug.contains("[REDACTED]"));
        assert!(!stripe_debug.contains("sk_test_super_secret_value"));
        assert!(!stripe_debug.contains("whsec_super_secret_value"));

        let payfast_debug = format!("{payfast:?}");
        assert!(payfast_debug.contains("10000100"));
        assert!(!payfast_debug.contains("46f0cd694581a"));
        assert!(!payfast_debug.contains("jt7NOE43FZPn"));
    }
}
