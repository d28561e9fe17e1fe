//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::catalog::CatalogCache;
use crate::services::email::EmailService;
use crate::services::payments::{PayFastClient, PaymentError, StripeClient};

/// Timeout for outbound payment provider calls.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid SMTP configuration: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    email: EmailService,
    catalog: CatalogCache,
    stripe: Option<StripeClient>,
    payfast: Option<PayFastClient>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Payment clients and the SMTP transport are only built for the
    /// providers present in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay or HTTP client cannot be built.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let email = EmailService::new(config.email.as_ref())?;
        Self::with_email(config, pool, email)
    }

    /// Create state with an explicit email service.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_email(
        config: ApiConfig,
        pool: PgPool,
        email: EmailService,
    ) -> Result<Self, StateError> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let stripe = config
            .stripe
            .as_ref()
            .map(|stripe| StripeClient::new(http, stripe));
        let payfast = config.payfast.as_ref().map(PayFastClient::new);

        if stripe.is_none() {
            tracing::warn!("Stripe not configured, card payments disabled");
        }
        if payfast.is_none() {
            tracing::warn!("PayFast not configured, PayFast payments disabled");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                email,
                catalog: CatalogCache::default(),
                stripe,
                payfast,
            }),
        })
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the email service.
    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    /// Get a reference to the brand/category cache.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }

    /// Get the Stripe client.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::NotConfigured` if Stripe credentials are absent.
    pub fn stripe(&self) -> Result<&StripeClient, PaymentError> {
        self.inner
            .stripe
            .as_ref()
            .ok_or(PaymentError::NotConfigured("Stripe"))
    }

    /// Get the PayFast client.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::NotConfigured` if PayFast credentials are absent.
    pub fn payfast(&self) -> Result<&PayFastClient, PaymentError> {
        self.inner
            .payfast
            .as_ref()
            .ok_or(PaymentError::NotConfigured("PayFast"))
    }
}
