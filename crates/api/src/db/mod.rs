//! Database operations for the shop `PostgreSQL` schema.
//!
//! # Schema: `shop`
//!
//! ## Tables
//!
//! - `user` - Customer and admin accounts
//! - `otp`, `password_reset_token` - Hashed one-time secrets
//! - `brand`, `category`, `product` - Catalog
//! - `cart_item`, `wishlist_item` - Per-user product lists
//! - `address` - Saved shipping addresses
//! - `review` - Product reviews (one per user and product)
//! - `customer_order` - Orders with JSONB line and address snapshots
//!
//! Sessions live in `tower_sessions.session`, managed by the session store.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p shopfront-cli -- migrate
//! ```

pub mod addresses;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod stats;
pub mod tokens;
pub mod users;
pub mod wishlist;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use addresses::AddressRepository;
pub use cart::CartRepository;
pub use catalog::CatalogRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use reviews::ReviewRepository;
pub use stats::StatsRepository;
pub use tokens::TokenRepository;
pub use users::UserRepository;
pub use wishlist::WishlistRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Write referenced a row that does not exist or broke a check constraint.
    #[error("invalid reference: {0}")]
    Invalid(String),
}

impl RepositoryError {
    /// Classify a write error, turning unique, foreign-key and check
    /// violations into client-facing variants.
    pub(crate) fn from_write(err: sqlx::Error, conflict: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::Conflict(conflict.to_owned());
            }
            if db_err.is_foreign_key_violation() {
                return Self::Invalid(format!(
                    "referenced record does not exist ({})",
                    db_err.constraint().unwrap_or("foreign key")
                ));
            }
            if db_err.is_check_violation() {
                return Self::Invalid(format!(
                    "value out of range ({})",
                    db_err.constraint().unwrap_or("check")
                ));
            }
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
