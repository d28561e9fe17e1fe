//! CLI subcommands.

pub mod migrate;
pub mod seed;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;

/// Connection string: `SHOPFRONT_DATABASE_URL`, then `DATABASE_URL`.
///
/// Loads `.env` first so the CLI sees the same settings as the server.
pub fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();

    std::env::var("SHOPFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}

/// Connect using [`database_url`].
///
/// # Errors
///
/// Returns [`ConnectError::MissingEnvVar`] when no URL is set,
/// or the driver error if the connection fails.
pub async fn connect() -> Result<PgPool, ConnectError> {
    let url = database_url().ok_or(ConnectError::MissingEnvVar("SHOPFRONT_DATABASE_URL"))?;
    tracing::info!("Connecting to database...");
    Ok(shopfront_api::db::create_pool(&url).await?)
}

/// Errors opening the database connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}
