//! Integration tests for Shopfront.
//!
//! # Running Tests
//!
//! The HTTP tests talk to a running API over a migrated and seeded database:
//!
//! ```bash
//! shopfront-cli migrate
//! shopfront-cli seed --demo-password "$SEED_DEMO_PASSWORD" --admin-password "$SEED_ADMIN_PASSWORD"
//! cargo run -p shopfront-api &
//! cargo test -p shopfront-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `SHOPFRONT_TEST_URL` - API base URL (default: `http://localhost:8000`)
//! - `SEED_DEMO_PASSWORD`, `SEED_ADMIN_PASSWORD` - Passwords given to `seed`

#![allow(clippy::missing_panics_doc)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

/// Demo customer created by `shopfront-cli seed`.
pub const DEMO_EMAIL: &str = "demo@example.com";
/// Admin created by `shopfront-cli seed`.
pub const ADMIN_EMAIL: &str = "admin@example.com";

/// Base URL of the API under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("SHOPFRONT_TEST_URL")
        .unwrap_or_else(|_| "http://localhost:8000".to_string())
        .trim_end_matches('/')
        .to_string()
}

/// A client with its own cookie jar, so each one is a separate session.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// A session-holding client against the API under test.
pub struct TestSession {
    pub client: Client,
    pub base_url: String,
    pub user: Value,
}

impl TestSession {
    /// Log in as the seeded demo customer.
    pub async fn demo() -> Self {
        Self::login(DEMO_EMAIL, &seed_password("SEED_DEMO_PASSWORD")).await
    }

    /// Log in as the seeded admin.
    pub async fn admin() -> Self {
        Self::login(ADMIN_EMAIL, &seed_password("SEED_ADMIN_PASSWORD")).await
    }

    /// Log in with explicit credentials.
    pub async fn login(email: &str, password: &str) -> Self {
        let client = client();
        let base_url = base_url();
        let resp = client
            .post(format!("{base_url}/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to log in");
        assert_eq!(resp.status(), StatusCode::OK, "login failed for {email}");
        let user = resp.json().await.expect("Failed to read user");
        Self {
            client,
            base_url,
            user,
        }
    }

    /// ID of the logged-in user.
    #[must_use]
    pub fn user_id(&self) -> i64 {
        self.user["id"].as_i64().expect("user has no id")
    }

    /// Absolute URL for an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn seed_password(var: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| panic!("{var} must be set to the password given to seed"))
}
