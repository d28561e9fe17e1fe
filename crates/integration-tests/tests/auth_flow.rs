//! Integration tests for session login and logout.
//!
//! These tests require a running API over a seeded database; see the crate
//! docs. Run with: cargo test -p shopfront-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::{Value, json};
use shopfront_integration_tests::{DEMO_EMAIL, TestSession, base_url, client};

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_health() {
    let resp = client()
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_check_auth_without_session() {
    let resp = client()
        .get(format!("{}/auth/check-auth", base_url()))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running API server and seeded users"]
async fn test_login_check_logout() {
    let session = TestSession::demo().await;
    assert_eq!(session.user["email"], DEMO_EMAIL);
    assert!(session.user.get("passwordHash").is_none());

    let resp = session
        .client
        .get(session.url("/auth/check-auth"))
        .send()
        .await
        .expect("check-auth failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let user: Value = resp.json().await.expect("Failed to read user");
    assert_eq!(user["id"], session.user["id"]);

    let resp = session
        .client
        .get(session.url("/auth/logout"))
        .send()
        .await
        .expect("logout failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = session
        .client
        .get(session.url("/auth/check-auth"))
        .send()
        .await
        .expect("check-auth failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running API server and seeded users"]
async fn test_wrong_password_is_rejected() {
    let resp = client()
        .post(format!("{}/auth/login", base_url()))
        .json(&json!({ "email": DEMO_EMAIL, "password": "definitely-not-it" }))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("Failed to read body");
    assert!(body["message"].is_string());
}

#[tokio::test]
#[ignore = "Requires running API server and seeded users"]
async fn test_forgot_password_does_not_reveal_accounts() {
    let url = format!("{}/auth/forgot-password", base_url());
    let known = client()
        .post(&url)
        .json(&json!({ "email": DEMO_EMAIL }))
        .send()
        .await
        .expect("Failed to reach server");
    let unknown = client()
        .post(&url)
        .json(&json!({ "email": "nobody-here@example.com" }))
        .send()
        .await
        .expect("Failed to reach server");

    assert_eq!(known.status(), unknown.status());
    let known: Value = known.json().await.expect("Failed to read body");
    let unknown: Value = unknown.json().await.expect("Failed to read body");
    assert_eq!(known["message"], unknown["message"]);
}

#[tokio::test]
#[ignore = "Requires running API server and seeded users"]
async fn test_customer_cannot_read_admin_stats() {
    let session = TestSession::demo().await;
    let resp = session
        .client
        .get(session.url("/admin/stats"))
        .send()
        .await
        .expect("stats failed");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running API server and seeded users"]
async fn test_admin_reads_stats() {
    let session = TestSession::admin().await;
    let resp = session
        .client
        .get(session.url("/admin/stats"))
        .send()
        .await
        .expect("stats failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let stats: Value = resp.json().await.expect("Failed to read stats");
    assert!(stats["monthlySales"].is_array());
    assert!(stats["stock"].is_object());
}
