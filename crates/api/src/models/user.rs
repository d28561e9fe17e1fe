//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use shopfront_core::{Email, UserId};

/// A shop account.
///
/// The password hash never leaves the repository layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// User's email address.
    pub email: Email,
    /// Whether the email has been verified with an OTP.
    pub is_verified: bool,
    /// Whether the user may use admin endpoints.
    pub is_admin: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,
}
