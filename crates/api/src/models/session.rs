//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use shopfront_core::{Email, UserId};

use super::User;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
/// Admin status is re-read from the database by `check-auth`, but route
/// guards trust the session copy until the user logs in again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Whether the user may use admin endpoints.
    pub is_admin: bool,
}

impl CurrentUser {
    /// Whether this user may act on resources owned by `owner`.
    #[must_use]
    pub fn can_access(&self, owner: UserId) -> bool {
        self.is_admin || self.id == owner
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            is_admin: user.is_admin,
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(id: i32, is_admin: bool) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            email: Email::parse("shopper@example.com").unwrap(),
            is_admin,
        }
    }

    #[test]
    fn test_owner_can_access() {
        assert!(user(1, false).can_access(UserId::new(1)));
        assert!(!user(1, false).can_access(UserId::new(2)));
    }

    #[test]
    fn test_admin_can_access_anyone() {
        assert!(user(1, true).can_access(UserId::new(2)));
    }
}
