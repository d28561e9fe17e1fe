//! Authentication extractors.
//!
//! Handlers state their access level in their signature: `RequireAuth`
//! for any logged-in user, `RequireAdmin` for admins, `OptionalAuth` when
//! the answer depends on who is asking.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::models::{CurrentUser, keys};

/// Extractor that requires a logged-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a logged-in admin.
pub struct RequireAdmin(pub CurrentUser);

/// Rejection for the auth extractors.
#[derive(Debug)]
pub enum AuthRejection {
    /// No user in the session.
    Unauthorized,
    /// Logged in, but not an admin.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Admin access required"),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

async fn session_user(parts: &Parts) -> Option<CurrentUser> {
    // Set by SessionManagerLayer
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts)
            .await
            .map(Self)
            .ok_or(AuthRejection::Unauthorized)
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = session_user(parts)
            .await
            .ok_or(AuthRejection::Unauthorized)?;
        if !user.is_admin {
            tracing::warn!(user_id = %user.id, path = %parts.uri.path(), "Non-admin denied");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

/// Log a user in: cycle the session ID, then store the user.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_USER, user).await
}

/// Log out: drop all session data and delete the session record.
///
/// # Errors
///
/// Returns an error if the session store cannot be reached.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::Body,
        extract::Path,
        http::{Request, header},
        routing::get,
    };
    use shopfront_core::{Email, UserId};
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;

    async fn login(session: Session, Path(is_admin): Path<bool>) -> StatusCode {
        let user = CurrentUser {
            id: UserId::new(7),
            email: Email::parse("shopper@example.com").unwrap(),
            is_admin,
        };
        set_current_user(&session, &user).await.unwrap();
        StatusCode::OK
    }

    fn app() -> Router {
        Router::new()
            .route("/login/{is_admin}", get(login))
            .route("/me", get(|RequireAuth(user): RequireAuth| async move { user.id.to_string() }))
            .route("/admin", get(|RequireAdmin(_): RequireAdmin| async { "ok" }))
            .route(
                "/maybe",
                get(|OptionalAuth(user): OptionalAuth| async move { user.is_some().to_string() }),
            )
            .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false))
    }

    async fn session_cookie(app: &Router, is_admin: bool) -> String {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/login/{is_admin}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn status(app: &Router, uri: &str, cookie: Option<&str>) -> StatusCode {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        app.clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_anonymous_is_unauthorized() {
        let app = app();
        assert_eq!(status(&app, "/me", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status(&app, "/admin", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status(&app, "/maybe", None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_customer_is_forbidden_from_admin() {
        let app = app();
        let cookie = session_cookie(&app, false).await;
        assert_eq!(status(&app, "/me", Some(&cookie)).await, StatusCode::OK);
        assert_eq!(
            status(&app, "/admin", Some(&cookie)).await,
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn test_admin_passes_both_guards() {
        let app = app();
        let cookie = session_cookie(&app, true).await;
        assert_eq!(status(&app, "/me", Some(&cookie)).await, StatusCode::OK);
        assert_eq!(status(&app, "/admin", Some(&cookie)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rejection_body_is_json_message() {
        let response = AuthRejection::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Admin access required");
    }
}
