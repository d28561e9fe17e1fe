//! Authentication route handlers.
//!
//! Password accounts on the session cookie. Signup logs the new user in
//! straight away and emails an OTP; the account stays unverified until the
//! code comes back through `/auth/verify-otp`.

use std::time::Duration;

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use shopfront_core::UserId;

use super::Message;
use crate::db::UserRepository;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::extract::ApiJson;
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User, keys};
use crate::services::auth::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(rename = "userId", alias = "user")]
    pub user_id: UserId,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendOtpRequest {
    #[serde(alias = "userId")]
    pub user: UserId,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub token: String,
    pub password: String,
}

/// Whole minutes a secret stays valid, for email copy.
fn minutes(ttl: Duration) -> u64 {
    ttl.as_secs().div_ceil(60).max(1)
}

async fn login_session(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Issue an OTP and email it. Delivery failures are logged, not returned:
/// the user can always ask for another code.
async fn send_otp(state: &AppState, user_id: UserId) -> Result<()> {
    let config = state.config();
    let (user, code) = AuthService::new(state.pool(), config.tokens)
        .issue_otp(user_id)
        .await?;

    if let Err(err) = state
        .email()
        .send_otp(
            user.email.as_str(),
            &user.name,
            &code,
            minutes(config.tokens.otp_ttl),
        )
        .await
    {
        tracing::error!(user_id = %user.id, error = %err, "Failed to send OTP email");
    }
    Ok(())
}

/// `POST /auth/signup`
#[instrument(skip(state, session, req), fields(email = %req.email))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = AuthService::new(state.pool(), state.config().tokens)
        .register(&req.name, &req.email, &req.password)
        .await?;

    login_session(&session, &user).await?;
    send_otp(&state, user.id).await?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /auth/login`
#[instrument(skip(state, session, req), fields(email = %req.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool(), state.config().tokens)
        .login(&req.email, &req.password)
        .await?;

    login_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(user))
}

/// `POST /auth/verify-otp`
#[instrument(skip(state, req), fields(user_id = %req.user_id))]
pub async fn verify_otp(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VerifyOtpRequest>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool(), state.config().tokens)
        .verify_otp(req.user_id, &req.otp)
        .await?;

    tracing::info!(user_id = %user.id, "Email verified");
    Ok(Json(user))
}

/// `POST /auth/resend-otp`
#[instrument(skip(state, req), fields(user_id = %req.user))]
pub async fn resend_otp(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResendOtpRequest>,
) -> Result<(StatusCode, Json<Message>)> {
    send_otp(&state, req.user).await?;
    Ok((StatusCode::CREATED, Message::new("OTP sent")))
}

/// `POST /auth/forgot-password`
///
/// Answers the same whether or not the email is registered.
#[instrument(skip(state, req))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<Message>> {
    let config = state.config();
    let issued = AuthService::new(state.pool(), config.tokens)
        .issue_password_reset(&req.email)
        .await?;

    if let Some((user, token)) = issued {
        let reset_url = format!(
            "{}/reset-password/{}/{token}",
            config.origin.trim_end_matches('/'),
            user.id
        );
        if let Err(err) = state
            .email()
            .send_password_reset(
                user.email.as_str(),
                &user.name,
                &reset_url,
                minutes(config.tokens.password_reset_ttl),
            )
            .await
        {
            tracing::error!(user_id = %user.id, error = %err, "Failed to send password reset email");
        }
    }

    Ok(Message::new(
        "If an account exists for that email, a password reset link has been sent",
    ))
}

/// `POST /auth/reset-password`
#[instrument(skip(state, req), fields(user_id = %req.user_id))]
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> Result<Json<Message>> {
    AuthService::new(state.pool(), state.config().tokens)
        .reset_password(req.user_id, &req.token, &req.password)
        .await?;

    tracing::info!(user_id = %req.user_id, "Password reset");
    Ok(Message::new("Password updated"))
}

/// `GET /auth/check-auth`
///
/// Re-reads the user so the frontend sees verification and admin changes.
pub async fn check_auth(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
) -> Result<Json<User>> {
    let Some(user) = UserRepository::new(state.pool())
        .get_by_id(current.id)
        .await?
    else {
        clear_current_user(&session).await?;
        return Err(AppError::Unauthorized("Session is no longer valid".to_string()));
    };

    if user.is_admin != current.is_admin {
        session
            .insert(keys::CURRENT_USER, CurrentUser::from(&user))
            .await?;
    }

    Ok(Json(user))
}

/// `GET /auth/logout`
pub async fn logout(session: Session) -> Result<Json<Message>> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Message::new("Logged out"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_rounds_up() {
        assert_eq!(minutes(Duration::from_secs(120)), 2);
        assert_eq!(minutes(Duration::from_secs(90)), 2);
        assert_eq!(minutes(Duration::from_secs(3600)), 60);
        assert_eq!(minutes(Duration::from_secs(0)), 1);
    }

    #[test]
    fn test_verify_request_field_names() {
        let req: VerifyOtpRequest =
            serde_json::from_str(r#"{"userId": 4, "otp": "1234"}"#).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(req.user_id, UserId::new(4));

        let req: ResendOtpRequest =
            serde_json::from_str(r#"{"user": 4}"#).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(req.user, UserId::new(4));
    }
}
