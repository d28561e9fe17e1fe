//! Email service for verification codes and password reset links.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and plain text
//! templates. Without SMTP configuration the rendered text body is logged
//! instead, so signup and reset flows work in development.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// HTML template for the OTP email.
#[derive(Template)]
#[template(path = "email/otp.html")]
struct OtpEmailHtml<'a> {
    name: &'a str,
    code: &'a str,
    minutes: u64,
}

/// Plain text template for the OTP email.
#[derive(Template)]
#[template(path = "email/otp.txt")]
struct OtpEmailText<'a> {
    name: &'a str,
    code: &'a str,
    minutes: u64,
}

/// HTML template for the password reset email.
#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetEmailHtml<'a> {
    name: &'a str,
    reset_url: &'a str,
    minutes: u64,
}

/// Plain text template for the password reset email.
#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetEmailText<'a> {
    name: &'a str,
    reset_url: &'a str,
    minutes: u64,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

#[derive(Clone)]
struct SmtpSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    smtp: Option<SmtpSender>,
}

impl EmailService {
    /// Create an email service. `None` configuration logs emails instead.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: Option<&EmailConfig>) -> Result<Self, SmtpError> {
        let Some(config) = config else {
            tracing::warn!("SMTP not configured, emails will be logged instead of sent");
            return Ok(Self::log_only());
        };

        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            smtp: Some(SmtpSender {
                mailer,
                from_address: config.from_address.clone(),
            }),
        })
    }

    /// An email service that only logs.
    #[must_use]
    pub const fn log_only() -> Self {
        Self { smtp: None }
    }

    /// Send an email verification code.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_otp(
        &self,
        to: &str,
        name: &str,
        code: &str,
        minutes: u64,
    ) -> Result<(), EmailError> {
        let html = OtpEmailHtml {
            name,
            code,
            minutes,
        }
        .render()?;
        let text = OtpEmailText {
            name,
            code,
            minutes,
        }
        .render()?;

        self.send_multipart_email(to, "Your verification code", &text, &html)
            .await
    }

    /// Send a password reset link.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_password_reset(
        &self,
        to: &str,
        name: &str,
        reset_url: &str,
        minutes: u64,
    ) -> Result<(), EmailError> {
        let html = PasswordResetEmailHtml {
            name,
            reset_url,
            minutes,
        }
        .render()?;
        let text = PasswordResetEmailText {
            name,
            reset_url,
            minutes,
        }
        .render()?;

        self.send_multipart_email(to, "Reset your password", &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let Some(smtp) = &self.smtp else {
            tracing::info!(to = %to, subject = %subject, body = %text_body, "Email (not sent, SMTP disabled)");
            return Ok(());
        };

        let email = Message::builder()
            .from(
                smtp.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(smtp.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        smtp.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_templates_render_code() {
        let text = OtpEmailText {
            name: "Ada",
            code: "4821",
            minutes: 2,
        }
        .render()
        .unwrap();
        assert!(text.contains("4821"));
        assert!(text.contains("Ada"));
        assert!(text.contains("2 minutes"));

        let html = OtpEmailHtml {
            name: "Ada",
            code: "4821",
            minutes: 2,
        }
        .render()
        .unwrap();
        assert!(html.contains("4821"));
    }

    #[test]
    fn test_reset_html_escapes_name() {
        let html = PasswordResetEmailHtml {
            name: "<b>Eve</b>",
            reset_url: "https://shop.test/reset-password/1/abc",
            minutes: 60,
        }
        .render()
        .unwrap();
        assert!(!html.contains("<b>Eve</b>"));
        assert!(html.contains("https://shop.test/reset-password/1/abc"));
    }

    #[tokio::test]
    async fn test_log_only_service_succeeds() {
        let service = EmailService::log_only();
        service
            .send_otp("ada@example.com", "Ada", "1234", 2)
            .await
            .unwrap();
    }
}
