//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Password accounts, OTP verification, password reset
//! - `catalog` - Cached brand and category lists
//! - `email` - Transactional email (SMTP, or logged in development)
//! - `payments` - Stripe payment intents/webhooks and PayFast redirects/ITN

pub mod auth;
pub mod catalog;
pub mod email;
pub mod payments;
