//! Core types for Shopfront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod page;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use page::PageRequest;
pub use price::{CurrencyCode, Price, round_to_cents};
pub use status::*;
