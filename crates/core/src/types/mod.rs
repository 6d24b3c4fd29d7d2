//! Core types for Creamery.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod payment;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use payment::{PaymentDetails, PaymentMethod, UnknownPaymentMethod};
pub use price::{CurrencyCode, Price};
pub use status::OrderStatus;
