//! Checkout error types.

use thiserror::Error;

use creamery_core::EmailError;

use super::CheckoutStep;
use crate::services::api::ApiError;

/// Delivery details that cannot leave the address step.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Required fields left blank, in form order.
    #[error("Please fill all required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Please enter a valid email address")]
    InvalidEmail(#[source] EmailError),
}

/// Errors that can occur while driving checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Please log in to place an order")]
    Unauthenticated,

    /// `submit` called before reaching the payment step.
    #[error("cannot submit from the {} step", .0.label())]
    NotAtPayment(CheckoutStep),

    #[error("order already placed")]
    AlreadyComplete,

    #[error("order submission failed: {0}")]
    Submission(#[from] ApiError),
}

impl CheckoutError {
    /// Text suitable for showing the buyer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Submission(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}
