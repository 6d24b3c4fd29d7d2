//! Unified error handling with Sentry integration.
//!
//! Every library layer has its own error enum; `AppError` gathers them for
//! front ends. [`AppError::report`] captures the failures worth an alert to
//! Sentry before the caller shows the buyer [`AppError::user_message`].

use thiserror::Error;

use creamery_core::UnknownPaymentMethod;

use crate::config::ConfigError;
use crate::models::QuantityError;
use crate::services::{ApiError, CheckoutError};
use crate::state::StateError;
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Durable storage could not be opened or written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Remote API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Checkout refused to move or submit.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Requested quantity breaks the product's stock or minimum order.
    #[error("{0}")]
    Quantity(#[from] QuantityError),

    /// Payment method code not recognized.
    #[error("{0}")]
    PaymentMethod(#[from] UnknownPaymentMethod),

    /// Bad input from the user.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Whether this error is our fault rather than the buyer's.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        match self {
            Self::Config(_) | Self::Storage(_) => true,
            Self::Api(err) | Self::Checkout(CheckoutError::Submission(err)) => {
                !matches!(err, ApiError::Unauthenticated | ApiError::Api { status: 400..=499, .. })
            }
            _ => false,
        }
    }

    /// Log the error, capturing internal failures to Sentry.
    pub fn report(&self) {
        if self.is_internal() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Operation failed"
            );
        } else {
            tracing::info!(error = %self, "Operation rejected");
        }
    }

    /// Text suitable for showing the buyer.
    ///
    /// Internal details stay in the logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(_) => self.to_string(),
            Self::Storage(_) => "Could not save your cart. Please try again.".to_string(),
            Self::Api(err) => err.user_message(),
            Self::Checkout(err) => err.user_message(),
            Self::Quantity(err) => err.to_string(),
            Self::PaymentMethod(err) => err.to_string(),
            Self::BadRequest(msg) => msg.clone(),
        }
    }
}

impl From<StateError> for AppError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::Storage(e) => Self::Storage(e),
            StateError::Api(e) => Self::Api(e),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after sign-in to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
