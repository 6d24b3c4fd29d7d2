//! HTTP client for the products/orders/users API.
//!
//! Authenticated calls carry the session token from the identity resolver
//! as a bearer header. Non-2xx responses become [`ApiError::Api`] with the
//! server's `message` when it sent one.

use std::sync::Arc;

use reqwest::{RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use creamery_core::ProductId;

use crate::config::ApiConfig;
use crate::models::{OrderConfirmation, OrderRequest, Product, UserProfile};
use crate::services::checkout::OrderSubmitter;
use crate::services::identity::IdentityResolver;

/// Longest raw body quoted in an error when the server sent no `message`.
const MAX_ERROR_BODY: usize = 200;

/// Errors that can occur when talking to the API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// No session token is stored.
    #[error("not signed in")]
    Unauthenticated,
}

impl ApiError {
    /// Text suitable for showing the buyer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::Unauthenticated => "Please log in to continue".to_string(),
            Self::Http(_) | Self::Parse(_) => {
                "Failed to reach the store. Please try again.".to_string()
            }
        }
    }
}

/// Client for the remote API.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    identity: IdentityResolver,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig, identity: IdentityResolver) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                identity,
            }),
        })
    }

    /// Submit an order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthenticated` without sending anything if no
    /// session token is stored, or any transport, status or parse error.
    #[instrument(skip_all, fields(user_id = %order.user_id, items = order.items.len()))]
    pub async fn submit_order(&self, order: &OrderRequest) -> Result<OrderConfirmation, ApiError> {
        let request = self
            .authorized(self.inner.client.post(self.endpoint(&["orders"])))?
            .json(order);
        let confirmation: OrderConfirmation = send(request).await?;
        debug!(order_id = %confirmation.id, "Order accepted");
        Ok(confirmation)
    }

    /// Fetch the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthenticated` without sending anything if no
    /// session token is stored, or any transport, status or parse error.
    #[instrument(skip(self))]
    pub async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        let request = self.authorized(self.inner.client.get(self.endpoint(&["user", "profile"])))?;
        send(request).await
    }

    /// Fetch a single product.
    ///
    /// Sends the bearer token when one is stored; the catalog does not
    /// require it.
    ///
    /// # Errors
    ///
    /// Returns any transport, status or parse error. A product record
    /// without an identifier is a parse error.
    #[instrument(skip_all, fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let mut request = self
            .inner
            .client
            .get(self.endpoint(&["products", id.as_str()]));
        if let Some(token) = self.inner.identity.session_token() {
            request = request.bearer_auth(token.expose_secret());
        }
        send(request).await
    }

    /// `{base}/<segments...>`, keeping any path the base URL already has.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.inner.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        let token = self
            .inner
            .identity
            .session_token()
            .ok_or(ApiError::Unauthenticated)?;
        Ok(request.bearer_auth(token.expose_secret()))
    }
}

impl OrderSubmitter for ApiClient {
    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderConfirmation, ApiError> {
        Self::submit_order(self, order).await
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ApiError::Api {
            status: status.as_u16(),
            message: error_message(status, &body),
        });
    }

    Ok(serde_json::from_str(&body)?)
}

/// The server's `message` (or `error`) field, else a trimmed excerpt of the
/// body, else the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) {
        let message = ["message", "error"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str))
            .filter(|m| !m.trim().is_empty());
        if let Some(message) = message {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY).collect()
}
