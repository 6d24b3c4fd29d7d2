//! Integration tests for Creamery.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p creamery-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_partitions` - Cart store, identity switching and durability
//! - `checkout_flow` - Checkout state machine against a canned orders API
//! - `api_client` - HTTP client requests and error mapping
//!
//! This library holds the shared fixtures: a [`TestContext`] with its own
//! storage file, and a [`CannedServer`] (an axum router) that answers HTTP
//! requests from a script.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use creamery_core::ProductId;
use creamery_storefront::config::StorefrontConfig;
use creamery_storefront::models::{CartEntry, PresentationFields};
use creamery_storefront::services::DeliveryDetails;
use creamery_storefront::state::AppState;
use creamery_storefront::storage::{KeyValueStore as _, keys};

// =============================================================================
// Test Context
// =============================================================================

/// An [`AppState`] over a private storage file.
pub struct TestContext {
    _dir: TempDir,
    pub storage_path: PathBuf,
    pub config: StorefrontConfig,
    pub state: AppState,
}

impl TestContext {
    /// Context whose API URL points nowhere.
    #[must_use]
    pub fn new() -> Self {
        Self::with_api_url("http://127.0.0.1:9/api")
    }

    #[must_use]
    pub fn with_api_url(api_url: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage_path = dir.path().join("storage.json");

        let vars: HashMap<&str, String> = HashMap::from([
            ("STOREFRONT_API_URL", api_url.to_string()),
            ("STOREFRONT_STORAGE_PATH", storage_path.display().to_string()),
            ("STOREFRONT_HTTP_TIMEOUT_SECS", "5".to_string()),
        ]);
        let config = StorefrontConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();
        let state = AppState::new(config.clone()).unwrap();

        Self {
            _dir: dir,
            storage_path,
            config,
            state,
        }
    }

    /// A second process opening the same storage file.
    #[must_use]
    pub fn restart(&self) -> AppState {
        AppState::new(self.config.clone()).unwrap()
    }

    /// Sign in through the session token only.
    pub fn sign_in(&self, user_id: &str) {
        let store = self.state.store();
        store.remove(keys::USER).unwrap();
        store
            .set(
                keys::TOKEN,
                &token_for(&json!({ "userId": user_id, "email": format!("{user_id}@dairy.co") })),
            )
            .unwrap();
    }

    /// Sign in with a token and a cached profile record.
    pub fn sign_in_with_profile(&self, profile: &Value) {
        let store = self.state.store();
        store.set(keys::USER, &profile.to_string()).unwrap();
        store
            .set(keys::TOKEN, &token_for(&json!({ "role": "customer" })))
            .unwrap();
    }

    pub fn sign_out(&self) {
        let store = self.state.store();
        store.remove(keys::USER).unwrap();
        store.remove(keys::TOKEN).unwrap();
    }

    /// Raw JSON stored under `key`, if any.
    #[must_use]
    pub fn stored(&self, key: &str) -> Option<Value> {
        self.state
            .store()
            .get(key)
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unsigned JWT carrying `claims`.
#[must_use]
pub fn token_for(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.unsigned")
}

/// Cart entry for a product at `price`.
#[must_use]
pub fn entry(id: &str, price: Decimal) -> CartEntry {
    CartEntry {
        item_id: ProductId::new(id),
        unit_price: price,
        presentation: PresentationFields {
            name: format!("Product {id}"),
            unit: Some("kg".to_string()),
            ..PresentationFields::default()
        },
    }
}

/// A fully filled, valid delivery form.
#[must_use]
pub fn delivery() -> DeliveryDetails {
    DeliveryDetails {
        first_name: "Asha".to_string(),
        last_name: "Rao".to_string(),
        email: "asha@dairy.co".to_string(),
        phone: "9876543210".to_string(),
        address: "12 MG Road".to_string(),
        city: "Bengaluru".to_string(),
        state: "KA".to_string(),
        pincode: "560001".to_string(),
    }
}

// =============================================================================
// Canned HTTP Server
// =============================================================================

/// A request as the canned server saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// One scripted reply.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub body: String,
}

impl CannedResponse {
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }
}

/// Local HTTP server that answers requests from a script, in order.
///
/// Once the script runs out every further request gets a 503.
pub struct CannedServer {
    pub base_url: String,
    script: Arc<Script>,
    task: JoinHandle<()>,
}

struct Script {
    responses: Mutex<VecDeque<CannedResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl CannedServer {
    /// Bind to a random local port and serve `responses` in order.
    pub async fn start(responses: Vec<CannedResponse>) -> Self {
        let script = Arc::new(Script {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .fallback(reply)
            .with_state(Arc::clone(&script));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/api"),
            script,
            task,
        }
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script.requests.lock().unwrap().clone()
    }
}

impl Drop for CannedServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn reply(
    State(script): State<Arc<Script>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    script.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        headers,
        body,
    });

    let Some(canned) = script.responses.lock().unwrap().pop_front() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "no scripted response left").into_response();
    };
    let status = StatusCode::from_u16(canned.status).unwrap();
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        canned.body,
    )
        .into_response()
}
