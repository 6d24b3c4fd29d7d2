//! Integration tests for the HTTP client: request shape and error mapping.

use rust_decimal::Decimal;
use serde_json::json;

use creamery_core::{PaymentDetails, PaymentMethod, ProductId, UserId};
use creamery_integration_tests::{CannedResponse, CannedServer, TestContext};
use creamery_storefront::models::{DeliveryAddress, OrderRequest};
use creamery_storefront::services::ApiError;

fn order() -> OrderRequest {
    OrderRequest {
        user_id: UserId::new("U1"),
        items: Vec::new(),
        total: Decimal::ZERO,
        delivery_address: DeliveryAddress {
            name: "Asha Rao".to_string(),
            email: "asha@dairy.co".to_string(),
            phone: "9876543210".to_string(),
            address: "12 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            state: "KA".to_string(),
            pincode: "560001".to_string(),
        },
        payment_method: PaymentMethod::CashOnDelivery,
        payment_details: PaymentDetails::default(),
    }
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_get_product_normalizes_record() {
    let server = CannedServer::start(vec![CannedResponse::json(
        200,
        &json!({
            "_id": "65f0c0ffee",
            "name": "Paneer 1kg",
            "price": 420.5,
            "unit": "kg",
            "minOrder": "5",
            "stock": 40
        }),
    )])
    .await;
    let ctx = TestContext::with_api_url(&server.base_url);

    let product = ctx
        .state
        .api()
        .get_product(&ProductId::new("65f0c0ffee"))
        .await
        .unwrap();
    assert_eq!(product.id.as_str(), "65f0c0ffee");
    assert_eq!(product.price, Decimal::new(4205, 1));
    assert_eq!(product.default_quantity(), 5);
    assert!(product.check_quantity(41).is_err());

    let request = &server.requests()[0];
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/api/products/65f0c0ffee");
    assert!(request.header("authorization").is_none());
}

#[tokio::test]
async fn test_get_product_sends_token_when_signed_in() {
    let server = CannedServer::start(vec![CannedResponse::json(
        200,
        &json!({ "id": 3, "name": "Curd", "price": "30" }),
    )])
    .await;
    let ctx = TestContext::with_api_url(&server.base_url);
    ctx.sign_in("U1");

    let product = ctx.state.api().get_product(&ProductId::new("3")).await.unwrap();
    assert_eq!(product.id.as_str(), "3");

    let auth = server.requests()[0].header("authorization").unwrap().to_string();
    assert!(auth.starts_with("Bearer "));
}

#[tokio::test]
async fn test_product_without_identifier_is_parse_error() {
    let server =
        CannedServer::start(vec![CannedResponse::json(200, &json!({ "price": 10 }))]).await;
    let ctx = TestContext::with_api_url(&server.base_url);

    let err = ctx
        .state
        .api()
        .get_product(&ProductId::new("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Parse(_)));
}

// =============================================================================
// Authenticated Endpoints
// =============================================================================

#[tokio::test]
async fn test_unauthenticated_calls_send_nothing() {
    let server = CannedServer::start(vec![CannedResponse::json(200, &json!({}))]).await;
    let ctx = TestContext::with_api_url(&server.base_url);

    let err = ctx.state.api().fetch_profile().await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthenticated));
    let err = ctx.state.api().submit_order(&order()).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthenticated));

    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_order_response_without_id_is_parse_error() {
    let server =
        CannedServer::start(vec![CannedResponse::json(201, &json!({ "message": "ok" }))]).await;
    let ctx = TestContext::with_api_url(&server.base_url);
    ctx.sign_in("U1");

    let err = ctx.state.api().submit_order(&order()).await.unwrap_err();
    assert!(matches!(err, ApiError::Parse(_)));
    assert_eq!(err.user_message(), "Failed to reach the store. Please try again.");
}

// =============================================================================
// Error Mapping
// =============================================================================

#[tokio::test]
async fn test_error_field_and_raw_body_become_messages() {
    let server = CannedServer::start(vec![
        CannedResponse::json(401, &json!({ "error": "Token expired" })),
        CannedResponse {
            status: 500,
            body: "upstream timeout".to_string(),
        },
        CannedResponse {
            status: 404,
            body: String::new(),
        },
    ])
    .await;
    let ctx = TestContext::with_api_url(&server.base_url);
    ctx.sign_in("U1");
    let api = ctx.state.api();

    let err = api.fetch_profile().await.unwrap_err();
    assert!(matches!(err, ApiError::Api { status: 401, .. }));
    assert_eq!(err.user_message(), "Token expired");

    let err = api.fetch_profile().await.unwrap_err();
    assert!(matches!(err, ApiError::Api { status: 500, .. }));
    assert_eq!(err.user_message(), "upstream timeout");

    let err = api.get_product(&ProductId::new("gone")).await.unwrap_err();
    assert_eq!(err.user_message(), "Not Found");
    assert_eq!(server.requests().len(), 3);
}

#[tokio::test]
async fn test_requests_past_the_script_get_service_unavailable() {
    let server = CannedServer::start(vec![CannedResponse::json(
        200,
        &json!({ "_id": "p1", "price": 12 }),
    )])
    .await;
    let ctx = TestContext::with_api_url(&server.base_url);
    let api = ctx.state.api();

    assert!(api.get_product(&ProductId::new("p1")).await.is_ok());
    let err = api.get_product(&ProductId::new("p1")).await.unwrap_err();
    assert!(matches!(err, ApiError::Api { status: 503, .. }));
    assert_eq!(err.user_message(), "no scripted response left");

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.path == "/api/products/p1"));
}
