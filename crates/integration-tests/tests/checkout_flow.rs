//! Integration tests for the checkout flow against a canned orders API.

use rust_decimal::Decimal;
use serde_json::json;

use creamery_core::{OrderStatus, PaymentMethod, ProductId};
use creamery_integration_tests::{CannedResponse, CannedServer, TestContext, delivery, entry};
use creamery_storefront::error::AppError;
use creamery_storefront::services::{ApiError, CheckoutError, CheckoutStep};
use creamery_storefront::storage::{KeyValueStore as _, keys};

async fn signed_in(server: &CannedServer) -> TestContext {
    let ctx = TestContext::with_api_url(&server.base_url);
    ctx.sign_in("U1");
    ctx.state.cart().add_item(entry("A", Decimal::new(3599, 2)), 2);
    ctx
}

// =============================================================================
// Happy Path
// =============================================================================

#[tokio::test]
async fn test_cod_order_is_posted_and_cart_cleared() {
    let server = CannedServer::start(vec![CannedResponse::json(
        201,
        &json!({ "_id": "o-1", "orderNumber": "ORD-1001", "status": "Pending" }),
    )])
    .await;
    let ctx = signed_in(&server).await;

    let mut checkout = ctx.state.checkout();
    *checkout.delivery_mut() = delivery();
    assert_eq!(checkout.advance().unwrap(), CheckoutStep::Review);
    assert_eq!(checkout.advance().unwrap(), CheckoutStep::Payment);
    checkout.set_payment_method(PaymentMethod::CashOnDelivery);

    let confirmation = checkout.submit().await.unwrap();
    assert_eq!(confirmation.reference(), "ORD-1001");
    assert_eq!(confirmation.status, OrderStatus::Pending);
    assert_eq!(checkout.step(), CheckoutStep::Complete);
    assert!(checkout.last_error().is_none());

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/api/orders");

    let token = ctx.state.store().get(keys::TOKEN).unwrap().unwrap();
    assert_eq!(
        request.header("Authorization"),
        Some(format!("Bearer {token}").as_str())
    );

    let body = request.json();
    assert_eq!(body["userId"], "U1");
    assert_eq!(body["total"], json!(71.98));
    assert_eq!(body["paymentMethod"], "cod");
    assert_eq!(body["paymentDetails"], json!({}));
    assert_eq!(body["items"][0]["productId"], "A");
    assert_eq!(body["items"][0]["quantity"], 2);
    assert_eq!(body["items"][0]["price"], json!(35.99));
    assert_eq!(body["deliveryAddress"]["name"], "Asha Rao");
    assert_eq!(body["deliveryAddress"]["pincode"], "560001");

    assert!(ctx.state.cart().visible_items().is_empty());
    assert_eq!(ctx.stored("cart:U1"), Some(json!([])));
}

#[tokio::test]
async fn test_upi_details_are_sent_for_upi() {
    let server =
        CannedServer::start(vec![CannedResponse::json(200, &json!({ "id": 7 }))]).await;
    let ctx = signed_in(&server).await;

    let mut checkout = ctx.state.checkout();
    *checkout.delivery_mut() = delivery();
    checkout.advance().unwrap();
    checkout.advance().unwrap();
    checkout.set_payment_method(PaymentMethod::Upi);
    checkout.payment_details_mut().upi_id = Some("asha@okbank".to_string());
    checkout.payment_details_mut().card_number = Some("4111111111111111".to_string());

    let confirmation = checkout.submit().await.unwrap();
    assert_eq!(confirmation.reference(), "7");

    let body = server.requests()[0].json();
    assert_eq!(body["paymentMethod"], "upi");
    assert_eq!(body["paymentDetails"]["upiId"], "asha@okbank");
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_rejected_order_keeps_cart_and_records_message() {
    let server = CannedServer::start(vec![CannedResponse::json(
        400,
        &json!({ "message": "Product A is out of stock" }),
    )])
    .await;
    let ctx = signed_in(&server).await;

    let mut checkout = ctx.state.checkout();
    *checkout.delivery_mut() = delivery();
    checkout.advance().unwrap();
    checkout.advance().unwrap();

    let err = checkout.submit().await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::Submission(ApiError::Api { status: 400, .. })
    ));
    assert_eq!(checkout.step(), CheckoutStep::Payment);

    let recorded = checkout.last_error().unwrap();
    assert_eq!(recorded.step, CheckoutStep::Payment);
    assert_eq!(recorded.message, "Product A is out of stock");

    assert_eq!(ctx.state.cart().item_count(), 2);
    assert_eq!(ctx.stored("cart:U1").unwrap()[0]["quantity"], 2);

    let app_error = AppError::from(err);
    assert!(!app_error.is_internal());
    assert_eq!(app_error.user_message(), "Product A is out of stock");
}

#[tokio::test]
async fn test_anonymous_submit_sends_nothing() {
    let server = CannedServer::start(vec![CannedResponse::json(201, &json!({ "_id": "x" }))]).await;
    let ctx = TestContext::with_api_url(&server.base_url);
    ctx.state.cart().add_item(entry("A", Decimal::ONE), 1);

    let mut checkout = ctx.state.checkout();
    *checkout.delivery_mut() = delivery();
    checkout.advance().unwrap();
    checkout.advance().unwrap();

    let err = checkout.submit().await.unwrap_err();
    assert!(matches!(err, CheckoutError::Unauthenticated));
    assert_eq!(
        checkout.last_error().unwrap().message,
        "Please log in to place an order"
    );
    assert!(server.requests().is_empty());
    assert_eq!(ctx.state.cart().item_count(), 1);
}

#[tokio::test]
async fn test_cart_emptied_mid_checkout_blocks_submit() {
    let server = CannedServer::start(vec![]).await;
    let ctx = signed_in(&server).await;

    let mut checkout = ctx.state.checkout();
    *checkout.delivery_mut() = delivery();
    checkout.advance().unwrap();
    checkout.advance().unwrap();

    ctx.state.cart().remove_item(&ProductId::new("A"));
    let err = checkout.submit().await.unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart));
    assert_eq!(checkout.step(), CheckoutStep::Payment);
}

#[tokio::test]
async fn test_incomplete_address_stays_on_first_step() {
    let server = CannedServer::start(vec![]).await;
    let ctx = signed_in(&server).await;

    let mut checkout = ctx.state.checkout();
    *checkout.delivery_mut() = delivery();
    checkout.delivery_mut().pincode.clear();
    checkout.delivery_mut().city = "   ".to_string();

    let err = checkout.advance().unwrap_err();
    assert!(matches!(err, CheckoutError::Validation(_)));
    assert_eq!(checkout.step(), CheckoutStep::Address);
    assert_eq!(
        checkout.last_error().unwrap().message,
        "Please fill all required fields: city, pincode"
    );
}

// =============================================================================
// Prefill
// =============================================================================

#[tokio::test]
async fn test_prefill_from_fetched_profile() {
    let server = CannedServer::start(vec![CannedResponse::json(
        200,
        &json!({
            "_id": "U1",
            "firstName": "Meera",
            "lastName": "Iyer",
            "email": "meera@dairy.co",
            "phone": 9_812_345_678_u64,
            "city": "Pune",
            "pincode": "411001"
        }),
    )])
    .await;
    let ctx = signed_in(&server).await;

    let fetched = ctx.state.api().fetch_profile().await.unwrap();
    let mut checkout = ctx.state.checkout();
    checkout.delivery_mut().city = "Mumbai".to_string();
    checkout.prefill(Some(&fetched), ctx.state.identity().claims().as_ref());

    let form = checkout.delivery();
    assert_eq!(form.first_name, "Meera");
    assert_eq!(form.last_name, "Iyer");
    assert_eq!(form.email, "meera@dairy.co");
    assert_eq!(form.phone, "9812345678");
    assert_eq!(form.city, "Mumbai");
    assert_eq!(form.pincode, "411001");

    assert_eq!(server.requests()[0].path, "/api/user/profile");
}

#[tokio::test]
async fn test_prefill_falls_back_to_token_email() {
    let ctx = TestContext::new();
    ctx.sign_in("U9");

    let mut checkout = ctx.state.checkout();
    checkout.prefill(None, ctx.state.identity().claims().as_ref());

    assert_eq!(checkout.delivery().email, "U9@dairy.co");
    assert!(checkout.delivery().first_name.is_empty());
}
