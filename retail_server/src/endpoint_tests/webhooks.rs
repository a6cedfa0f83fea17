use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::Utc;
use hmac::{Hmac, Mac};
use retail_engine::{
    db_types::{OrderNumber, OrderStatusType},
    events::EventProducers,
    helpers::sign_payload,
    payment_objects::{PaymentEvent, PAYMENT_CANCELED, PAYMENT_FAILED, PAYMENT_SUCCEEDED},
    traits::{OrderChanged, OrderFlowError},
    PaymentReconciliationApi,
};
use rtl_common::Secret;
use sha2::Sha256;

use super::{
    helpers::{error_message, json, order, send_request, USER_ID},
    mocks::MockStore,
};
use crate::{helpers::SIGNATURE_HEADER, routes::PaymentWebhookRoute};

const SECRET: &str = "whsec_endpoint_tests";

fn configure(store: MockStore) -> impl FnOnce(&mut ServiceConfig) {
    configure_with_secret(store, SECRET)
}

fn configure_with_secret(store: MockStore, secret: &'static str) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = PaymentReconciliationApi::new(store, EventProducers::default(), Secret::new(secret.to_string()));
        cfg.app_data(web::Data::new(api))
            .service(web::scope("/webhook").service(PaymentWebhookRoute::<MockStore>::new()));
    }
}

fn webhook(event_type: &str, intent: &str, secret: &str) -> TestRequest {
    let payload = serde_json::to_vec(&PaymentEvent::new("evt_1", event_type, intent)).unwrap();
    let header = sign_payload(secret, Utc::now().timestamp(), &payload).unwrap();
    TestRequest::post().uri("/webhook/payments").insert_header((SIGNATURE_HEADER, header)).set_payload(payload)
}

fn store_with_order(status: OrderStatusType) -> MockStore {
    let mut store = MockStore::new();
    store.expect_fetch_order_by_payment_intent().withf(|intent| intent.to_string() == "pi_123").returning(move |_| {
        let mut o = order(5, USER_ID, status);
        o.stripe_payment_intent_id = Some("pi_123".into());
        Ok(Some(o))
    });
    store
}

#[actix_web::test]
async fn successful_payment_marks_order_paid() {
    let _ = env_logger::try_init().ok();
    let mut store = store_with_order(OrderStatusType::Pending);
    store
        .expect_update_order_status_by_payment_intent()
        .withf(|intent, status| intent.to_string() == "pi_123" && *status == OrderStatusType::Paid)
        .times(1)
        .returning(|_, status| Ok(OrderChanged::new(OrderStatusType::Pending, order(5, USER_ID, status))));
    let (status, body) = send_request(webhook(PAYMENT_SUCCEEDED, "pi_123", SECRET), configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    let outcome = json(&body);
    assert_eq!(outcome["result"], "applied");
    assert_eq!(outcome["change"]["old_status"], "pending");
    assert_eq!(outcome["change"]["order"]["status"], "paid");
}

#[actix_web::test]
async fn replayed_payment_changes_nothing() {
    let _ = env_logger::try_init().ok();
    let mut store = store_with_order(OrderStatusType::Paid);
    store.expect_update_order_status_by_payment_intent().never();
    let (status, body) = send_request(webhook(PAYMENT_SUCCEEDED, "pi_123", SECRET), configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["result"], "duplicate");
}

#[actix_web::test]
async fn cancelled_payment_cancels_order() {
    let _ = env_logger::try_init().ok();
    let mut store = store_with_order(OrderStatusType::Pending);
    store
        .expect_update_order_status_by_payment_intent()
        .withf(|_, status| *status == OrderStatusType::Cancelled)
        .times(1)
        .returning(|_, status| Ok(OrderChanged::new(OrderStatusType::Pending, order(5, USER_ID, status))));
    let (status, body) = send_request(webhook(PAYMENT_CANCELED, "pi_123", SECRET), configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["change"]["order"]["status"], "cancelled");
}

#[actix_web::test]
async fn late_cancellation_for_shipped_order_is_ignored() {
    let _ = env_logger::try_init().ok();
    let mut store = store_with_order(OrderStatusType::Shipped);
    store.expect_update_order_status_by_payment_intent().never();
    let (status, body) = send_request(webhook(PAYMENT_CANCELED, "pi_123", SECRET), configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["result"], "ignored");
}

#[actix_web::test]
async fn payment_for_order_cancelled_meanwhile_is_ignored() {
    let _ = env_logger::try_init().ok();
    let mut store = store_with_order(OrderStatusType::Pending);
    store.expect_update_order_status_by_payment_intent().times(1).returning(|_, status| {
        Err(OrderFlowError::IllegalTransition {
            order_number: OrderNumber("ORD-5".into()),
            from: OrderStatusType::Cancelled,
            to: status,
        })
    });
    let (status, body) = send_request(webhook(PAYMENT_SUCCEEDED, "pi_123", SECRET), configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    let outcome = json(&body);
    assert_eq!(outcome["result"], "ignored");
    assert_eq!(outcome["reason"], "Order ORD-5 is cancelled and cannot become paid");
}

#[actix_web::test]
async fn failed_payment_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order_by_payment_intent().never();
    let (status, body) = send_request(webhook(PAYMENT_FAILED, "pi_123", SECRET), configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["result"], "ignored");
}

#[actix_web::test]
async fn unknown_intent_is_not_found() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order_by_payment_intent().returning(|_| Ok(None));
    let (status, body) = send_request(webhook(PAYMENT_SUCCEEDED, "pi_999", SECRET), configure(store)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_message(&body), "The data was not found. No order is linked to payment intent pi_999");
}

#[actix_web::test]
async fn forged_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order_by_payment_intent().never();
    let (status, body) = send_request(webhook(PAYMENT_SUCCEEDED, "pi_123", "whsec_forged"), configure(store)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(error_message(&body).starts_with("Invalid webhook signature"), "{body}");
}

#[actix_web::test]
async fn unset_secret_rejects_every_webhook() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order_by_payment_intent().never();
    store.expect_update_order_status_by_payment_intent().never();
    let payload = serde_json::to_vec(&PaymentEvent::new("evt_1", PAYMENT_SUCCEEDED, "pi_123")).unwrap();
    // Signed with an empty HMAC key, the only key an attacker needs if no secret were required
    let mut mac = Hmac::<Sha256>::new_from_slice(b"").unwrap();
    let now = Utc::now().timestamp();
    mac.update(format!("{now}.").as_bytes());
    mac.update(&payload);
    let header = format!("t={now},v1={}", hex::encode(mac.finalize().into_bytes()));
    let req = TestRequest::post().uri("/webhook/payments").insert_header((SIGNATURE_HEADER, header)).set_payload(payload);
    let (status, body) = send_request(req, configure_with_secret(store, "")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(&body), "Invalid webhook signature. No webhook signing secret is configured");
}

#[actix_web::test]
async fn missing_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let payload = serde_json::to_vec(&PaymentEvent::new("evt_1", PAYMENT_SUCCEEDED, "pi_123")).unwrap();
    let req = TestRequest::post().uri("/webhook/payments").set_payload(payload);
    let (status, _) = send_request(req, configure(MockStore::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn malformed_event_is_rejected() {
    let _ = env_logger::try_init().ok();
    let payload = br#"{"id": "evt_1", "type": "payment_intent.succeeded"}"#;
    let header = sign_payload(SECRET, Utc::now().timestamp(), payload).unwrap();
    let req = TestRequest::post()
        .uri("/webhook/payments")
        .insert_header((SIGNATURE_HEADER, header))
        .set_payload(&payload[..]);
    let (status, body) = send_request(req, configure(MockStore::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).starts_with("Could not read request body"), "{body}");
}
