use actix_web::{
    http::{Method, StatusCode},
    test::TestRequest,
    web,
    web::ServiceConfig,
};
use retail_engine::{
    db_types::{OrderNumber, OrderStatusType},
    events::EventProducers,
    order_objects::OrderPage,
    traits::{OrderChanged, OrderFlowError},
    OrderFlowApi,
    PaymentReconciliationApi,
};
use rtl_common::Secret;

use super::{
    helpers::{error_message, json, order, send_request, user, user_request, USER_ID},
    mocks::MockStore,
};
use crate::{
    helpers::ADMIN_KEY_HEADER,
    middleware::AdminKeyMiddlewareFactory,
    routes::{
        AttachPaymentIntentRoute,
        CancelOrderRoute,
        CreateOrderRoute,
        MyOrderByIdRoute,
        MyOrdersRoute,
        SetOrderStatusRoute,
    },
};

const ADMIN_KEY: &str = "let-me-in";

fn configure(store: MockStore) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(OrderFlowApi::new(store, EventProducers::default()))).service(
            web::scope("/api")
                .service(CreateOrderRoute::<MockStore>::new())
                .service(MyOrdersRoute::<MockStore>::new())
                .service(MyOrderByIdRoute::<MockStore>::new())
                .service(CancelOrderRoute::<MockStore>::new()),
        );
    }
}

fn configure_admin(store: MockStore, admin_key: Option<&str>) -> impl FnOnce(&mut ServiceConfig) {
    let admin_key = admin_key.map(|k| Secret::new(k.to_string()));
    move |cfg| {
        let payments = PaymentReconciliationApi::new(store, EventProducers::default(), Secret::new("whsec".into()));
        let mut orders_store = MockStore::new();
        orders_store.expect_fetch_user().returning(|id| Ok(Some(user(id))));
        orders_store.expect_update_order_status().returning(|id, status| {
            Ok(OrderChanged::new(OrderStatusType::Processing, order(id, USER_ID, status)))
        });
        cfg.app_data(web::Data::new(OrderFlowApi::new(orders_store, EventProducers::default())))
            .app_data(web::Data::new(payments))
            .service(
                web::scope("/admin")
                    .wrap(AdminKeyMiddlewareFactory::new(admin_key))
                    .service(SetOrderStatusRoute::<MockStore>::new())
                    .service(AttachPaymentIntentRoute::<MockStore>::new()),
            );
    }
}

#[actix_web::test]
async fn create_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_create_order_from_cart()
        .withf(|user_id, address, number| {
            *user_id == USER_ID && address.to_string() == "1 Main St, Springfield" && number.as_str().starts_with("ORD-")
        })
        .times(1)
        .returning(|user_id, _, _| Ok(order(1, user_id, OrderStatusType::Pending)));
    store.expect_fetch_user().returning(|id| Ok(Some(user(id))));
    let req = user_request(Method::POST, "/api/orders")
        .set_json(serde_json::json!({"shipping_address": "  1 Main St, Springfield "}));
    let (status, body) = send_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::CREATED);
    let order = json(&body);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total_amount"], 8497);
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn order_number_collisions_are_retried() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    let mut calls = 0;
    store.expect_create_order_from_cart().times(2).returning(move |user_id, _, number| {
        calls += 1;
        if calls == 1 {
            Err(OrderFlowError::OrderNumberTaken(number.clone()))
        } else {
            Ok(order(1, user_id, OrderStatusType::Pending))
        }
    });
    store.expect_fetch_user().returning(|id| Ok(Some(user(id))));
    let req = user_request(Method::POST, "/api/orders").set_json(serde_json::json!({"shipping_address": "1 Main St"}));
    let (status, _) = send_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[actix_web::test]
async fn create_order_without_address() {
    let _ = env_logger::try_init().ok();
    let req = user_request(Method::POST, "/api/orders").set_json(serde_json::json!({"shipping_address": "   "}));
    let (status, body) = send_request(req, configure(MockStore::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "A shipping address is required");
}

#[actix_web::test]
async fn create_order_from_empty_cart() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_create_order_from_cart().times(1).returning(|_, _, _| Err(OrderFlowError::EmptyCart));
    let req = user_request(Method::POST, "/api/orders").set_json(serde_json::json!({"shipping_address": "1 Main St"}));
    let (status, body) = send_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Cart is empty");
}

#[actix_web::test]
async fn list_my_orders() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_search_orders()
        .withf(|query, pagination| {
            query.user_id == Some(USER_ID) &&
                query.status == Some(vec![OrderStatusType::Paid]) &&
                query.since.is_some() &&
                pagination.page == 2 &&
                pagination.limit == 5
        })
        .times(1)
        .returning(|_, pagination| Ok(OrderPage::new(vec![order(6, USER_ID, OrderStatusType::Paid)], pagination, 6)));
    let req = user_request(Method::GET, "/api/orders?status=paid&start_date=2024-06-01&page=2&limit=5");
    let (status, body) = send_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    let page = json(&body);
    assert_eq!(page["page"], 2);
    assert_eq!(page["total"], 6);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["orders"][0]["status"], "paid");
}

#[actix_web::test]
async fn list_orders_with_bad_status() {
    let _ = env_logger::try_init().ok();
    let req = user_request(Method::GET, "/api/orders?status=lost");
    let (status, body) = send_request(req, configure(MockStore::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Invalid query parameter. Invalid order status: lost");
}

#[actix_web::test]
async fn fetch_my_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order().returning(|id| Ok(Some(order(id, USER_ID, OrderStatusType::Pending))));
    let (status, body) = send_request(user_request(Method::GET, "/api/orders/3"), configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["id"], 3);
}

#[actix_web::test]
async fn fetch_someone_elses_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order().returning(|id| Ok(Some(order(id, 99, OrderStatusType::Pending))));
    let (status, body) = send_request(user_request(Method::GET, "/api/orders/3"), configure(store)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(&body), "User 7 is not allowed to access order 3");
}

#[actix_web::test]
async fn fetch_missing_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order().returning(|_| Ok(None));
    let (status, _) = send_request(user_request(Method::GET, "/api/orders/3"), configure(store)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn cancel_my_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_cancel_order()
        .withf(|order_id, user_id| *order_id == 3 && *user_id == USER_ID)
        .times(1)
        .returning(|id, user_id| Ok(order(id, user_id, OrderStatusType::Cancelled)));
    let (status, body) = send_request(user_request(Method::POST, "/api/orders/3/cancel"), configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "cancelled");
}

#[actix_web::test]
async fn cancel_delivered_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_cancel_order()
        .returning(|_, _| Err(OrderFlowError::CannotCancelDelivered(OrderNumber("ORD-1".into()))));
    let (status, body) = send_request(user_request(Method::POST, "/api/orders/3/cancel"), configure(store)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Order ORD-1 has been delivered; cannot cancel a delivered order");
}

#[actix_web::test]
async fn admin_routes_require_key() {
    let _ = env_logger::try_init().ok();
    let body = serde_json::json!({"status": "shipped"});
    let req = TestRequest::put().uri("/admin/orders/3/status").set_json(&body);
    let (status, _) = send_request(req, configure_admin(MockStore::new(), Some(ADMIN_KEY))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = TestRequest::put().uri("/admin/orders/3/status").insert_header((ADMIN_KEY_HEADER, "guess")).set_json(&body);
    let (status, _) = send_request(req, configure_admin(MockStore::new(), Some(ADMIN_KEY))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req =
        TestRequest::put().uri("/admin/orders/3/status").insert_header((ADMIN_KEY_HEADER, ADMIN_KEY)).set_json(&body);
    let (status, _) = send_request(req, configure_admin(MockStore::new(), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn admin_sets_order_status() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::put()
        .uri("/admin/orders/3/status")
        .insert_header((ADMIN_KEY_HEADER, ADMIN_KEY))
        .set_json(serde_json::json!({"status": "shipped", "tracking_number": "TRK-1"}));
    let (status, body) = send_request(req, configure_admin(MockStore::new(), Some(ADMIN_KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "shipped");
}

#[actix_web::test]
async fn admin_sets_unknown_status() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::put()
        .uri("/admin/orders/3/status")
        .insert_header((ADMIN_KEY_HEADER, ADMIN_KEY))
        .set_json(serde_json::json!({"status": "lost"}));
    let (status, _) = send_request(req, configure_admin(MockStore::new(), Some(ADMIN_KEY))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn admin_attaches_payment_intent() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_attach_payment_intent()
        .withf(|order_id, intent| *order_id == 3 && intent.to_string() == "pi_123")
        .times(1)
        .returning(|id, intent| {
            let mut o = order(id, USER_ID, OrderStatusType::Pending);
            o.stripe_payment_intent_id = Some(intent.to_string());
            Ok(o)
        });
    let req = TestRequest::post()
        .uri("/admin/orders/3/payment_intent")
        .insert_header((ADMIN_KEY_HEADER, ADMIN_KEY))
        .set_json(serde_json::json!({"payment_intent_id": " pi_123 "}));
    let (status, body) = send_request(req, configure_admin(store, Some(ADMIN_KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["stripe_payment_intent_id"], "pi_123");
}

#[actix_web::test]
async fn admin_attaches_intent_in_use() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_attach_payment_intent()
        .returning(|_, intent| Err(OrderFlowError::PaymentIntentInUse(intent.to_string())));
    let req = TestRequest::post()
        .uri("/admin/orders/3/payment_intent")
        .insert_header((ADMIN_KEY_HEADER, ADMIN_KEY))
        .set_json(serde_json::json!({"payment_intent_id": "pi_123"}));
    let (status, body) = send_request(req, configure_admin(store, Some(ADMIN_KEY))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Payment intent pi_123 is already linked to another order");
}
