use actix_web::{
    http::{Method, StatusCode},
    test::TestRequest,
    web,
    web::ServiceConfig,
};
use retail_engine::{traits::CartError, CartApi};

use super::{
    helpers::{cart_with, error_message, json, send_request, user_request, USER_ID},
    mocks::MockStore,
};
use crate::routes::{AddCartItemRoute, EmptyCartRoute, GetCartRoute, RemoveCartItemRoute, UpdateCartItemRoute};

fn configure(store: MockStore) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(CartApi::new(store))).service(
            web::scope("/api")
                .service(GetCartRoute::<MockStore>::new())
                .service(AddCartItemRoute::<MockStore>::new())
                .service(UpdateCartItemRoute::<MockStore>::new())
                .service(RemoveCartItemRoute::<MockStore>::new())
                .service(EmptyCartRoute::<MockStore>::new()),
        );
    }
}

#[actix_web::test]
async fn fetch_cart_without_user_header() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/api/cart");
    let (status, body) = send_request(req, configure(MockStore::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(&body), "The rtl-user-id header is required");
}

#[actix_web::test]
async fn fetch_cart_for_new_user() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_cart().withf(|user_id| *user_id == USER_ID).times(1).returning(|_| Ok(None));
    let (status, body) = send_request(user_request(Method::GET, "/api/cart"), configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    let cart = json(&body);
    assert_eq!(cart["user_id"], USER_ID);
    assert!(cart["id"].is_null());
    assert_eq!(cart["items"].as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn add_item_to_cart() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_add_item_to_cart()
        .withf(|user_id, product_id, quantity| *user_id == USER_ID && *product_id == 10 && *quantity == 3)
        .times(1)
        .returning(|_, _, _| Ok(cart_with(&[(10, 5, 2999)])));
    let req = user_request(Method::POST, "/api/cart/items").set_json(serde_json::json!({"product_id": 10, "quantity": 3}));
    let (status, body) = send_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    let cart = json(&body);
    assert_eq!(cart["items"][0]["quantity"], 5);
    assert_eq!(cart["items"][0]["price"], 2999);
}

#[actix_web::test]
async fn add_too_many_to_cart() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_add_item_to_cart().returning(|_, _, _| {
        Err(CartError::InsufficientStock("Only 4 units of Widget are in stock, but 5 were requested".into()))
    });
    let req = user_request(Method::POST, "/api/cart/items").set_json(serde_json::json!({"product_id": 10, "quantity": 5}));
    let (status, body) = send_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Only 4 units of Widget are in stock, but 5 were requested");
}

#[actix_web::test]
async fn add_item_with_malformed_body() {
    let _ = env_logger::try_init().ok();
    let req = user_request(Method::POST, "/api/cart/items").set_json(serde_json::json!({"product": 10}));
    let (status, body) = send_request(req, configure(MockStore::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).starts_with("Could not read request body"), "{body}");
}

#[actix_web::test]
async fn change_cart_item_quantity() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_update_cart_item()
        .withf(|user_id, item_id, quantity| *user_id == USER_ID && *item_id == 1 && *quantity == 2)
        .times(1)
        .returning(|_, _, _| Ok(cart_with(&[(10, 2, 2999)])));
    let req = user_request(Method::PATCH, "/api/cart/items/1").set_json(serde_json::json!({"quantity": 2}));
    let (status, body) = send_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["items"][0]["quantity"], 2);
}

#[actix_web::test]
async fn remove_missing_cart_item() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_remove_cart_item().returning(|_, item_id| Err(CartError::CartItemNotFound(item_id)));
    let (status, body) = send_request(user_request(Method::DELETE, "/api/cart/items/99"), configure(store)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_message(&body), "The data was not found. Cart item 99 does not exist");
}

#[actix_web::test]
async fn empty_the_cart() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_empty_cart().withf(|user_id| *user_id == USER_ID).times(1).returning(|_| Ok(cart_with(&[])));
    let (status, body) = send_request(user_request(Method::DELETE, "/api/cart"), configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["items"].as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn write_conflicts_are_reported() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_empty_cart().returning(|_| Err(CartError::Conflict("database is locked".into())));
    let (status, _) = send_request(user_request(Method::DELETE, "/api/cart"), configure(store)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}
