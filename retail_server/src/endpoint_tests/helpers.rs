use actix_web::{
    body::MessageBody,
    http::{Method, StatusCode},
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use chrono::{TimeZone, Utc};
use log::debug;
use retail_engine::db_types::{Cart, CartItem, Money, Order, OrderItem, OrderNumber, OrderStatusType, UserProfile};
use serde_json::Value;

use crate::{
    helpers::USER_ID_HEADER,
    server::{json_config, query_config},
};

pub const USER_ID: i64 = 7;

/// Sends a single request through an app built by `configure` and returns the status and body.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().app_data(json_config()).app_data(query_config()).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        // Middleware rejections surface as errors rather than responses
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = res.into_body().try_into_bytes().map(|b| String::from_utf8_lossy(&b).into_owned());
            (status, body.unwrap_or_default())
        },
    }
}

/// A request on behalf of [`USER_ID`].
pub fn user_request(method: Method, path: &str) -> TestRequest {
    TestRequest::default().method(method).uri(path).insert_header((USER_ID_HEADER, USER_ID.to_string()))
}

pub fn json(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response is not JSON: {e}. Body: {body}"))
}

pub fn error_message(body: &str) -> String {
    json(body)["error"].as_str().expect("No error field in response").to_string()
}

pub fn cart_with(items: &[(i64, i64, i64)]) -> Cart {
    let items = items
        .iter()
        .enumerate()
        .map(|(i, &(product_id, quantity, cents))| CartItem {
            id: i as i64 + 1,
            cart_id: 1,
            product_id,
            product_name: format!("Product {product_id}"),
            quantity,
            price: Money::from_cents(cents),
        })
        .collect();
    Cart { id: Some(1), user_id: USER_ID, items }
}

pub fn order(id: i64, user_id: i64, status: OrderStatusType) -> Order {
    let created_at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    Order {
        id,
        order_number: OrderNumber(format!("ORD-1717243200000-{id:08}")),
        user_id,
        status,
        total_amount: Money::from_cents(8497),
        shipping_address: "1 Main St, Springfield".into(),
        stripe_payment_intent_id: None,
        created_at,
        updated_at: created_at,
        items: vec![
            OrderItem { id: 1, order_id: id, product_id: 10, quantity: 2, price: Money::from_cents(2999) },
            OrderItem { id: 2, order_id: id, product_id: 11, quantity: 1, price: Money::from_cents(2499) },
        ],
    }
}

pub fn user(id: i64) -> UserProfile {
    UserProfile {
        id,
        email: "ann@example.com".into(),
        first_name: "Ann".into(),
        last_name: "Smith".into(),
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
}
