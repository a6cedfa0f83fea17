//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every handler that touches the database is therefore async.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use retail_engine::{
    traits::{CartManagement, CatalogManagement, OrderManagement},
    CartApi,
    OrderFlowApi,
    PaymentReconciliationApi,
};

use crate::{
    data_objects::{
        AddCartItemRequest,
        AttachPaymentIntentRequest,
        CreateOrderRequest,
        OrderListParams,
        UpdateCartItemRequest,
        UpdateStatusRequest,
    },
    errors::ServerError,
    helpers::{header_str, CallerId, SIGNATURE_HEADER},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>);}
        paste::paste! { impl<B> [<$name:camel Route>]<B> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> B>)
            }
        }}
        paste::paste! { impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
        where
            B: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Cart  ----------------------------------------------------
route!(get_cart => Get "/cart" impl CartManagement);
/// Returns the caller's cart. A caller who has never added anything gets an empty cart.
pub async fn get_cart<B: CartManagement>(
    caller: CallerId,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET cart for user {}", caller.id());
    let cart = api.get_cart(caller.id()).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(add_cart_item => Post "/cart/items" impl CartManagement);
/// Adds a product to the caller's cart. Adding a product that is already in the cart increases its quantity.
pub async fn add_cart_item<B: CartManagement>(
    caller: CallerId,
    body: web::Json<AddCartItemRequest>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let AddCartItemRequest { product_id, quantity } = body.into_inner();
    debug!("💻️ POST cart item: {quantity} of product {product_id} for user {}", caller.id());
    let cart = api.add_item(caller.id(), product_id, quantity).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(update_cart_item => Patch "/cart/items/{id}" impl CartManagement);
pub async fn update_cart_item<B: CartManagement>(
    caller: CallerId,
    path: web::Path<i64>,
    body: web::Json<UpdateCartItemRequest>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let item_id = path.into_inner();
    debug!("💻️ PATCH cart item {item_id} to {} for user {}", body.quantity, caller.id());
    let cart = api.update_item(caller.id(), item_id, body.quantity).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(remove_cart_item => Delete "/cart/items/{id}" impl CartManagement);
pub async fn remove_cart_item<B: CartManagement>(
    caller: CallerId,
    path: web::Path<i64>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let item_id = path.into_inner();
    debug!("💻️ DELETE cart item {item_id} for user {}", caller.id());
    let cart = api.remove_item(caller.id(), item_id).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(empty_cart => Delete "/cart" impl CartManagement);
pub async fn empty_cart<B: CartManagement>(
    caller: CallerId,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ DELETE cart for user {}", caller.id());
    let cart = api.empty_cart(caller.id()).await?;
    Ok(HttpResponse::Ok().json(cart))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl OrderManagement, CatalogManagement);
/// Checks out the caller's cart.
///
/// On success, the new order is returned with `201 Created`, its stock has been reserved and the cart is empty. If any
/// line cannot be fulfilled, nothing changes and the request fails with `400 Bad Request`.
pub async fn create_order<B>(
    caller: CallerId,
    body: web::Json<CreateOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + CatalogManagement,
{
    debug!("💻️ POST order for user {}", caller.id());
    let order = api.create_order(caller.id(), &body.shipping_address).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(my_orders => Get "/orders" impl OrderManagement, CatalogManagement);
/// Lists the caller's orders, newest first.
///
/// Query parameters (all optional):
/// * `status`: one or more comma-separated statuses, e.g. `paid,shipped`
/// * `start_date`, `end_date`: RFC 3339 timestamps or `YYYY-MM-DD` dates
/// * `page`: 1-based page number
/// * `limit`: page size, 10 by default and at most 100
pub async fn my_orders<B>(
    caller: CallerId,
    query: web::Query<OrderListParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + CatalogManagement,
{
    let (filter, pagination) = query.into_inner().into_query()?;
    debug!("💻️ GET orders for user {} with {filter}", caller.id());
    let page = api.list_orders(caller.id(), filter, pagination).await?;
    Ok(HttpResponse::Ok().json(page))
}

route!(my_order_by_id => Get "/orders/{id}" impl OrderManagement, CatalogManagement);
pub async fn my_order_by_id<B>(
    caller: CallerId,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + CatalogManagement,
{
    let order_id = path.into_inner();
    debug!("💻️ GET order {order_id} for user {}", caller.id());
    let order = api.fetch_order_for_user(order_id, caller.id()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Post "/orders/{id}/cancel" impl OrderManagement, CatalogManagement);
/// Cancels one of the caller's orders and returns its items to stock. Delivered and cancelled orders cannot be
/// cancelled.
pub async fn cancel_order<B>(
    caller: CallerId,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + CatalogManagement,
{
    let order_id = path.into_inner();
    info!("💻️ POST cancel order {order_id} for user {}", caller.id());
    let order = api.cancel_order(order_id, caller.id()).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(set_order_status => Put "/orders/{id}/status" impl OrderManagement, CatalogManagement);
/// Sets the status of any order. Admin only.
///
/// The lifecycle rules are not enforced here and no stock is moved. Moving an order to `shipped` or `delivered`
/// notifies the customer. An optional `tracking_number` is used for the shipping notification.
pub async fn set_order_status<B>(
    path: web::Path<i64>,
    body: web::Json<UpdateStatusRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + CatalogManagement,
{
    let order_id = path.into_inner();
    let UpdateStatusRequest { status, tracking_number } = body.into_inner();
    info!("💻️ PUT order {order_id} status to {status}");
    let change = api.update_order_status(order_id, status, tracking_number).await?;
    Ok(HttpResponse::Ok().json(change.order))
}

route!(attach_payment_intent => Post "/orders/{id}/payment_intent" impl OrderManagement);
/// Links a payment-gateway intent to an order. Admin only.
pub async fn attach_payment_intent<B: OrderManagement>(
    path: web::Path<i64>,
    body: web::Json<AttachPaymentIntentRequest>,
    api: web::Data<PaymentReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let intent_id = body.into_inner().payment_intent_id;
    if intent_id.trim().is_empty() {
        return Err(ServerError::BadRequest("payment_intent_id cannot be empty".into()));
    }
    info!("💻️ POST payment intent {intent_id} for order {order_id}");
    let order = api.attach_payment_intent(order_id, &intent_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(payment_webhook => Post "/payments" impl OrderManagement);
/// Receives payment-gateway events.
///
/// The signature in the `Stripe-Signature` header is checked against the raw body before anything else happens, so
/// the body is taken as bytes rather than JSON. Events that were applied, replayed or ignored all return `200 OK`
/// so that the gateway stops retrying. Events for unknown payment intents return `404`, so that the gateway retries
/// them later.
pub async fn payment_webhook<B: OrderManagement>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<PaymentReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received payment webhook ({} bytes)", body.len());
    let signature = header_str(&req, SIGNATURE_HEADER);
    let outcome = api.reconcile_payment_event(&body, signature).await?;
    debug!("💻️ Payment webhook processed: {outcome:?}");
    Ok(HttpResponse::Ok().json(outcome))
}
