use std::collections::HashMap;

use chrono::Utc;
use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{Money, Order, OrderItem, OrderNumber, OrderStatusType},
    order_objects::{OrderQueryFilter, Pagination},
    traits::OrderFlowError,
};

/// Inserts the order header. This is not atomic with the item inserts: call it inside a transaction and pass `&mut *tx`
/// as the connection argument.
///
/// A clash on the unique order number is reported as [`OrderFlowError::OrderNumberTaken`] so that the caller can try
/// again with a fresh number.
pub async fn insert_order(
    order_number: &OrderNumber,
    user_id: i64,
    total_amount: Money,
    shipping_address: &str,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderFlowError> {
    let now = Utc::now();
    let result = sqlx::query_as::<_, Order>(
        r#"
            INSERT INTO orders (order_number, user_id, status, total_amount, shipping_address, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(order_number.as_str())
    .bind(user_id)
    .bind(OrderStatusType::Pending.as_str())
    .bind(total_amount.value())
    .bind(shipping_address)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await;
    match result {
        Ok(order) => {
            debug!("🗃️ Order {} inserted with id {}", order.order_number, order.id);
            Ok(order)
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(OrderFlowError::OrderNumberTaken(order_number.clone()))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn insert_order_item(
    order_id: i64,
    product_id: i64,
    quantity: i64,
    price: Money,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, sqlx::Error> {
    let item = sqlx::query_as(
        "INSERT INTO order_items (order_id, product_id, quantity, price) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(order_id)
    .bind(product_id)
    .bind(quantity)
    .bind(price.value())
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

async fn with_items(order: Option<Order>, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    match order {
        Some(mut order) => {
            order.items = fetch_order_items(order.id, conn).await?;
            Ok(Some(order))
        },
        None => Ok(None),
    }
}

/// Fetches an order, including its items.
pub async fn fetch_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(&mut *conn).await?;
    with_items(order, conn).await
}

/// Fetches the order linked to the given payment intent, including its items.
pub async fn fetch_order_by_payment_intent(
    intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE stripe_payment_intent_id = $1")
        .bind(intent_id)
        .fetch_optional(&mut *conn)
        .await?;
    with_items(order, conn).await
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, query: &OrderQueryFilter) {
    if query.is_empty() {
        return;
    }
    builder.push(" WHERE ");
    let mut where_clause = builder.separated(" AND ");
    if let Some(user_id) = query.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(statuses) = query.status.as_ref().filter(|s| !s.is_empty()) {
        where_clause.push("status IN (");
        for (i, status) in statuses.iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status.as_str());
        }
        where_clause.push_unseparated(")");
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
}

/// Fetches one page of orders matching the filter, newest first, along with the total number of matches.
pub async fn search_orders(
    query: &OrderQueryFilter,
    pagination: Pagination,
    conn: &mut SqliteConnection,
) -> Result<(Vec<Order>, i64), sqlx::Error> {
    let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM orders");
    push_filter(&mut count_builder, query);
    let (total,): (i64,) = count_builder.build_query_as().fetch_one(&mut *conn).await?;

    let mut builder = QueryBuilder::new("SELECT * FROM orders");
    push_filter(&mut builder, query);
    builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
    builder.push_bind(i64::from(pagination.limit));
    builder.push(" OFFSET ");
    builder.push_bind(pagination.offset());
    trace!("🗃️ Executing query: {}", builder.sql());
    let mut orders: Vec<Order> = builder.build_query_as().fetch_all(&mut *conn).await?;

    if !orders.is_empty() {
        let mut items_query = QueryBuilder::new("SELECT * FROM order_items WHERE order_id IN (");
        let mut ids = items_query.separated(", ");
        for order in &orders {
            ids.push_bind(order.id);
        }
        items_query.push(") ORDER BY id ASC");
        let items: Vec<OrderItem> = items_query.build_query_as().fetch_all(&mut *conn).await?;
        let mut by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }
        for order in &mut orders {
            order.items = by_order.remove(&order.id).unwrap_or_default();
        }
    }
    trace!("🗃️ search_orders returned {} of {total} orders", orders.len());
    Ok((orders, total))
}

/// Sets the order status. The returned order does not carry its items.
pub async fn update_order_status(
    order_id: i64,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 RETURNING *")
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(order_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Links a payment intent to the order. The returned order does not carry its items.
pub async fn set_payment_intent(
    order_id: i64,
    intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderFlowError> {
    let result = sqlx::query_as(
        "UPDATE orders SET stripe_payment_intent_id = $1, updated_at = $2 WHERE id = $3 RETURNING *",
    )
    .bind(intent_id)
    .bind(Utc::now())
    .bind(order_id)
    .fetch_optional(conn)
    .await;
    match result {
        Ok(order) => Ok(order),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(OrderFlowError::PaymentIntentInUse(intent_id.to_string()))
        },
        Err(e) => Err(e.into()),
    }
}
