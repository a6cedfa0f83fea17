use std::collections::HashMap;

use cucumber::World;
use log::*;
use retail_engine::{
    db_types::{Order, Product},
    events::EventProducers,
    payment_objects::ReconciliationOutcome,
    CartApi,
    InventoryApi,
    OrderFlowApi,
    PaymentReconciliationApi,
    SqliteDatabase,
};
use rtl_common::Secret;

use crate::support::prepare_env::prepare_test_env;

pub const WEBHOOK_SECRET: &str = "whsec_cucumber";

#[derive(Default, Debug, World)]
pub struct RetailWorld {
    pub system: Option<RetailSystem>,
    /// Customers by nickname
    pub users: HashMap<String, i64>,
    /// Products by SKU
    pub products: HashMap<String, i64>,
    /// Orders by the label given to them in the scenario
    pub orders: HashMap<String, Order>,
    pub last_error: Option<String>,
    pub last_outcome: Option<ReconciliationOutcome>,
}

#[derive(Debug)]
pub struct RetailSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub inventory: InventoryApi<SqliteDatabase>,
    pub carts: CartApi<SqliteDatabase>,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub payments: PaymentReconciliationApi<SqliteDatabase>,
}

impl RetailWorld {
    pub fn system(&self) -> &RetailSystem {
        self.system.as_ref().expect("Retail system not initialised")
    }

    pub fn user_id(&self, name: &str) -> i64 {
        *self.users.get(name).unwrap_or_else(|| panic!("Unknown customer {name}"))
    }

    pub fn product_id(&self, sku: &str) -> i64 {
        *self.products.get(sku).unwrap_or_else(|| panic!("Unknown product {sku}"))
    }

    pub fn order(&self, label: &str) -> &Order {
        self.orders.get(label).unwrap_or_else(|| panic!("Unknown order {label}"))
    }

    pub async fn product(&self, sku: &str) -> Product {
        let id = self.product_id(sku);
        self.system().inventory.product(id).await.expect("Error fetching product").expect("Product does not exist")
    }

    pub async fn refresh_order(&self, label: &str) -> Order {
        let id = self.order(label).id;
        self.system().orders.fetch_order(id).await.expect("Error fetching order").expect("Order does not exist")
    }

    pub fn record<T, E: ToString>(&mut self, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(v) => {
                self.last_error = None;
                Some(v)
            },
            Err(e) => {
                let msg = e.to_string();
                debug!("🧪️ Operation failed: {msg}");
                self.last_error = Some(msg);
                None
            },
        }
    }
}

impl RetailSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let producers = EventProducers::default();
        let inventory = InventoryApi::new(db.clone());
        let carts = CartApi::new(db.clone());
        let orders = OrderFlowApi::new(db.clone(), producers.clone());
        let payments = PaymentReconciliationApi::new(db.clone(), producers, Secret::new(WEBHOOK_SECRET.to_string()));
        Self { db_path: url, db, inventory, carts, orders, payments }
    }
}
