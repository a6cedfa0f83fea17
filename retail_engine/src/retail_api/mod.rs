//! # Retail engine public API
//!
//! The `retail_api` module exposes the programmatic API of the engine. The API is modular, so that clients can pick
//! the functionality they need:
//!
//! * [`inventory_api`] manages products and the stock ledger.
//! * [`cart_api`] maintains each user's shopping cart.
//! * [`order_flow_api`] turns carts into orders and drives the order lifecycle (cancellation, admin status changes).
//! * [`reconciliation_api`] verifies payment-gateway webhooks and applies them to orders idempotently.
//!
//! The other submodules are supporting types.
//!
//! # API usage
//!
//! Every API is created by supplying a database backend that implements the backend traits the API needs. APIs that
//! raise domain events also take the [`EventProducers`](crate::events::EventProducers) to publish them on.
//!
//! ```rust,ignore
//! use retail_engine::{events::EventProducers, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/retail_store.db", 5).await?;
//! // SqliteDatabase implements OrderManagement and CatalogManagement
//! let api = OrderFlowApi::new(db, EventProducers::default());
//! let order = api.create_order(user_id, "1 Main St, Springfield").await?;
//! ```
pub mod cart_api;
pub mod inventory_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_objects;
pub mod reconciliation_api;
