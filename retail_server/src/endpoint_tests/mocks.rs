use mockall::mock;
use retail_engine::{
    db_types::{Cart, Money, NewProduct, NewUser, Order, OrderNumber, OrderStatusType, Product, UserProfile},
    order_objects::{OrderPage, OrderQueryFilter, Pagination},
    traits::{
        CartError,
        CartManagement,
        CatalogError,
        CatalogManagement,
        OrderChanged,
        OrderFlowError,
        OrderManagement,
    },
};

mock! {
    pub Store {}
    impl CartManagement for Store {
        async fn fetch_cart(&self, user_id: i64) -> Result<Option<Cart>, CartError>;
        async fn add_item_to_cart(&self, user_id: i64, product_id: i64, quantity: i64) -> Result<Cart, CartError>;
        async fn update_cart_item(&self, user_id: i64, cart_item_id: i64, quantity: i64) -> Result<Cart, CartError>;
        async fn remove_cart_item(&self, user_id: i64, cart_item_id: i64) -> Result<Cart, CartError>;
        async fn empty_cart(&self, user_id: i64) -> Result<Cart, CartError>;
    }
    impl OrderManagement for Store {
        fn url(&self) -> &str;
        async fn create_order_from_cart(&self, user_id: i64, shipping_address: &str, order_number: &OrderNumber) -> Result<Order, OrderFlowError>;
        async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderFlowError>;
        async fn fetch_order_by_payment_intent(&self, intent_id: &str) -> Result<Option<Order>, OrderFlowError>;
        async fn search_orders(&self, query: OrderQueryFilter, pagination: Pagination) -> Result<OrderPage, OrderFlowError>;
        async fn cancel_order(&self, order_id: i64, user_id: i64) -> Result<Order, OrderFlowError>;
        async fn update_order_status(&self, order_id: i64, status: OrderStatusType) -> Result<OrderChanged, OrderFlowError>;
        async fn update_order_status_by_payment_intent(&self, intent_id: &str, status: OrderStatusType) -> Result<OrderChanged, OrderFlowError>;
        async fn attach_payment_intent(&self, order_id: i64, intent_id: &str) -> Result<Order, OrderFlowError>;
    }
    impl CatalogManagement for Store {
        async fn fetch_user(&self, user_id: i64) -> Result<Option<UserProfile>, CatalogError>;
        async fn insert_user(&self, user: NewUser) -> Result<UserProfile, CatalogError>;
        async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, CatalogError>;
        async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogError>;
        async fn update_product_price(&self, product_id: i64, price: Money) -> Result<Product, CatalogError>;
        async fn set_product_active(&self, product_id: i64, active: bool) -> Result<Product, CatalogError>;
    }
}
