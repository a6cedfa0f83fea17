use cucumber::given;
use retail_engine::{
    db_types::{Money, NewProduct, NewUser},
    CatalogManagement,
};

use crate::cucumber::{retail_world::RetailSystem, RetailWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut RetailWorld) {
    let system = RetailSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "a customer named {word}")]
async fn new_customer(world: &mut RetailWorld, name: String) {
    let user = NewUser::new(format!("{}@example.com", name.to_lowercase()), name.clone(), "Tester".to_string());
    let user = world.system().db.insert_user(user).await.expect("Error creating customer");
    world.users.insert(name, user.id);
}

#[given(expr = "a product {word} named {string} priced at {word} with {int} in stock")]
async fn new_product(world: &mut RetailWorld, sku: String, name: String, price: String, stock: i64) {
    let price = price.parse::<Money>().expect("Invalid price");
    let product = NewProduct::new(sku.clone(), name, price, stock);
    let product = world.system().inventory.add_product(product).await.expect("Error creating product");
    world.products.insert(sku, product.id);
}

#[given(expr = "an inactive product {word} named {string} priced at {word} with {int} in stock")]
async fn new_inactive_product(world: &mut RetailWorld, sku: String, name: String, price: String, stock: i64) {
    let price = price.parse::<Money>().expect("Invalid price");
    let product = NewProduct::new(sku.clone(), name, price, stock).inactive();
    let product = world.system().inventory.add_product(product).await.expect("Error creating product");
    world.products.insert(sku, product.id);
}
