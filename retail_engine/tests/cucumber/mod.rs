pub mod retail_world;
pub mod setups;

pub use retail_world::RetailWorld;
