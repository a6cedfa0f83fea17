use chrono::Utc;
use rand::{distributions::Uniform, Rng};

use crate::db_types::OrderNumber;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn random_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    let dist = Uniform::from(0..ALPHABET.len());
    (0..len).map(|_| ALPHABET[rng.sample(dist)] as char).collect()
}

/// Generates an order number of the form `ORD-<unix millis>-<8 random uppercase alphanumerics>`.
///
/// Uniqueness is ultimately guaranteed by the database; callers regenerate on a collision.
pub fn new_order_number() -> OrderNumber {
    OrderNumber(format!("ORD-{}-{}", Utc::now().timestamp_millis(), random_code(8)))
}

/// A carrier-style tracking reference, `TRK-<10 random uppercase alphanumerics>`.
pub fn new_tracking_number() -> String {
    format!("TRK-{}", random_code(10))
}
