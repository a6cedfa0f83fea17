//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interactions are plain functions (rather than stateful structs) that accept a `&mut SqliteConnection`
//! argument. Callers can obtain a connection from a pool, or open a transaction and pass `&mut *tx` so that several
//! calls commit or roll back together. None of these functions open transactions themselves.
use std::{env, future::Future, str::FromStr, time::Duration};

use log::*;
use rand::Rng;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod carts;
pub mod orders;
pub mod products;
pub mod users;

const SQLITE_DB_URL: &str = "sqlite://data/retail_store.db";

/// How many times a unit of work is attempted when SQLite reports write contention.
pub const MAX_WRITE_ATTEMPTS: u32 = 5;
const BASE_BACKOFF_MS: u64 = 10;

pub fn db_url() -> String {
    let result = env::var("RTL_DATABASE_URL").unwrap_or_else(|_| {
        info!("RTL_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

/// Errors that can tell whether the failed unit of work is worth another attempt.
pub(crate) trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or has been attempted [`MAX_WRITE_ATTEMPTS`] times.
/// `op` must be a complete unit of work (typically one transaction), since every attempt starts from scratch.
pub(crate) async fn with_retries<T, E, F, Fut>(label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if e.is_retryable() && attempt < MAX_WRITE_ATTEMPTS => {
                let jitter = rand::thread_rng().gen_range(0..BASE_BACKOFF_MS);
                let delay = BASE_BACKOFF_MS * 2u64.pow(attempt - 1) + jitter;
                debug!("🗃️ {label}: write conflict on attempt {attempt}/{MAX_WRITE_ATTEMPTS} ({e}). Retrying in {delay}ms");
                tokio::time::sleep(Duration::from_millis(delay)).await;
                attempt += 1;
            },
            result => return result,
        }
    }
}
