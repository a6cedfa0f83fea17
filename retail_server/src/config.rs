//! Server configuration
//!
//! All settings come from `RTL_*` environment variables. Invalid or missing values are logged and replaced with
//! defaults, so the server always starts; the exceptions are the webhook secret and the admin key, which have no safe
//! default and leave their routes unusable until they are set.
use std::{env, str::FromStr};

use log::*;
use retail_engine::helpers::DEFAULT_TOLERANCE_SECS;
use rtl_common::{parse_boolean_flag, Secret};

const DEFAULT_RTL_HOST: &str = "127.0.0.1";
const DEFAULT_RTL_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/retail_store.db";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    /// If true, the embedded schema migrations are applied before the server starts listening.
    pub run_migrations: bool,
    /// The secret the payment gateway signs its webhooks with.
    pub webhook_secret: Secret<String>,
    /// How far (in seconds) a webhook timestamp may drift from the server clock. Zero disables the check.
    pub webhook_tolerance_secs: i64,
    /// The key admin callers must present. `None` disables the admin routes.
    pub admin_api_key: Option<Secret<String>>,
    pub event_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RTL_HOST.to_string(),
            port: DEFAULT_RTL_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            run_migrations: true,
            webhook_secret: Secret::default(),
            webhook_tolerance_secs: DEFAULT_TOLERANCE_SECS,
            admin_api_key: None,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("RTL_HOST").ok().unwrap_or_else(|| DEFAULT_RTL_HOST.into());
        let port = parse_env("RTL_PORT", DEFAULT_RTL_PORT);
        let database_url = env::var("RTL_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ RTL_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let db_max_connections = parse_env("RTL_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS);
        let run_migrations = parse_boolean_flag(env::var("RTL_RUN_MIGRATIONS").ok(), true);
        let webhook_secret = env::var("RTL_PAYMENT_WEBHOOK_SECRET").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| {
            error!(
                "🪛️ RTL_PAYMENT_WEBHOOK_SECRET is not set. Please set it to the signing secret of your payment gateway. \
                 Until then, every payment webhook will be rejected."
            );
            String::default()
        });
        let webhook_tolerance_secs = parse_env("RTL_WEBHOOK_TOLERANCE_SECS", DEFAULT_TOLERANCE_SECS);
        if webhook_tolerance_secs == 0 {
            warn!("🪛️ Webhook timestamp checks are disabled. Replayed webhooks of any age will be accepted.");
        }
        let admin_api_key = env::var("RTL_ADMIN_API_KEY").ok().filter(|s| !s.is_empty()).map(Secret::new);
        if admin_api_key.is_none() {
            warn!("🪛️ RTL_ADMIN_API_KEY is not set. The admin routes will reject every request.");
        }
        let event_buffer_size = parse_env("RTL_EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE);
        Self {
            host,
            port,
            database_url,
            db_max_connections,
            run_migrations,
            webhook_secret: Secret::new(webhook_secret),
            webhook_tolerance_secs,
            admin_api_key,
            event_buffer_size,
        }
    }
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(s) => s.parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            debug!("🪛️ {name} is not set. Using the default, {default}.");
            default
        },
    }
}
