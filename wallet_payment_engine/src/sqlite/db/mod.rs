//! # Low-level SQLite access.
//!
//! Plain functions over a `&mut SqliteConnection` rather than stateful structs. Callers decide the atomicity: grab a
//! pooled connection for one-shot reads, or open a transaction and pass `&mut *tx` to compose several of these into
//! one atomic unit. Nothing in here begins or commits transactions on its own.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod locks;
pub mod transactions;
pub mod wallets;

const SQLITE_DB_URL: &str = "sqlite://data/wps_store.db";

pub fn db_url() -> String {
    let url = env::var("WPS_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ WPS_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {url}");
    url
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
