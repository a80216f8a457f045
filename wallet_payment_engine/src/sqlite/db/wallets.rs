use log::*;
use sqlx::SqliteConnection;
use wps_common::Money;

use crate::{
    db_types::{NewWalletEntry, Wallet, WalletEntry},
    traits::WalletApiError,
};

/// Returns the user's wallet, creating an empty one on first touch.
pub(crate) async fn fetch_or_create_wallet(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Wallet, WalletApiError> {
    sqlx::query("INSERT INTO wallets (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    let wallet = sqlx::query_as("SELECT * FROM wallets WHERE user_id = $1").bind(user_id).fetch_one(conn).await?;
    Ok(wallet)
}

/// Applies a signed delta to the wallet balance.
///
/// The arithmetic happens in the UPDATE statement itself, never as a read-then-write in application code, so
/// concurrent deltas against the same wallet serialize in the database and none are lost.
pub(crate) async fn adjust_balance(
    user_id: i64,
    delta: Money,
    conn: &mut SqliteConnection,
) -> Result<(), WalletApiError> {
    let result = sqlx::query(
        "UPDATE wallets SET balance = balance + $1, updated_at = CURRENT_TIMESTAMP WHERE user_id = $2",
    )
    .bind(delta)
    .bind(user_id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(WalletApiError::WalletNotFound(user_id));
    }
    trace!("💰️ Applied delta of {delta} to wallet for user {user_id}");
    Ok(())
}

/// Records a ledger entry for a wallet movement.
pub(crate) async fn insert_wallet_entry(
    entry: NewWalletEntry,
    conn: &mut SqliteConnection,
) -> Result<WalletEntry, sqlx::Error> {
    let row: WalletEntry = sqlx::query_as(
        r#"INSERT INTO wallet_transactions (user_id, amount, entry_type, status, description, transaction_id,
        webhook_verified) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *"#,
    )
    .bind(entry.user_id)
    .bind(entry.amount)
    .bind(entry.entry_type)
    .bind(&entry.status)
    .bind(&entry.description)
    .bind(entry.transaction_id)
    .bind(entry.webhook_verified)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Wallet entry #{} recorded for user {}: {} {}", row.id, row.user_id, row.entry_type, row.amount);
    Ok(row)
}

pub(crate) async fn fetch_wallet_entries(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<WalletEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM wallet_transactions WHERE user_id = $1 ORDER BY id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}
