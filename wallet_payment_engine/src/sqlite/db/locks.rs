//! Idempotency locks backed by a plain table.
//!
//! A lock is a row keyed by fingerprint. Acquisition rides on the primary-key constraint: the INSERT either lands
//! (no holder), or falls into the conflict clause which only succeeds when the incumbent row has expired. Exactly one
//! of any number of concurrent callers sees `rows_affected() == 1`.
use chrono::Duration;
use log::*;
use sqlx::SqliteConnection;

pub(crate) async fn try_acquire(
    key: &str,
    transaction_id: i64,
    ttl: Duration,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"INSERT INTO idempotency_locks (key, transaction_id, expires_at)
        VALUES ($1, $2, unixepoch(CURRENT_TIMESTAMP) + $3)
        ON CONFLICT (key) DO UPDATE
        SET transaction_id = excluded.transaction_id, expires_at = excluded.expires_at
        WHERE idempotency_locks.expires_at <= unixepoch(CURRENT_TIMESTAMP)"#,
    )
    .bind(key)
    .bind(transaction_id)
    .bind(ttl.num_seconds())
    .execute(conn)
    .await?;
    let acquired = result.rows_affected() > 0;
    trace!("🔒️ Lock acquisition for key {key} by transaction #{transaction_id}: {acquired}");
    Ok(acquired)
}

/// Returns the transaction id holding the lock, or `None` if the key is free or expired.
pub(crate) async fn get(key: &str, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT transaction_id FROM idempotency_locks WHERE key = $1 AND expires_at > unixepoch(CURRENT_TIMESTAMP)",
    )
    .bind(key)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(|(id,)| id))
}

pub(crate) async fn release(key: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM idempotency_locks WHERE key = $1").bind(key).execute(conn).await?;
    trace!("🔓️ Released lock for key {key}");
    Ok(())
}
