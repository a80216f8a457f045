use chrono::Duration;
use log::*;
use sqlx::{types::Json, SqliteConnection};

use crate::db_types::{NewTransaction, OrderId, Transaction, TransactionMetadata, TransactionStatus};

/// Prefix for canonical external order ids. The full id is this prefix followed by the row id.
pub(crate) const ORDER_ID_PREFIX: &str = "wps-";

/// Inserts a new pending transaction and rewrites its order id to the canonical `wps-{id}` form.
///
/// Two statements, so run it inside an open transaction when the caller needs the placeholder to appear atomically.
pub(crate) async fn insert_placeholder(
    transaction: NewTransaction,
    conn: &mut SqliteConnection,
) -> Result<Transaction, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        r#"INSERT INTO transactions (buyer_id, seller_id, product_id, amount, commission, payment_method)
        VALUES ($1, $2, $3, $4, $5, $6) RETURNING id"#,
    )
    .bind(transaction.buyer_id)
    .bind(transaction.seller_id)
    .bind(transaction.product_id)
    .bind(transaction.amount)
    .bind(transaction.commission)
    .bind(&transaction.payment_method)
    .fetch_one(&mut *conn)
    .await?;
    let row: Transaction = sqlx::query_as("UPDATE transactions SET order_id = $1 || id WHERE id = $2 RETURNING *")
        .bind(ORDER_ID_PREFIX)
        .bind(id)
        .fetch_one(conn)
        .await?;
    debug!("📝️ Inserted pending transaction #{id} with order id {}", row.order_id);
    Ok(row)
}

pub(crate) async fn fetch_transaction_by_id(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub(crate) async fn fetch_transaction_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await
}

/// Writes the gateway session onto the placeholder in one statement. The JSON edit happens inside the UPDATE
/// itself, so nothing can interleave between reading the metadata blob and writing it back.
pub(crate) async fn attach_charge_session(
    id: i64,
    token: &str,
    redirect_url: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as(
        r#"UPDATE transactions
        SET metadata = json_set(metadata, '$.charge_token', $1, '$.redirect_url', $2), updated_at = CURRENT_TIMESTAMP
        WHERE id = $3 RETURNING *"#,
    )
    .bind(token)
    .bind(redirect_url)
    .bind(id)
    .fetch_optional(conn)
    .await
}

/// Replaces the metadata blob on a transaction. Balance-bearing fields never live in metadata, so a plain overwrite
/// here is safe as long as the caller read the blob in the same database transaction.
pub(crate) async fn update_metadata(
    id: i64,
    metadata: TransactionMetadata,
    conn: &mut SqliteConnection,
) -> Result<Transaction, sqlx::Error> {
    sqlx::query_as("UPDATE transactions SET metadata = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
        .bind(Json(metadata))
        .bind(id)
        .fetch_one(conn)
        .await
}

/// The conditional status transition at the heart of settlement.
///
/// The `status != 'completed'` guard makes `completed` absorbing at the storage level: a replayed or late webhook
/// matches zero rows and the function returns `None` without touching anything. Callers treat `None` as "already
/// settled, re-read and report".
pub(crate) async fn update_status_guarded(
    id: i64,
    new_status: TransactionStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    let updated: Option<Transaction> = sqlx::query_as(
        r#"UPDATE transactions SET status = $1, updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND status != 'completed' RETURNING *"#,
    )
    .bind(new_status)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    match &updated {
        Some(tx) => trace!("🗃️ Transaction #{id} moved to {new_status}. Order id is {}", tx.order_id),
        None => trace!("🗃️ Transaction #{id} did not transition to {new_status}. It has already completed."),
    }
    Ok(updated)
}

/// Unconditionally marks a transaction failed unless it has already completed. Used for gateway-failure cleanup on
/// the create path, where the row is known to be a fresh placeholder.
pub(crate) async fn mark_failed(id: i64, conn: &mut SqliteConnection) -> Result<Option<Transaction>, sqlx::Error> {
    update_status_guarded(id, TransactionStatus::Failed, conn).await
}

/// Removes a placeholder that never reached the gateway. The status guard means a row that has started settling can
/// never be deleted by a racing creator.
pub(crate) async fn delete_placeholder(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM transactions WHERE id = $1 AND status = 'pending'").bind(id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Counts the buyer's pending transactions, excluding the one identified by `exclude_id`.
pub(crate) async fn count_other_pending(
    buyer_id: i64,
    exclude_id: i64,
    conn: &mut SqliteConnection,
) -> Result<u32, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM transactions WHERE buyer_id = $1 AND status = 'pending' AND id != $2",
    )
    .bind(buyer_id)
    .bind(exclude_id)
    .fetch_one(conn)
    .await?;
    Ok(count as u32)
}

/// Marks pending transactions older than the cutoff as expired and returns the affected rows.
///
/// Settled rows are untouchable here by construction, since only `pending` rows match the filter.
pub(crate) async fn expire_stale_pending(
    older_than: Duration,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let expired: Vec<Transaction> = sqlx::query_as(
        r#"UPDATE transactions SET status = 'expired', updated_at = CURRENT_TIMESTAMP
        WHERE status = 'pending' AND (unixepoch(CURRENT_TIMESTAMP) - unixepoch(created_at)) > $1
        RETURNING *"#,
    )
    .bind(older_than.num_seconds())
    .fetch_all(conn)
    .await?;
    if !expired.is_empty() {
        info!("🗃️ {} pending transaction(s) expired after exceeding their settlement window", expired.len());
    }
    Ok(expired)
}
