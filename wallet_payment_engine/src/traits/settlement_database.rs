use chrono::Duration;
use thiserror::Error;

use crate::{
    db_types::{NewTransaction, OrderId, Transaction, TransactionStatus, WebhookAuditEntry},
    traits::{data_objects::SettlementResult, WalletApiError, WalletManagement},
};

/// The durable transaction ledger backing the settlement engine.
///
/// Implementations must guarantee that [`SettlementDatabase::settle_transaction`] runs as one atomic storage
/// transaction, and that the status change inside it is a conditional update guarded on
/// `status != 'completed'`. The database, not application logic, decides which of several concurrent webhook
/// deliveries performs the terminal transition.
#[allow(async_fn_in_trait)]
pub trait SettlementDatabase: WalletManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Creates a `pending` placeholder row for the attempt and assigns its gateway-facing order id.
    ///
    /// The order id is derived from the row id inside the same storage transaction, so it is deterministic for the
    /// attempt: gateway retries for this placeholder always carry the same order id.
    async fn create_placeholder(&self, transaction: NewTransaction) -> Result<Transaction, SettlementError>;

    async fn fetch_transaction_by_id(&self, id: i64) -> Result<Option<Transaction>, SettlementError>;

    async fn fetch_transaction_by_order_id(&self, order_id: &OrderId) -> Result<Option<Transaction>, SettlementError>;

    /// Writes the gateway charge session (token + redirect URL) into the placeholder's metadata. The status stays
    /// `pending`; only the webhook path may settle.
    async fn attach_charge_session(
        &self,
        id: i64,
        token: &str,
        redirect_url: &str,
    ) -> Result<Transaction, SettlementError>;

    /// Marks a placeholder `failed` after an unsuccessful gateway call. Guarded like every other status write, so a
    /// concurrently-settled row is left alone and returned as `None`.
    async fn mark_transaction_failed(&self, id: i64) -> Result<Option<Transaction>, SettlementError>;

    /// Hard-deletes a placeholder that never reached the gateway (race losers, risk blocks, pending-limit
    /// rejections). Rows that carry a charge session must never be deleted; callers only invoke this before the
    /// gateway call is made.
    async fn delete_placeholder(&self, id: i64) -> Result<(), SettlementError>;

    /// Counts the buyer's `pending` transactions excluding the given one.
    async fn count_other_pending(&self, buyer_id: i64, exclude_id: i64) -> Result<u32, SettlementError>;

    /// The settle path. In a single atomic storage transaction:
    /// * applies the conditional update `SET status = $new WHERE id = $id AND status != 'completed' RETURNING *`,
    /// * appends the webhook audit entry to the row's metadata when the update matched,
    /// * and, when the new status is `completed` and the update matched, credits the buyer's wallet by the
    ///   transaction amount (signed-delta arithmetic in storage) and inserts exactly one deposit ledger entry.
    ///
    /// When the conditional update matches zero rows the current row is re-read and returned untouched with
    /// `transitioned == false`; the wallet is not credited. This is the expected outcome for duplicate deliveries of
    /// a settlement webhook.
    async fn settle_transaction(
        &self,
        id: i64,
        new_status: TransactionStatus,
        audit: WebhookAuditEntry,
    ) -> Result<SettlementResult, SettlementError>;

    /// Marks `pending` transactions older than the cutoff as `expired`, returning the rows that changed. Uses the
    /// same `status != 'completed'` guard as every status write. Best-effort reconciliation for gateways that never
    /// call back.
    async fn expire_stale_pending(&self, older_than: Duration) -> Result<Vec<Transaction>, SettlementError>;
}

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Transaction {0} does not exist")]
    TransactionNotFound(i64),
    #[error("Wallet error: {0}")]
    WalletError(#[from] WalletApiError),
}

impl From<sqlx::Error> for SettlementError {
    fn from(e: sqlx::Error) -> Self {
        SettlementError::DatabaseError(e.to_string())
    }
}
