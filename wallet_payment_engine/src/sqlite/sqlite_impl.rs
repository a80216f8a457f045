//! `SqliteDatabase` is a concrete implementation of a wallet payment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module, including the idempotency lock store. Deployments that want lock state out of the main database can swap
//! the lock half for the Redis store without touching the settlement half.
use std::fmt::Debug;

use chrono::Duration;
use log::*;
use sqlx::SqlitePool;
use wps_common::Money;

use super::db::{db_url, locks, new_pool, transactions, wallets};
use crate::{
    db_types::{
        NewTransaction,
        NewWalletEntry,
        OrderId,
        Transaction,
        TransactionStatus,
        Wallet,
        WalletEntry,
        WebhookAuditEntry,
    },
    traits::{
        IdempotencyStore,
        LockStoreError,
        SettlementDatabase,
        SettlementError,
        SettlementResult,
        WalletApiError,
        WalletManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SettlementDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_placeholder(&self, transaction: NewTransaction) -> Result<Transaction, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let row = transactions::insert_placeholder(transaction, &mut tx).await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn fetch_transaction_by_id(&self, id: i64) -> Result<Option<Transaction>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let row = transactions::fetch_transaction_by_id(id, &mut conn).await?;
        Ok(row)
    }

    async fn fetch_transaction_by_order_id(&self, order_id: &OrderId) -> Result<Option<Transaction>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let row = transactions::fetch_transaction_by_order_id(order_id, &mut conn).await?;
        Ok(row)
    }

    async fn attach_charge_session(
        &self,
        id: i64,
        token: &str,
        redirect_url: &str,
    ) -> Result<Transaction, SettlementError> {
        // An explicit transaction so the RETURNING statement is committed before this returns; in autocommit the
        // driver finalizes the statement lazily and other pool connections can briefly read the pre-update row.
        let mut tx = self.pool.begin().await?;
        let row = transactions::attach_charge_session(id, token, redirect_url, &mut tx)
            .await?
            .ok_or(SettlementError::TransactionNotFound(id))?;
        tx.commit().await?;
        debug!("🗃️ Charge session attached to transaction #{id} ({})", row.order_id);
        Ok(row)
    }

    async fn mark_transaction_failed(&self, id: i64) -> Result<Option<Transaction>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let row = transactions::mark_failed(id, &mut conn).await?;
        Ok(row)
    }

    async fn delete_placeholder(&self, id: i64) -> Result<(), SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let deleted = transactions::delete_placeholder(id, &mut conn).await?;
        if !deleted {
            debug!("🗃️ Placeholder #{id} was not deleted. It no longer exists, or has progressed past pending.");
        }
        Ok(())
    }

    async fn count_other_pending(&self, buyer_id: i64, exclude_id: i64) -> Result<u32, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let count = transactions::count_other_pending(buyer_id, exclude_id, &mut conn).await?;
        Ok(count)
    }

    /// Applies a verified webhook status to the transaction in a single atomic database transaction.
    ///
    /// The status write, the audit trail append, the wallet credit and the ledger entry all commit together or not
    /// at all. When the conditional update matches no row the transaction has already completed; the current row is
    /// re-read and returned with nothing modified.
    async fn settle_transaction(
        &self,
        id: i64,
        new_status: TransactionStatus,
        audit: WebhookAuditEntry,
    ) -> Result<SettlementResult, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let updated = transactions::update_status_guarded(id, new_status, &mut tx).await?;
        let result = match updated {
            Some(row) => {
                let mut metadata = row.metadata.0.clone();
                metadata.webhook_audit.push(audit);
                let row = transactions::update_metadata(id, metadata, &mut tx).await?;
                let credited = if new_status == TransactionStatus::Completed {
                    wallets::fetch_or_create_wallet(row.buyer_id, &mut tx).await?;
                    wallets::adjust_balance(row.buyer_id, row.amount, &mut tx).await?;
                    let entry = NewWalletEntry::deposit_for(&row);
                    wallets::insert_wallet_entry(entry, &mut tx).await?;
                    info!("💰️ Credited {} to wallet of user {} for order {}", row.amount, row.buyer_id, row.order_id);
                    true
                } else {
                    false
                };
                SettlementResult::transitioned(row, credited)
            },
            None => {
                let row = transactions::fetch_transaction_by_id(id, &mut tx)
                    .await?
                    .ok_or(SettlementError::TransactionNotFound(id))?;
                debug!("💰️ Transaction #{id} ({}) has already settled. Absorbing the replay.", row.order_id);
                SettlementResult::absorbed(row)
            },
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn expire_stale_pending(&self, older_than: Duration) -> Result<Vec<Transaction>, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let expired = transactions::expire_stale_pending(older_than, &mut tx).await?;
        tx.commit().await?;
        Ok(expired)
    }
}

impl WalletManagement for SqliteDatabase {
    async fn fetch_or_create_wallet(&self, user_id: i64) -> Result<Wallet, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = wallets::fetch_or_create_wallet(user_id, &mut conn).await?;
        Ok(wallet)
    }

    async fn apply_wallet_delta(&self, user_id: i64, delta: Money) -> Result<(), WalletApiError> {
        let mut tx = self.pool.begin().await?;
        wallets::fetch_or_create_wallet(user_id, &mut tx).await?;
        wallets::adjust_balance(user_id, delta, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn fetch_wallet_entries(&self, user_id: i64) -> Result<Vec<WalletEntry>, WalletApiError> {
        let mut conn = self.pool.acquire().await?;
        let entries = wallets::fetch_wallet_entries(user_id, &mut conn).await?;
        Ok(entries)
    }
}

impl IdempotencyStore for SqliteDatabase {
    async fn try_acquire(&self, key: &str, transaction_id: i64, ttl: Duration) -> Result<bool, LockStoreError> {
        let mut conn = self.pool.acquire().await?;
        let acquired = locks::try_acquire(key, transaction_id, ttl, &mut conn).await?;
        Ok(acquired)
    }

    async fn get(&self, key: &str) -> Result<Option<i64>, LockStoreError> {
        let mut conn = self.pool.acquire().await?;
        let holder = locks::get(key, &mut conn).await?;
        Ok(holder)
    }

    async fn release(&self, key: &str) -> Result<(), LockStoreError> {
        let mut conn = self.pool.acquire().await?;
        locks::release(key, &mut conn).await?;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
