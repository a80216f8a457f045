use thiserror::Error;
use wps_common::Money;

use crate::db_types::{Wallet, WalletEntry};

/// Wallet-side behaviour of a settlement backend: balance reads, ledger history and the atomic signed-delta update.
#[allow(async_fn_in_trait)]
pub trait WalletManagement {
    /// Fetches the wallet for the given user, creating an empty one if it does not exist yet.
    async fn fetch_or_create_wallet(&self, user_id: i64) -> Result<Wallet, WalletApiError>;

    /// Applies a signed delta to the user's balance as a single storage-level arithmetic operation
    /// (`balance = balance + delta`). Implementations must never read the balance into application memory,
    /// compute, and write it back; that reintroduces the lost-update race this contract exists to remove.
    async fn apply_wallet_delta(&self, user_id: i64, delta: Money) -> Result<(), WalletApiError>;

    /// The user's ledger entries, newest first.
    async fn fetch_wallet_entries(&self, user_id: i64) -> Result<Vec<WalletEntry>, WalletApiError>;
}

#[derive(Debug, Clone, Error)]
pub enum WalletApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Wallet for user {0} does not exist")]
    WalletNotFound(i64),
}

impl From<sqlx::Error> for WalletApiError {
    fn from(e: sqlx::Error) -> Self {
        WalletApiError::DatabaseError(e.to_string())
    }
}
