use std::fmt::Debug;

use wps_common::Money;

use crate::{
    db_types::{Wallet, WalletEntry},
    traits::{WalletApiError, WalletManagement},
};

/// `WalletApi` provides read access to wallets and their ledgers, plus manual balance adjustments.
///
/// Settlement credits do not come through here. They ride inside the backend's atomic settlement path so that the
/// status transition and the credit commit together.
pub struct WalletApi<B> {
    db: B,
}

impl<B> Debug for WalletApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi")
    }
}

impl<B> WalletApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> WalletApi<B>
where B: WalletManagement
{
    /// Returns the user's wallet, creating an empty one if this is the first touch.
    pub async fn balance(&self, user_id: i64) -> Result<Wallet, WalletApiError> {
        self.db.fetch_or_create_wallet(user_id).await
    }

    /// The user's ledger, newest entries first.
    pub async fn history(&self, user_id: i64) -> Result<Vec<WalletEntry>, WalletApiError> {
        self.db.fetch_wallet_entries(user_id).await
    }

    /// Applies a signed delta to the user's balance. The arithmetic happens at the storage layer, so concurrent
    /// adjustments to the same wallet never trample each other.
    pub async fn apply_delta(&self, user_id: i64, delta: Money) -> Result<(), WalletApiError> {
        self.db.apply_wallet_delta(user_id, delta).await
    }
}
