use chrono::Duration;
use thiserror::Error;

/// Distributed set-if-absent-with-TTL lock, keyed on payment fingerprints.
///
/// The store doubles as a duplicate-detection index: the value under a fingerprint is the id of the placeholder
/// transaction the winning request created. Implementations must arbitrate concurrent `try_acquire` calls
/// atomically across process boundaries. Entries expire on their own; explicit [`IdempotencyStore::release`] exists
/// so terminal failures unblock retries immediately instead of waiting out the TTL.
#[allow(async_fn_in_trait)]
pub trait IdempotencyStore {
    /// Atomically creates `key -> transaction_id` unless a live entry already exists. Returns true iff this caller
    /// won. An expired entry counts as absent and may be taken over.
    async fn try_acquire(&self, key: &str, transaction_id: i64, ttl: Duration) -> Result<bool, LockStoreError>;

    /// The transaction id held under the key, if the entry is still live.
    async fn get(&self, key: &str) -> Result<Option<i64>, LockStoreError>;

    /// Removes the entry. Releasing an absent key is not an error.
    async fn release(&self, key: &str) -> Result<(), LockStoreError>;
}

#[derive(Debug, Clone, Error)]
pub enum LockStoreError {
    #[error("Lock store error: {0}")]
    StoreError(String),
    #[error("Lock entry for '{0}' is corrupt: {1}")]
    CorruptEntry(String, String),
}

impl From<sqlx::Error> for LockStoreError {
    fn from(e: sqlx::Error) -> Self {
        LockStoreError::StoreError(e.to_string())
    }
}
