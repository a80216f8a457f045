use serde::{Deserialize, Serialize};

use crate::db_types::Transaction;

/// Outcome of [`settle_transaction`](crate::traits::SettlementDatabase::settle_transaction).
///
/// `transitioned` says whether the conditional update matched the row; `credited` says whether this call performed
/// the wallet credit. `credited` implies `transitioned`. A duplicate settlement delivery comes back with both flags
/// false and the transaction in its current (already `completed`) state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementResult {
    pub transaction: Transaction,
    pub transitioned: bool,
    pub credited: bool,
}

impl SettlementResult {
    pub fn absorbed(transaction: Transaction) -> Self {
        Self { transaction, transitioned: false, credited: false }
    }

    pub fn transitioned(transaction: Transaction, credited: bool) -> Self {
        Self { transaction, transitioned: true, credited }
    }
}
