use thiserror::Error;

use crate::{
    db_types::OrderId,
    helpers::SignatureError,
    traits::{GatewayError, LockStoreError, SettlementError, WalletApiError},
};

/// Everything that can go wrong between a buyer's pay request and a live gateway charge session.
///
/// The first four variants are caller-facing outcomes of the flow itself. The rest wrap collaborator failures and
/// carry enough context for the server layer to pick a sensible response code.
#[derive(Debug, Error)]
pub enum PaymentFlowError {
    #[error("Invalid payment amount: {0}")]
    InvalidAmount(String),
    #[error("The payment was blocked by risk controls")]
    TransactionBlocked,
    #[error("There are too many pending payments for this buyer")]
    TooManyPending,
    #[error("An equivalent payment is already being processed. Try again shortly.")]
    PaymentInProgress,
    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Database error: {0}")]
    DatabaseError(#[from] SettlementError),
    #[error("Wallet error: {0}")]
    WalletError(#[from] WalletApiError),
    #[error("Lock store error: {0}")]
    LockError(#[from] LockStoreError),
}

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
    #[error("Webhook signature verification failed: {0}")]
    InvalidSignature(#[from] SignatureError),
    #[error("No transaction matches order id {0}")]
    UnknownTransaction(OrderId),
    #[error("Unsupported gateway transaction status: {0}")]
    UnsupportedStatus(String),
    #[error("Database error: {0}")]
    DatabaseError(#[from] SettlementError),
}
