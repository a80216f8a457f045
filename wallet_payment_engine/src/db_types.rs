use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;
use wps_common::Money;

//--------------------------------------  TransactionStatus  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Placeholder created; the gateway outcome is not known yet.
    Pending,
    /// Settled through a verified gateway callback. Terminal: no write may move a transaction out of this state.
    Completed,
    /// The gateway denied, cancelled, expired or refunded the charge, or was never reached.
    Failed,
    /// The placeholder went stale before any gateway outcome arrived.
    Expired,
}

impl TransactionStatus {
    /// Only `completed` is terminal. Every other pair of states may transition in either direction.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Completed)
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Completed => write!(f, "completed"),
            TransactionStatus::Failed => write!(f, "failed"),
            TransactionStatus::Expired => write!(f, "expired"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid transaction status: {0}")]
pub struct StatusConversionError(String);

impl FromStr for TransactionStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "expired" => Ok(Self::Expired),
            s => Err(StatusConversionError(s.to_string())),
        }
    }
}

//--------------------------------------        OrderId        -------------------------------------------------------
/// The gateway-facing identifier of a transaction. Unique, assigned by us, echoed back in every webhook.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------  TransactionMetadata  -------------------------------------------------------
/// Opaque per-transaction blob: the gateway charge session plus an audit trail of every verified webhook that
/// changed the row. Absorbed duplicates leave no trace here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub webhook_audit: Vec<WebhookAuditEntry>,
}

impl TransactionMetadata {
    /// True once the gateway call for this transaction has succeeded. Race losers poll for this.
    pub fn has_charge_session(&self) -> bool {
        self.charge_token.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAuditEntry {
    pub received_at: DateTime<Utc>,
    pub transaction_status: String,
    pub status_code: String,
    pub gateway_txid: String,
}

//--------------------------------------      Transaction      -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub order_id: OrderId,
    pub buyer_id: i64,
    pub seller_id: i64,
    /// `None` for wallet top-ups.
    pub product_id: Option<i64>,
    pub amount: Money,
    pub commission: Money,
    pub status: TransactionStatus,
    pub payment_method: String,
    pub metadata: Json<TransactionMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn charge_token(&self) -> Option<&str> {
        self.metadata.charge_token.as_deref()
    }

    pub fn redirect_url(&self) -> Option<&str> {
        self.metadata.redirect_url.as_deref()
    }

    pub fn is_settled(&self) -> bool {
        self.status.is_terminal()
    }
}

//--------------------------------------    NewTransaction     -------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub buyer_id: i64,
    pub seller_id: i64,
    /// `None` marks a wallet top-up rather than a product purchase.
    pub product_id: Option<i64>,
    pub amount: Money,
    pub commission: Money,
    pub payment_method: String,
}

impl NewTransaction {
    pub fn new(buyer_id: i64, seller_id: i64, amount: Money) -> Self {
        Self {
            buyer_id,
            seller_id,
            product_id: None,
            amount,
            commission: Money::default(),
            payment_method: "gateway".to_string(),
        }
    }

    pub fn for_product(mut self, product_id: i64) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn with_commission(mut self, commission: Money) -> Self {
        self.commission = commission;
        self
    }

    pub fn with_payment_method<S: Into<String>>(mut self, method: S) -> Self {
        self.payment_method = method.into();
        self
    }

    /// The product component of the idempotency fingerprint. Top-ups share the fixed word `topup`.
    pub fn product_or_topup(&self) -> String {
        self.product_id.map(|id| id.to_string()).unwrap_or_else(|| "topup".to_string())
    }
}

//--------------------------------------    WalletEntryType    -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WalletEntryType {
    Deposit,
    Transfer,
    Adjustment,
}

impl Display for WalletEntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletEntryType::Deposit => write!(f, "deposit"),
            WalletEntryType::Transfer => write!(f, "transfer"),
            WalletEntryType::Adjustment => write!(f, "adjustment"),
        }
    }
}

//--------------------------------------      WalletEntry      -------------------------------------------------------
/// Append-only ledger entry recording one balance change.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct WalletEntry {
    pub id: i64,
    pub user_id: i64,
    /// Signed. Deposits are positive.
    pub amount: Money,
    pub entry_type: WalletEntryType,
    pub status: String,
    pub description: String,
    /// Back-reference to the transaction that produced this entry, if any.
    pub transaction_id: Option<i64>,
    /// Set when the entry was produced by a signature-verified gateway callback.
    pub webhook_verified: bool,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------    NewWalletEntry     -------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewWalletEntry {
    pub user_id: i64,
    pub amount: Money,
    pub entry_type: WalletEntryType,
    pub status: String,
    pub description: String,
    pub transaction_id: Option<i64>,
    pub webhook_verified: bool,
}

impl NewWalletEntry {
    /// The crediting entry written when a transaction settles. Exactly one of these may ever exist per transaction;
    /// the schema enforces it with a unique index.
    pub fn deposit_for(transaction: &Transaction) -> Self {
        Self {
            user_id: transaction.buyer_id,
            amount: transaction.amount,
            entry_type: WalletEntryType::Deposit,
            status: "completed".to_string(),
            description: format!("Gateway deposit for order {}", transaction.order_id),
            transaction_id: Some(transaction.id),
            webhook_verified: true,
        }
    }
}

//--------------------------------------        Wallet         -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: i64,
    pub balance: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
