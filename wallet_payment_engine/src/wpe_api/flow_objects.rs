//! Request and response objects for the payment flows.
use chrono::Duration;
use serde::{Deserialize, Serialize};
use wps_common::Money;

use crate::{db_types::Transaction, wpe_api::errors::WebhookError};

/// A buyer's request to start a payment.
///
/// Amounts travel as decimal strings and are only converted to [`Money`] after validation, so a garbled amount is
/// rejected before anything touches storage. A missing `product_id` means a wallet top-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub seller_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commission: Option<String>,
    #[serde(default = "PaymentRequest::default_payment_method")]
    pub payment_method: String,
}

impl PaymentRequest {
    pub fn new<S: Into<String>>(seller_id: i64, amount: S) -> Self {
        Self {
            seller_id,
            product_id: None,
            amount: amount.into(),
            commission: None,
            payment_method: Self::default_payment_method(),
        }
    }

    pub fn for_product(mut self, product_id: i64) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn with_commission<S: Into<String>>(mut self, commission: S) -> Self {
        self.commission = Some(commission.into());
        self
    }

    fn default_payment_method() -> String {
        "gateway".to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub transaction: Transaction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    pub is_existing: bool,
}

impl PaymentResponse {
    fn from_transaction(transaction: Transaction, is_existing: bool) -> Self {
        let charge_token = transaction.charge_token().map(String::from);
        let redirect_url = transaction.redirect_url().map(String::from);
        Self { transaction, charge_token, redirect_url, is_existing }
    }

    /// A brand-new payment attempt that just went through the gateway.
    pub fn fresh(transaction: Transaction) -> Self {
        Self::from_transaction(transaction, false)
    }

    /// An equivalent in-flight payment that absorbed this request.
    pub fn existing(transaction: Transaction) -> Self {
        Self::from_transaction(transaction, true)
    }
}

/// The callback body the gateway posts to us. All fields arrive as strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub order_id: String,
    pub status_code: String,
    pub gross_amount: String,
    pub signature_key: String,
    pub transaction_status: String,
    #[serde(default)]
    pub payment_type: String,
    #[serde(default)]
    pub transaction_id: String,
}

impl CallbackPayload {
    /// Structural validation only. Signature checks come after, and only after both have passed does any field get
    /// used to touch storage.
    pub fn validate_shape(&self) -> Result<(), WebhookError> {
        let required = [
            ("order_id", &self.order_id),
            ("status_code", &self.status_code),
            ("gross_amount", &self.gross_amount),
            ("signature_key", &self.signature_key),
            ("transaction_status", &self.transaction_status),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(WebhookError::InvalidPayload(format!("{name} is missing or empty")));
            }
        }
        Ok(())
    }
}

/// Tunables for the payment creation flow. The defaults match a 5 minute gateway round-trip budget.
#[derive(Debug, Clone)]
pub struct PaymentFlowConfig {
    /// How long an idempotency lock protects a fingerprint before a crashed holder stops blocking retries.
    pub lock_ttl: Duration,
    /// How many times a race loser polls the winner before giving up.
    pub poll_attempts: u32,
    /// Delay between race-loser polls.
    pub poll_interval: std::time::Duration,
    /// The ceiling on simultaneous pending payments per buyer, not counting the one being created.
    pub max_pending_per_buyer: u32,
    /// Upper bound on a single payment.
    pub max_amount: Money,
}

impl Default for PaymentFlowConfig {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::seconds(300),
            poll_attempts: 10,
            poll_interval: std::time::Duration::from_millis(500),
            max_pending_per_buyer: 5,
            max_amount: Money::from_whole(100_000_000),
        }
    }
}
