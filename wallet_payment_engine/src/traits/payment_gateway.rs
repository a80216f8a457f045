use serde::{Deserialize, Serialize};
use thiserror::Error;
use wps_common::Money;

use crate::db_types::OrderId;

/// The outbound charge call to the external payment gateway.
///
/// The engine consumes this as a black box: it either returns a charge session or fails with a typed error. At most
/// one `create_charge` call is ever made per fingerprint; the orchestrator's lock guarantees it, not the gateway.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeSession, GatewayError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    /// Our deterministic order id. The gateway echoes it back in every webhook.
    pub order_id: OrderId,
    pub buyer_id: i64,
    pub amount: Money,
    pub payment_method: String,
}

/// What a successful gateway call hands back: a charge token and the URL the buyer completes payment at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeSession {
    pub token: String,
    pub redirect_url: String,
}

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("The payment gateway is unavailable: {0}")]
    Unavailable(String),
    #[error("Network error reaching the payment gateway: {0}")]
    Network(String),
    #[error("The payment gateway rejected the charge: {0}")]
    Rejected(String),
    #[error("The payment gateway returned an unusable response: {0}")]
    InvalidResponse(String),
}
