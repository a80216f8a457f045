use std::fmt::Display;

use serde::{Deserialize, Serialize};
use wallet_payment_engine::PaymentRequest;

/// The wire form of a pay request. User management is out of scope for this server, so the buyer identifies itself
/// in the body; a fronting gateway that owns sessions would inject this field instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayRequest {
    pub buyer_id: i64,
    #[serde(flatten)]
    pub payment: PaymentRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}
