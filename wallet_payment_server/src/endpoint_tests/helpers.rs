//! Shared fixtures for the endpoint tests: canned transactions and a helper for assembling signed webhook payloads.
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::types::Json;
use wallet_payment_engine::{
    db_types::{OrderId, Transaction, TransactionMetadata, TransactionStatus},
    helpers::compute_callback_signature,
};
use wps_common::Money;

pub const TEST_SERVER_KEY: &str = "wps-endpoint-test-key";

pub fn pending_tx(id: i64) -> Transaction {
    Transaction {
        id,
        order_id: OrderId::from(format!("wps-{id}")),
        buyer_id: 7,
        seller_id: 3,
        product_id: Some(42),
        amount: Money::from_whole(150_000),
        commission: Money::default(),
        status: TransactionStatus::Pending,
        payment_method: "gateway".to_string(),
        metadata: Json(TransactionMetadata::default()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn with_charge_session(mut tx: Transaction) -> Transaction {
    tx.metadata.charge_token = Some(format!("tok-{}", tx.id));
    tx.metadata.redirect_url = Some(format!("https://pay.gateway.example/redirect/tok-{}", tx.id));
    tx
}

pub fn completed_tx(id: i64) -> Transaction {
    let mut tx = with_charge_session(pending_tx(id));
    tx.status = TransactionStatus::Completed;
    tx
}

/// A structurally valid callback for the order, signed with [`TEST_SERVER_KEY`].
pub fn signed_callback(order_id: &str, transaction_status: &str) -> Value {
    let status_code = "200";
    let gross_amount = "150000.00";
    let signature = compute_callback_signature(order_id, status_code, gross_amount, TEST_SERVER_KEY);
    json!({
        "order_id": order_id,
        "status_code": status_code,
        "gross_amount": gross_amount,
        "signature_key": signature,
        "transaction_status": transaction_status,
        "payment_type": "bank_transfer",
        "transaction_id": "gw-12345",
    })
}
