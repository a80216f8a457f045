use std::fmt::Debug;

use chrono::Utc;
use log::*;
use wps_common::Secret;

use crate::{
    db_types::{OrderId, Transaction, TransactionStatus, WebhookAuditEntry},
    events::{EventProducers, PaymentSettledEvent},
    helpers::verify_callback_signature,
    traits::SettlementDatabase,
    wpe_api::{errors::WebhookError, flow_objects::CallbackPayload},
};

/// `WebhookApi` reconciles asynchronous gateway callbacks against the transaction ledger.
///
/// The gateway delivers callbacks at least once, in any order, from a network we do not trust. The processing order
/// here is strict: shape, then signature, then storage. A payload that fails either of the first two checks never
/// reads or writes a single row. Status transitions and wallet credits are delegated to the backend's atomic
/// settlement path, which makes replays harmless.
pub struct WebhookApi<B> {
    db: B,
    server_key: Secret<String>,
    producers: EventProducers,
}

impl<B> Debug for WebhookApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WebhookApi")
    }
}

impl<B> WebhookApi<B> {
    pub fn new(db: B, server_key: Secret<String>, producers: EventProducers) -> Self {
        Self { db, server_key, producers }
    }
}

impl<B> WebhookApi<B>
where B: SettlementDatabase
{
    /// Applies one gateway callback and returns the transaction as it stands afterwards.
    ///
    /// Repeat deliveries of a settlement callback are absorbed: the first one credits the buyer's wallet, every
    /// subsequent one sees the completed row and changes nothing. A callback for a completed transaction carrying a
    /// non-completed status is discarded unchanged.
    pub async fn handle_callback(&self, payload: CallbackPayload) -> Result<Transaction, WebhookError> {
        payload.validate_shape()?;
        if let Err(e) = verify_callback_signature(
            &payload.signature_key,
            &payload.order_id,
            &payload.status_code,
            &payload.gross_amount,
            self.server_key.reveal(),
        ) {
            warn!(
                "🚨️ Webhook for order {} failed signature verification ({e}). Treating it as a forgery and \
                 discarding it without touching storage.",
                payload.order_id
            );
            return Err(WebhookError::from(e));
        }
        trace!("🔐️ Webhook signature for order {} verified", payload.order_id);

        let order_id = OrderId::from(payload.order_id.clone());
        let transaction = self
            .db
            .fetch_transaction_by_order_id(&order_id)
            .await?
            .ok_or_else(|| WebhookError::UnknownTransaction(order_id.clone()))?;
        let new_status = map_gateway_status(&payload.transaction_status)
            .ok_or_else(|| WebhookError::UnsupportedStatus(payload.transaction_status.clone()))?;

        if transaction.status == TransactionStatus::Completed && new_status != TransactionStatus::Completed {
            debug!("💰️ Order {order_id} has already completed. Ignoring the {} callback.", payload.transaction_status);
            return Ok(transaction);
        }

        let audit = WebhookAuditEntry {
            received_at: Utc::now(),
            transaction_status: payload.transaction_status.clone(),
            status_code: payload.status_code.clone(),
            gateway_txid: payload.transaction_id.clone(),
        };
        let result = self.db.settle_transaction(transaction.id, new_status, audit).await?;
        match (result.transitioned, new_status) {
            (true, TransactionStatus::Completed) => {
                info!("💰️ Order {order_id} settled and the buyer's wallet was credited");
            },
            (true, status) => debug!("💰️ Order {order_id} moved to {status}"),
            (false, _) => debug!("💰️ Order {order_id} was already completed. The callback was absorbed."),
        }
        if result.credited {
            self.call_payment_settled_hook(&result.transaction).await;
        }
        Ok(result.transaction)
    }

    async fn call_payment_settled_hook(&self, transaction: &Transaction) {
        for producer in &self.producers.payment_settled_producer {
            debug!("💰️ Notifying payment settled subscribers for order {}", transaction.order_id);
            let event = PaymentSettledEvent::new(transaction.clone());
            producer.publish_event(event).await;
        }
    }
}

/// Translates the gateway's status vocabulary into ours. `None` means the gateway sent something we do not handle.
fn map_gateway_status(status: &str) -> Option<TransactionStatus> {
    match status {
        "settlement" | "capture" => Some(TransactionStatus::Completed),
        "pending" => Some(TransactionStatus::Pending),
        "deny" | "cancel" | "expire" | "refund" => Some(TransactionStatus::Failed),
        _ => None,
    }
}
