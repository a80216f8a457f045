use std::fmt::Debug;

use log::*;
use tokio::time::sleep;
use wps_common::Money;

use crate::{
    db_types::{NewTransaction, OrderId, Transaction, TransactionStatus},
    events::{EventProducers, RiskAlertEvent},
    helpers::payment_fingerprint,
    traits::{
        ChargeRequest,
        IdempotencyStore,
        PaymentGateway,
        RiskAssessment,
        RiskLevel,
        RiskReport,
        SettlementDatabase,
    },
    wpe_api::{
        errors::PaymentFlowError,
        flow_objects::{PaymentFlowConfig, PaymentRequest, PaymentResponse},
    },
};

/// `PaymentFlowApi` is the primary API for turning pay requests into gateway charge sessions.
///
/// Its central promise: for one purchase intent (buyer, product, amount), at most one placeholder ever reaches the
/// gateway, no matter how many duplicate or concurrent requests arrive. Duplicates are absorbed by the idempotency
/// key store and handed the in-flight transaction instead of a fresh charge.
pub struct PaymentFlowApi<B, K, G, R> {
    db: B,
    locks: K,
    gateway: G,
    risk: R,
    config: PaymentFlowConfig,
    producers: EventProducers,
}

impl<B, K, G, R> Debug for PaymentFlowApi<B, K, G, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B, K, G, R> PaymentFlowApi<B, K, G, R> {
    pub fn new(db: B, locks: K, gateway: G, risk: R, config: PaymentFlowConfig, producers: EventProducers) -> Self {
        Self { db, locks, gateway, risk, config, producers }
    }
}

impl<B, K, G, R> PaymentFlowApi<B, K, G, R>
where
    B: SettlementDatabase,
    K: IdempotencyStore,
    G: PaymentGateway,
    R: RiskAssessment,
{
    /// Creates a payment for the buyer, or returns the equivalent in-flight one.
    ///
    /// The flow in order: validate the amount, derive the fingerprint, absorb duplicates via the key store, insert a
    /// pending placeholder, race for the idempotency lock, run risk checks and the pending-payment cap, and finally
    /// call the gateway and attach its charge session to the placeholder. Race losers discard their placeholder and
    /// poll the winner until its charge session appears.
    pub async fn create_payment(
        &self,
        request: PaymentRequest,
        buyer_id: i64,
    ) -> Result<PaymentResponse, PaymentFlowError> {
        let amount = validated_amount(&request.amount, self.config.max_amount)?;
        let commission = validated_commission(request.commission.as_deref(), self.config.max_amount)?;
        let mut new_tx = NewTransaction::new(buyer_id, request.seller_id, amount)
            .with_commission(commission)
            .with_payment_method(&request.payment_method);
        if let Some(product_id) = request.product_id {
            new_tx = new_tx.for_product(product_id);
        }
        let fingerprint = payment_fingerprint(buyer_id, &new_tx.product_or_topup(), amount);
        trace!("🔄️ Pay request from buyer {buyer_id} maps to fingerprint {fingerprint}");

        if let Some(existing) = self.existing_in_flight(&fingerprint).await? {
            info!("🔄️ Returning in-flight transaction #{} for fingerprint {fingerprint}", existing.id);
            return Ok(PaymentResponse::existing(existing));
        }

        let placeholder = self.db.create_placeholder(new_tx).await?;
        let won = self.locks.try_acquire(&fingerprint, placeholder.id, self.config.lock_ttl).await?;
        if !won {
            return self.observe_winner(&fingerprint, placeholder.id).await;
        }
        debug!("🔄️ Transaction #{} ({}) won the race for {fingerprint}", placeholder.id, placeholder.order_id);

        if let Err(e) = self.guard_placeholder(&placeholder).await {
            self.discard_attempt(placeholder.id, &fingerprint).await;
            return Err(e);
        }

        let charge_request = ChargeRequest {
            order_id: placeholder.order_id.clone(),
            buyer_id,
            amount,
            payment_method: placeholder.payment_method.clone(),
        };
        let session = match self.gateway.create_charge(&charge_request).await {
            Ok(session) => session,
            Err(e) => {
                warn!("🔄️ Gateway charge for order {} failed: {e}", placeholder.order_id);
                self.fail_attempt(placeholder.id, &fingerprint).await;
                return Err(PaymentFlowError::from(e));
            },
        };
        let populated = self.db.attach_charge_session(placeholder.id, &session.token, &session.redirect_url).await?;
        info!("🔄️ Payment {} is live at the gateway for buyer {buyer_id}", populated.order_id);
        Ok(PaymentResponse::fresh(populated))
    }

    /// Read-only lookup of a payment by its external order id.
    pub async fn fetch_payment(&self, order_id: &OrderId) -> Result<Option<Transaction>, PaymentFlowError> {
        let transaction = self.db.fetch_transaction_by_order_id(order_id).await?;
        Ok(transaction)
    }

    /// Best-effort reconciliation sweep for payments whose gateway session went quiet. Returns the transactions that
    /// were moved to expired.
    pub async fn expire_stale_pending(&self, older_than: chrono::Duration) -> Result<Vec<Transaction>, PaymentFlowError> {
        let expired = self.db.expire_stale_pending(older_than).await?;
        Ok(expired)
    }

    /// Resolves the idempotency key to a transaction this request can reuse, clearing keys that point at settled,
    /// failed or missing transactions so the buyer can legitimately purchase again.
    async fn existing_in_flight(&self, fingerprint: &str) -> Result<Option<Transaction>, PaymentFlowError> {
        let Some(holder) = self.locks.get(fingerprint).await? else {
            return Ok(None);
        };
        match self.db.fetch_transaction_by_id(holder).await? {
            Some(tx) if tx.status == TransactionStatus::Pending => Ok(Some(tx)),
            Some(tx) => {
                debug!(
                    "🔄️ Key {fingerprint} points at transaction #{holder} in state {}. Clearing the stale key.",
                    tx.status
                );
                self.locks.release(fingerprint).await?;
                Ok(None)
            },
            None => {
                debug!("🔄️ Key {fingerprint} points at a transaction that no longer exists. Clearing the stale key.");
                self.locks.release(fingerprint).await?;
                Ok(None)
            },
        }
    }

    /// The race loser's path. The losing placeholder is discarded and the winner is polled until its charge session
    /// shows up. A winner that fails, disappears, or takes too long yields [`PaymentFlowError::PaymentInProgress`],
    /// which clients treat as "still processing, try again shortly".
    async fn observe_winner(&self, fingerprint: &str, loser_id: i64) -> Result<PaymentResponse, PaymentFlowError> {
        debug!("🔄️ Transaction #{loser_id} lost the race for {fingerprint}. Discarding it and watching the winner.");
        if let Err(e) = self.db.delete_placeholder(loser_id).await {
            warn!("🔄️ Cleanup could not delete the losing placeholder #{loser_id}: {e}");
        }
        for attempt in 0..self.config.poll_attempts {
            if attempt > 0 {
                sleep(self.config.poll_interval).await;
            }
            let Some(winner_id) = self.locks.get(fingerprint).await? else {
                debug!("🔄️ The key {fingerprint} vanished while waiting on the winner.");
                return Err(PaymentFlowError::PaymentInProgress);
            };
            match self.db.fetch_transaction_by_id(winner_id).await? {
                Some(winner) if winner.metadata.has_charge_session() => {
                    info!("🔄️ Winner #{winner_id} has its charge session. Handing it to the race loser.");
                    return Ok(PaymentResponse::existing(winner));
                },
                Some(winner) if winner.status == TransactionStatus::Failed => {
                    debug!("🔄️ Winner #{winner_id} failed before producing a charge session.");
                    return Err(PaymentFlowError::PaymentInProgress);
                },
                Some(_) => {},
                None => {
                    debug!("🔄️ Winner #{winner_id} no longer exists.");
                    return Err(PaymentFlowError::PaymentInProgress);
                },
            }
        }
        debug!("🔄️ Gave up on the winner of {fingerprint} after {} polls", self.config.poll_attempts);
        Err(PaymentFlowError::PaymentInProgress)
    }

    /// Pre-gateway guards: the risk verdict and the per-buyer pending cap. Either failure means the placeholder never
    /// reaches the gateway.
    async fn guard_placeholder(&self, placeholder: &Transaction) -> Result<(), PaymentFlowError> {
        self.run_risk_checks(placeholder).await?;
        self.db.fetch_or_create_wallet(placeholder.buyer_id).await?;
        let pending = self.db.count_other_pending(placeholder.buyer_id, placeholder.id).await?;
        if pending >= self.config.max_pending_per_buyer {
            info!("🔄️ Buyer {} already has {pending} pending payments. Refusing another.", placeholder.buyer_id);
            return Err(PaymentFlowError::TooManyPending);
        }
        Ok(())
    }

    /// A critical verdict blocks the payment. A high verdict with the manual-review flag proceeds, with alerts pushed
    /// to subscribers. A risk service outage proceeds with a medium verdict and an alert so operators can follow up.
    async fn run_risk_checks(&self, placeholder: &Transaction) -> Result<(), PaymentFlowError> {
        let report = match self.risk.assess(placeholder.buyer_id, placeholder.product_id, placeholder.amount).await {
            Ok(report) => report,
            Err(e) => {
                warn!("🚨️ Risk service gave no verdict for order {}: {e}. Proceeding.", placeholder.order_id);
                let report = RiskReport {
                    level: RiskLevel::Medium,
                    manual_review: false,
                    alerts: vec![format!("risk service unavailable: {e}")],
                };
                self.publish_risk_alerts(placeholder, report, false).await;
                return Ok(());
            },
        };
        if report.is_blocking() {
            warn!("🚨️ Critical risk verdict for order {}. Blocking the payment.", placeholder.order_id);
            self.publish_risk_alerts(placeholder, report, true).await;
            return Err(PaymentFlowError::TransactionBlocked);
        }
        if report.needs_review() {
            info!("🚨️ Order {} is flagged for manual review. Proceeding with alerts.", placeholder.order_id);
            self.publish_risk_alerts(placeholder, report, false).await;
        }
        Ok(())
    }

    async fn publish_risk_alerts(&self, transaction: &Transaction, report: RiskReport, blocked: bool) {
        for producer in &self.producers.risk_alert_producer {
            let event = RiskAlertEvent::new(transaction.buyer_id, transaction.order_id.clone(), report.clone(), blocked);
            producer.publish_event(event).await;
        }
    }

    /// Removes a placeholder that never reached the gateway, along with its lock. Failures here are logged and
    /// swallowed so they never mask the error that triggered the cleanup.
    async fn discard_attempt(&self, id: i64, fingerprint: &str) {
        if let Err(e) = self.db.delete_placeholder(id).await {
            warn!("🔄️ Cleanup could not delete placeholder #{id}: {e}");
        }
        if let Err(e) = self.locks.release(fingerprint).await {
            warn!("🔄️ Cleanup could not release the idempotency key {fingerprint}: {e}");
        }
    }

    /// Marks a gateway-rejected attempt failed and releases its lock so the buyer can retry cleanly. Like
    /// [`Self::discard_attempt`], cleanup failures are logged rather than propagated.
    async fn fail_attempt(&self, id: i64, fingerprint: &str) {
        if let Err(e) = self.db.mark_transaction_failed(id).await {
            warn!("🔄️ Cleanup could not mark transaction #{id} as failed: {e}");
        }
        if let Err(e) = self.locks.release(fingerprint).await {
            warn!("🔄️ Cleanup could not release the idempotency key {fingerprint}: {e}");
        }
    }
}

fn validated_amount(raw: &str, max: Money) -> Result<Money, PaymentFlowError> {
    let amount = raw.parse::<Money>().map_err(|e| PaymentFlowError::InvalidAmount(e.to_string()))?;
    if !amount.is_positive() {
        return Err(PaymentFlowError::InvalidAmount(format!("amount must be positive, got {amount}")));
    }
    if amount > max {
        return Err(PaymentFlowError::InvalidAmount(format!("amount {amount} exceeds the maximum of {max}")));
    }
    Ok(amount)
}

fn validated_commission(raw: Option<&str>, max: Money) -> Result<Money, PaymentFlowError> {
    let Some(raw) = raw else {
        return Ok(Money::default());
    };
    let commission = raw.parse::<Money>().map_err(|e| PaymentFlowError::InvalidAmount(e.to_string()))?;
    if commission.is_negative() {
        return Err(PaymentFlowError::InvalidAmount(format!("commission must not be negative, got {commission}")));
    }
    if commission > max {
        return Err(PaymentFlowError::InvalidAmount(format!("commission {commission} exceeds the maximum of {max}")));
    }
    Ok(commission)
}
