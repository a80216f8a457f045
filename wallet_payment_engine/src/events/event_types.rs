use chrono::{DateTime, Utc};
use wps_common::Money;

use crate::{
    db_types::{OrderId, Transaction},
    traits::RiskReport,
};

/// Emitted after a settle path actually credited the wallet. Duplicate webhook deliveries never produce one.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSettledEvent {
    pub transaction: Transaction,
    pub credited: Money,
}

impl PaymentSettledEvent {
    pub fn new(transaction: Transaction) -> Self {
        let credited = transaction.amount;
        Self { transaction, credited }
    }
}

/// Emitted for high and critical risk outcomes so reviewers can pick them up asynchronously.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAlertEvent {
    pub buyer_id: i64,
    pub order_id: OrderId,
    pub report: RiskReport,
    /// True when the payment was aborted because the report was critical.
    pub blocked: bool,
    pub raised_at: DateTime<Utc>,
}

impl RiskAlertEvent {
    pub fn new(buyer_id: i64, order_id: OrderId, report: RiskReport, blocked: bool) -> Self {
        Self { buyer_id, order_id, report, blocked, raised_at: Utc::now() }
    }
}
