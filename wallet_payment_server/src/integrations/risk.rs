use log::*;
use wallet_payment_engine::traits::{RiskAssessment, RiskError, RiskLevel, RiskReport};
use wps_common::Money;

use crate::config::RiskPolicyConfig;

/// Config-driven default risk screen: a pure amount-threshold policy.
///
/// Anything above the review threshold proceeds flagged for manual review; anything above the block threshold is
/// refused. The real scoring heuristics are an external service in production; this policy keeps the server
/// self-contained while exercising the same `RiskAssessment` seam.
#[derive(Debug, Clone, Copy)]
pub struct StaticRiskPolicy {
    review_above: Money,
    block_above: Money,
}

impl From<RiskPolicyConfig> for StaticRiskPolicy {
    fn from(config: RiskPolicyConfig) -> Self {
        Self { review_above: config.review_above, block_above: config.block_above }
    }
}

impl RiskAssessment for StaticRiskPolicy {
    async fn assess(&self, buyer_id: i64, product_id: Option<i64>, amount: Money) -> Result<RiskReport, RiskError> {
        let product = product_id.map(|id| id.to_string()).unwrap_or_else(|| "topup".to_string());
        if amount > self.block_above {
            debug!("🚨️ Amount {amount} from buyer {buyer_id} for {product} exceeds the block threshold");
            return Ok(RiskReport {
                level: RiskLevel::Critical,
                manual_review: false,
                alerts: vec![format!("amount {amount} exceeds the block threshold of {}", self.block_above)],
            });
        }
        if amount > self.review_above {
            debug!("🚨️ Amount {amount} from buyer {buyer_id} for {product} exceeds the review threshold");
            return Ok(RiskReport {
                level: RiskLevel::High,
                manual_review: true,
                alerts: vec![format!("amount {amount} exceeds the review threshold of {}", self.review_above)],
            });
        }
        Ok(RiskReport::low())
    }
}
