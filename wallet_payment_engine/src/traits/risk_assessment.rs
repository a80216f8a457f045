use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wps_common::Money;

/// Black-box risk screen consulted before any charge is attempted. The scoring heuristics live elsewhere; the
/// engine only acts on the returned level.
#[allow(async_fn_in_trait)]
pub trait RiskAssessment {
    async fn assess(&self, buyer_id: i64, product_id: Option<i64>, amount: Money) -> Result<RiskReport, RiskError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid risk level: {0}")]
pub struct RiskLevelConversionError(String);

impl FromStr for RiskLevel {
    type Err = RiskLevelConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            s => Err(RiskLevelConversionError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub level: RiskLevel,
    /// Set when the screen wants a human to look at the payment after the fact. Does not block the flow below
    /// `critical`.
    pub manual_review: bool,
    pub alerts: Vec<String>,
}

impl RiskReport {
    pub fn low() -> Self {
        Self { level: RiskLevel::Low, manual_review: false, alerts: Vec::new() }
    }

    /// Critical reports abort the payment before the gateway is called.
    pub fn is_blocking(&self) -> bool {
        self.level == RiskLevel::Critical
    }

    /// High-level reports flagged for review proceed, but alerts are fanned out for asynchronous review.
    pub fn needs_review(&self) -> bool {
        self.level >= RiskLevel::High && self.manual_review
    }
}

#[derive(Debug, Clone, Error)]
pub enum RiskError {
    #[error("Risk service error: {0}")]
    ServiceError(String),
}
