//! # Backend interface contracts for the settlement engine.
//!
//! Everything the engine touches that lives outside the process sits behind a trait in this module:
//!
//! * [`SettlementDatabase`] is the durable transaction ledger. It owns placeholder lifecycle, the status-guarded
//!   settle path and the stale-pending sweep. Backends must express the settle path as a single atomic database
//!   transaction; the conditional update is what arbitrates concurrent webhook deliveries.
//! * [`WalletManagement`] covers the wallet side of the same backend: balance reads, ledger entries and the atomic
//!   signed-delta balance update. Balances are never computed in application memory.
//! * [`IdempotencyStore`] is the distributed set-if-absent-with-TTL lock keyed on payment fingerprints. It must be
//!   correct across process boundaries; an in-process mutex is not an implementation.
//! * [`PaymentGateway`] is the outbound charge call, consumed as a black box that either returns a charge session or
//!   fails with a typed error.
//! * [`RiskAssessment`] is the black-box risk screen consulted before a charge is attempted.
mod data_objects;
mod idempotency_store;
mod payment_gateway;
mod risk_assessment;
mod settlement_database;
mod wallet_management;

pub use data_objects::SettlementResult;
pub use idempotency_store::{IdempotencyStore, LockStoreError};
pub use payment_gateway::{ChargeRequest, ChargeSession, GatewayError, PaymentGateway};
pub use risk_assessment::{RiskAssessment, RiskError, RiskLevel, RiskReport};
pub use settlement_database::{SettlementDatabase, SettlementError};
pub use wallet_management::{WalletApiError, WalletManagement};
