//! Default implementations of the engine's external collaborators.
//!
//! These exist so the server binary boots against a real gateway with nothing but configuration. Neither is part of
//! the engine's correctness surface; deployments swap in their own [`PaymentGateway`] or [`RiskAssessment`]
//! implementations by wiring a different type into [`create_server_instance`](crate::server::create_server_instance).
//!
//! [`PaymentGateway`]: wallet_payment_engine::traits::PaymentGateway
//! [`RiskAssessment`]: wallet_payment_engine::traits::RiskAssessment
mod gateway;
mod risk;

pub use gateway::GatewayClient;
pub use risk::StaticRiskPolicy;
