use std::env;

use chrono::Duration;
use log::*;
use wallet_payment_engine::PaymentFlowConfig;
use wps_common::{Money, Secret};

const DEFAULT_WPS_HOST: &str = "127.0.0.1";
const DEFAULT_WPS_PORT: u16 = 4360;
const DEFAULT_GATEWAY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
const DEFAULT_PENDING_TIMEOUT: Duration = Duration::hours(24);
const DEFAULT_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Outbound charge API configuration, including the server key that also verifies webhook signatures.
    pub gateway: GatewayConfig,
    /// Tunables for the payment creation flow: lock TTL, race-loser polling, pending cap and amount ceiling.
    pub flow: PaymentFlowConfig,
    /// Thresholds for the bundled static risk policy.
    pub risk: RiskPolicyConfig,
    /// The time before a pending payment with no gateway outcome is marked as expired.
    pub pending_timeout: Duration,
    /// How often the expiry worker sweeps for stale pending payments.
    pub sweep_interval: std::time::Duration,
}

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Base URL of the gateway's charge API, e.g. "https://api.gateway.example/v2"
    pub base_url: String,
    /// Shared with the gateway. Authenticates our charge requests and signs their webhook callbacks.
    pub server_key: Secret<String>,
    pub timeout: std::time::Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { base_url: String::default(), server_key: Secret::default(), timeout: DEFAULT_GATEWAY_TIMEOUT }
    }
}

/// Thresholds for the config-driven default risk policy. Real deployments can swap in their own
/// [`RiskAssessment`](wallet_payment_engine::traits::RiskAssessment) implementation; these settings only drive the
/// bundled one.
#[derive(Clone, Copy, Debug)]
pub struct RiskPolicyConfig {
    /// Payments above this amount proceed, but are flagged for manual review.
    pub review_above: Money,
    /// Payments above this amount are blocked outright.
    pub block_above: Money,
}

impl Default for RiskPolicyConfig {
    fn default() -> Self {
        Self { review_above: Money::from_whole(10_000_000), block_above: Money::from_whole(50_000_000) }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_WPS_HOST.to_string(),
            port: DEFAULT_WPS_PORT,
            database_url: String::default(),
            gateway: GatewayConfig::default(),
            flow: PaymentFlowConfig::default(),
            risk: RiskPolicyConfig::default(),
            pending_timeout: DEFAULT_PENDING_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("WPS_HOST").ok().unwrap_or_else(|| DEFAULT_WPS_HOST.into());
        let port = env::var("WPS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for WPS_PORT. {e} Using the default, {DEFAULT_WPS_PORT}, instead."
                    );
                    DEFAULT_WPS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_WPS_PORT);
        let database_url = env::var("WPS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ WPS_DATABASE_URL is not set. Please set it to the URL for the settlement database.");
            String::default()
        });
        let gateway = GatewayConfig::from_env_or_default();
        let flow = flow_config_from_env();
        let risk = RiskPolicyConfig::from_env_or_default();
        let pending_timeout = env_duration_hours("WPS_PENDING_TIMEOUT", DEFAULT_PENDING_TIMEOUT);
        let sweep_interval = env::var("WPS_SWEEP_INTERVAL")
            .ok()
            .and_then(|s| parse_or_log::<u64>("WPS_SWEEP_INTERVAL", &s))
            .map(std::time::Duration::from_secs)
            .unwrap_or(DEFAULT_SWEEP_INTERVAL);
        Self { host, port, database_url, gateway, flow, risk, pending_timeout, sweep_interval }
    }
}

impl GatewayConfig {
    pub fn from_env_or_default() -> Self {
        let base_url = env::var("WPS_GATEWAY_URL").ok().unwrap_or_else(|| {
            error!("🪛️ WPS_GATEWAY_URL is not set. Please set it to the base URL of the payment gateway.");
            String::default()
        });
        let server_key = env::var("WPS_GATEWAY_SERVER_KEY").ok().unwrap_or_else(|| {
            error!(
                "🪛️ WPS_GATEWAY_SERVER_KEY is not set. Charge requests will not authenticate and incoming webhooks \
                 will fail signature verification."
            );
            String::default()
        });
        let timeout = env::var("WPS_GATEWAY_TIMEOUT")
            .ok()
            .and_then(|s| parse_or_log::<u64>("WPS_GATEWAY_TIMEOUT", &s))
            .map(std::time::Duration::from_secs)
            .unwrap_or(DEFAULT_GATEWAY_TIMEOUT);
        Self { base_url, server_key: Secret::new(server_key), timeout }
    }
}

impl RiskPolicyConfig {
    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let review_above = env_money("WPS_RISK_REVIEW_AMOUNT", defaults.review_above);
        let block_above = env_money("WPS_RISK_BLOCK_AMOUNT", defaults.block_above);
        if block_above < review_above {
            warn!(
                "🪛️ WPS_RISK_BLOCK_AMOUNT ({block_above}) is below WPS_RISK_REVIEW_AMOUNT ({review_above}). Every \
                 flagged payment will be blocked."
            );
        }
        Self { review_above, block_above }
    }
}

fn flow_config_from_env() -> PaymentFlowConfig {
    let defaults = PaymentFlowConfig::default();
    let lock_ttl = env_duration_secs("WPS_LOCK_TTL", defaults.lock_ttl);
    let poll_attempts = env::var("WPS_POLL_ATTEMPTS")
        .ok()
        .and_then(|s| parse_or_log::<u32>("WPS_POLL_ATTEMPTS", &s))
        .unwrap_or(defaults.poll_attempts);
    let poll_interval = env::var("WPS_POLL_INTERVAL_MS")
        .ok()
        .and_then(|s| parse_or_log::<u64>("WPS_POLL_INTERVAL_MS", &s))
        .map(std::time::Duration::from_millis)
        .unwrap_or(defaults.poll_interval);
    let max_pending_per_buyer = env::var("WPS_MAX_PENDING")
        .ok()
        .and_then(|s| parse_or_log::<u32>("WPS_MAX_PENDING", &s))
        .unwrap_or(defaults.max_pending_per_buyer);
    let max_amount = env_money("WPS_MAX_AMOUNT", defaults.max_amount);
    PaymentFlowConfig { lock_ttl, poll_attempts, poll_interval, max_pending_per_buyer, max_amount }
}

fn parse_or_log<T: std::str::FromStr>(name: &str, s: &str) -> Option<T>
where T::Err: std::fmt::Display {
    match s.parse::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default instead.");
            None
        },
    }
}

fn env_money(name: &str, default: Money) -> Money {
    env::var(name).ok().and_then(|s| parse_or_log::<Money>(name, &s)).unwrap_or(default)
}

fn env_duration_secs(name: &str, default: Duration) -> Duration {
    env::var(name).ok().and_then(|s| parse_or_log::<i64>(name, &s)).map(Duration::seconds).unwrap_or(default)
}

fn env_duration_hours(name: &str, default: Duration) -> Duration {
    env::var(name).ok().and_then(|s| parse_or_log::<i64>(name, &s)).map(Duration::hours).unwrap_or(default)
}
