#![allow(dead_code)]
//! Shared scaffolding for the engine's integration tests: throwaway databases, a scriptable payment gateway and a
//! scriptable risk service.
use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc,
        RwLock,
    },
};

use log::*;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};
use wallet_payment_engine::{
    events::EventProducers,
    helpers::compute_callback_signature,
    traits::{ChargeRequest, ChargeSession, GatewayError, PaymentGateway, RiskAssessment, RiskError, RiskReport},
    CallbackPayload,
    PaymentFlowApi,
    PaymentFlowConfig,
    SqliteDatabase,
    WalletApi,
    WebhookApi,
};
use wps_common::{Money, Secret};

pub const TEST_SERVER_KEY: &str = "wps-test-server-key";

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    create_database(url).await;
    run_migrations(url).await;
}

pub fn random_db_path() -> String {
    format!("sqlite://{}/wps_test_store_{}.db", std::env::temp_dir().display(), rand::random::<u64>())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    migrate!("./src/sqlite/migrations").run(db.pool()).await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

pub async fn create_database<P: AsRef<Path>>(path: P) {
    let p = path.as_ref().as_os_str().to_str().unwrap();
    if let Err(e) = Sqlite::drop_database(p).await {
        warn!("Error dropping database {p}: {e:?}");
    }
    Sqlite::create_database(p).await.expect("Error creating database");
    info!("Created Sqlite database {p}");
}

//--------------------------------------   Scriptable gateway    -----------------------------------------------------

/// Counts every charge attempt and can be flipped into an outage.
#[derive(Clone, Default)]
pub struct CountingGateway {
    calls: Arc<AtomicU32>,
    failing: Arc<AtomicBool>,
}

impl CountingGateway {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl PaymentGateway for CountingGateway {
    async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeSession, GatewayError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("gateway offline".to_string()));
        }
        Ok(ChargeSession {
            token: format!("tok-{}-{call}", request.order_id),
            redirect_url: format!("https://gateway.test/pay/{}", request.order_id),
        })
    }
}

//--------------------------------------  Scriptable risk service  ---------------------------------------------------

#[derive(Clone)]
pub struct ScriptedRisk {
    verdict: Arc<RwLock<Result<RiskReport, RiskError>>>,
}

impl ScriptedRisk {
    pub fn low() -> Self {
        Self { verdict: Arc::new(RwLock::new(Ok(RiskReport::low()))) }
    }

    pub fn set_verdict(&self, report: RiskReport) {
        *self.verdict.write().unwrap() = Ok(report);
    }

    pub fn set_failing(&self, reason: &str) {
        *self.verdict.write().unwrap() = Err(RiskError::ServiceError(reason.to_string()));
    }
}

impl RiskAssessment for ScriptedRisk {
    async fn assess(&self, _buyer_id: i64, _product_id: Option<i64>, _amount: Money) -> Result<RiskReport, RiskError> {
        self.verdict.read().unwrap().clone()
    }
}

//--------------------------------------       Test rig          -----------------------------------------------------

pub type FlowApi = PaymentFlowApi<SqliteDatabase, SqliteDatabase, CountingGateway, ScriptedRisk>;

pub struct TestRig {
    pub url: String,
    pub db: SqliteDatabase,
    pub gateway: CountingGateway,
    pub risk: ScriptedRisk,
    pub payments: Arc<FlowApi>,
    pub webhooks: Arc<WebhookApi<SqliteDatabase>>,
    pub wallets: WalletApi<SqliteDatabase>,
}

pub async fn setup() -> TestRig {
    setup_with_producers(EventProducers::default()).await
}

pub async fn setup_with_producers(producers: EventProducers) -> TestRig {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 10).await.expect("Error creating database");
    let gateway = CountingGateway::default();
    let risk = ScriptedRisk::low();
    let payments = Arc::new(PaymentFlowApi::new(
        db.clone(),
        db.clone(),
        gateway.clone(),
        risk.clone(),
        fast_config(),
        producers.clone(),
    ));
    let webhooks = Arc::new(WebhookApi::new(db.clone(), Secret::new(TEST_SERVER_KEY.to_string()), producers));
    let wallets = WalletApi::new(db.clone());
    TestRig { url, db, gateway, risk, payments, webhooks, wallets }
}

/// Default config with short poll intervals so race-loser tests finish quickly.
pub fn fast_config() -> PaymentFlowConfig {
    PaymentFlowConfig {
        poll_attempts: 40,
        poll_interval: std::time::Duration::from_millis(25),
        ..PaymentFlowConfig::default()
    }
}

pub async fn tear_down(rig: TestRig) {
    rig.db.pool().close().await;
    if let Err(e) = Sqlite::drop_database(&rig.url).await {
        error!("🚀️ Failed to drop test database {}: {e}", rig.url);
    }
}

/// A correctly signed callback for our test server key. Tests that need a forgery overwrite `signature_key`.
pub fn signed_callback(order_id: &str, transaction_status: &str, gross_amount: &str) -> CallbackPayload {
    let signature_key = compute_callback_signature(order_id, "200", gross_amount, TEST_SERVER_KEY);
    CallbackPayload {
        order_id: order_id.to_string(),
        status_code: "200".to_string(),
        gross_amount: gross_amount.to_string(),
        signature_key,
        transaction_status: transaction_status.to_string(),
        payment_type: "qris".to_string(),
        transaction_id: format!("gw-{order_id}"),
    }
}
