use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use chrono::Utc;
use serde_json::{json, Value};
use wallet_payment_engine::{
    db_types::Wallet,
    events::EventProducers,
    traits::{ChargeSession, GatewayError, RiskLevel, RiskReport},
    PaymentFlowApi,
    PaymentFlowConfig,
};
use wps_common::Money;

use super::{
    helpers::{pending_tx, with_charge_session},
    mocks::{MockBackend, MockGateway, MockLockStore, MockRiskScreen},
};
use crate::routes::{CreatePaymentRoute, PaymentStatusRoute};

type TestFlowApi = PaymentFlowApi<MockBackend, MockLockStore, MockGateway, MockRiskScreen>;

fn wallet(user_id: i64) -> Wallet {
    Wallet { user_id, balance: Money::default(), created_at: Utc::now(), updated_at: Utc::now() }
}

fn flow_api(db: MockBackend, locks: MockLockStore, gateway: MockGateway, risk: MockRiskScreen) -> web::Data<TestFlowApi> {
    // Short poll budget so race-loser tests stay fast.
    let config = PaymentFlowConfig {
        poll_attempts: 3,
        poll_interval: std::time::Duration::from_millis(1),
        ..Default::default()
    };
    web::Data::new(PaymentFlowApi::new(db, locks, gateway, risk, config, EventProducers::default()))
}

async fn post_payment(api: web::Data<TestFlowApi>, body: Value) -> (StatusCode, Value) {
    let app = App::new()
        .app_data(api)
        .service(CreatePaymentRoute::<MockBackend, MockLockStore, MockGateway, MockRiskScreen>::new());
    let service = test::init_service(app).await;
    let req = TestRequest::post().uri("/payments").set_json(body).to_request();
    let res = test::call_service(&service, req).await;
    let status = res.status();
    let body: Value = test::read_body_json(res).await;
    (status, body)
}

fn pay_request() -> Value {
    json!({"buyer_id": 7, "seller_id": 3, "product_id": 42, "amount": "150000.00"})
}

fn low_risk(risk: &mut MockRiskScreen) {
    risk.expect_assess().returning(|_, _, _| Ok(RiskReport::low()));
}

#[actix_web::test]
async fn invalid_amount_is_rejected_before_any_side_effects() {
    let _ = env_logger::try_init();
    // No expectations anywhere: a single storage, lock or gateway call fails the test.
    let api = flow_api(MockBackend::new(), MockLockStore::new(), MockGateway::new(), MockRiskScreen::new());
    let (status, body) = post_payment(api, json!({"buyer_id": 7, "seller_id": 3, "amount": "12.3.4"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid payment amount"));
}

#[actix_web::test]
async fn duplicate_requests_receive_the_in_flight_transaction() {
    let _ = env_logger::try_init();
    let mut locks = MockLockStore::new();
    locks.expect_get().returning(|_| Ok(Some(1)));
    let mut db = MockBackend::new();
    db.expect_fetch_transaction_by_id().returning(|_| Ok(Some(with_charge_session(pending_tx(1)))));
    let api = flow_api(db, locks, MockGateway::new(), MockRiskScreen::new());
    let (status, body) = post_payment(api, pay_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_existing"], json!(true));
    assert_eq!(body["transaction"]["order_id"], json!("wps-1"));
    assert_eq!(body["charge_token"], json!("tok-1"));
}

#[actix_web::test]
async fn a_fresh_payment_reaches_the_gateway_exactly_once() {
    let _ = env_logger::try_init();
    let mut locks = MockLockStore::new();
    locks.expect_get().returning(|_| Ok(None));
    locks.expect_try_acquire().times(1).returning(|_, _, _| Ok(true));
    let mut db = MockBackend::new();
    db.expect_create_placeholder().times(1).returning(|_| Ok(pending_tx(1)));
    db.expect_fetch_or_create_wallet().returning(|id| Ok(wallet(id)));
    db.expect_count_other_pending().returning(|_, _| Ok(0));
    db.expect_attach_charge_session().returning(|_, _, _| Ok(with_charge_session(pending_tx(1))));
    let mut gateway = MockGateway::new();
    gateway.expect_create_charge().times(1).returning(|req| {
        assert_eq!(req.order_id.as_str(), "wps-1");
        Ok(ChargeSession {
            token: "tok-1".to_string(),
            redirect_url: "https://pay.gateway.example/redirect/tok-1".to_string(),
        })
    });
    let mut risk = MockRiskScreen::new();
    low_risk(&mut risk);
    let api = flow_api(db, locks, gateway, risk);
    let (status, body) = post_payment(api, pay_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_existing"], json!(false));
    assert_eq!(body["charge_token"], json!("tok-1"));
    assert_eq!(body["transaction"]["status"], json!("pending"));
    assert_eq!(body["transaction"]["amount"], json!("150000.00"));
}

#[actix_web::test]
async fn critical_risk_blocks_the_payment_and_cleans_up() {
    let _ = env_logger::try_init();
    let mut locks = MockLockStore::new();
    locks.expect_get().returning(|_| Ok(None));
    locks.expect_try_acquire().returning(|_, _, _| Ok(true));
    locks.expect_release().times(1).returning(|_| Ok(()));
    let mut db = MockBackend::new();
    db.expect_create_placeholder().returning(|_| Ok(pending_tx(1)));
    db.expect_delete_placeholder().times(1).returning(|_| Ok(()));
    let mut risk = MockRiskScreen::new();
    risk.expect_assess().returning(|_, _, _| {
        Ok(RiskReport { level: RiskLevel::Critical, manual_review: false, alerts: vec!["stolen card".into()] })
    });
    // The gateway mock has no expectations: a blocked payment must never produce a charge.
    let api = flow_api(db, locks, MockGateway::new(), risk);
    let (status, body) = post_payment(api, pay_request()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("blocked"));
}

#[actix_web::test]
async fn the_pending_cap_refuses_a_sixth_payment() {
    let _ = env_logger::try_init();
    let mut locks = MockLockStore::new();
    locks.expect_get().returning(|_| Ok(None));
    locks.expect_try_acquire().returning(|_, _, _| Ok(true));
    locks.expect_release().times(1).returning(|_| Ok(()));
    let mut db = MockBackend::new();
    db.expect_create_placeholder().returning(|_| Ok(pending_tx(6)));
    db.expect_fetch_or_create_wallet().returning(|id| Ok(wallet(id)));
    db.expect_count_other_pending().returning(|_, _| Ok(5));
    db.expect_delete_placeholder().times(1).returning(|_| Ok(()));
    let mut risk = MockRiskScreen::new();
    low_risk(&mut risk);
    let api = flow_api(db, locks, MockGateway::new(), risk);
    let (status, _) = post_payment(api, pay_request()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[actix_web::test]
async fn a_gateway_outage_fails_the_attempt_and_releases_the_lock() {
    let _ = env_logger::try_init();
    let mut locks = MockLockStore::new();
    locks.expect_get().returning(|_| Ok(None));
    locks.expect_try_acquire().returning(|_, _, _| Ok(true));
    locks.expect_release().times(1).returning(|_| Ok(()));
    let mut db = MockBackend::new();
    db.expect_create_placeholder().returning(|_| Ok(pending_tx(1)));
    db.expect_fetch_or_create_wallet().returning(|id| Ok(wallet(id)));
    db.expect_count_other_pending().returning(|_, _| Ok(0));
    db.expect_mark_transaction_failed().times(1).returning(|id| {
        let mut tx = pending_tx(id);
        tx.status = wallet_payment_engine::db_types::TransactionStatus::Failed;
        Ok(Some(tx))
    });
    let mut gateway = MockGateway::new();
    gateway.expect_create_charge().returning(|_| Err(GatewayError::Unavailable("503 upstream".into())));
    let mut risk = MockRiskScreen::new();
    low_risk(&mut risk);
    let api = flow_api(db, locks, gateway, risk);
    let (status, _) = post_payment(api, pay_request()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[actix_web::test]
async fn a_race_loser_is_handed_the_winners_transaction() {
    let _ = env_logger::try_init();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut locks = MockLockStore::new();
    // First get() is the duplicate pre-check (no entry yet); later ones are the loser polling the winner.
    locks.expect_get().returning(move |_| {
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(None)
        } else {
            Ok(Some(1))
        }
    });
    locks.expect_try_acquire().returning(|_, _, _| Ok(false));
    let mut db = MockBackend::new();
    db.expect_create_placeholder().returning(|_| Ok(pending_tx(2)));
    db.expect_delete_placeholder().times(1).returning(|_| Ok(()));
    db.expect_fetch_transaction_by_id().returning(|_| Ok(Some(with_charge_session(pending_tx(1)))));
    let api = flow_api(db, locks, MockGateway::new(), MockRiskScreen::new());
    let (status, body) = post_payment(api, pay_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_existing"], json!(true));
    assert_eq!(body["transaction"]["order_id"], json!("wps-1"));
}

#[actix_web::test]
async fn a_stalled_winner_times_out_as_payment_in_progress() {
    let _ = env_logger::try_init();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut locks = MockLockStore::new();
    // The winner holds the key for the whole poll budget but never produces a charge session.
    locks.expect_get().times(4).returning(move |_| {
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(None)
        } else {
            Ok(Some(1))
        }
    });
    locks.expect_try_acquire().returning(|_, _, _| Ok(false));
    let mut db = MockBackend::new();
    db.expect_create_placeholder().returning(|_| Ok(pending_tx(2)));
    db.expect_delete_placeholder().times(1).returning(|_| Ok(()));
    db.expect_fetch_transaction_by_id().times(3).returning(|_| Ok(Some(pending_tx(1))));
    let api = flow_api(db, locks, MockGateway::new(), MockRiskScreen::new());
    let (status, body) = post_payment(api, pay_request()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already being processed"));
}

#[actix_web::test]
async fn payment_status_returns_the_stored_transaction() {
    let _ = env_logger::try_init();
    let mut db = MockBackend::new();
    db.expect_fetch_transaction_by_order_id()
        .withf(|oid| oid.as_str() == "wps-1")
        .returning(|_| Ok(Some(with_charge_session(pending_tx(1)))));
    let api = flow_api(db, MockLockStore::new(), MockGateway::new(), MockRiskScreen::new());
    let app = App::new()
        .app_data(api)
        .service(PaymentStatusRoute::<MockBackend, MockLockStore, MockGateway, MockRiskScreen>::new());
    let service = test::init_service(app).await;
    let req = TestRequest::get().uri("/payments/wps-1").to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["order_id"], json!("wps-1"));
    assert_eq!(body["status"], json!("pending"));
}

#[actix_web::test]
async fn payment_status_for_an_unknown_order_is_404() {
    let _ = env_logger::try_init();
    let mut db = MockBackend::new();
    db.expect_fetch_transaction_by_order_id().returning(|_| Ok(None));
    let api = flow_api(db, MockLockStore::new(), MockGateway::new(), MockRiskScreen::new());
    let app = App::new()
        .app_data(api)
        .service(PaymentStatusRoute::<MockBackend, MockLockStore, MockGateway, MockRiskScreen>::new());
    let service = test::init_service(app).await;
    let req = TestRequest::get().uri("/payments/wps-404").to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
