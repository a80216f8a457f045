use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use serde_json::{json, Value};
use wallet_payment_engine::{
    db_types::TransactionStatus,
    events::EventProducers,
    traits::SettlementResult,
    WebhookApi,
};
use wps_common::Secret;

use super::{
    helpers::{completed_tx, pending_tx, signed_callback, with_charge_session, TEST_SERVER_KEY},
    mocks::MockBackend,
};
use crate::routes::GatewayCallbackRoute;

async fn post_callback(db: MockBackend, body: Value) -> (StatusCode, Value) {
    let api = WebhookApi::new(db, Secret::new(TEST_SERVER_KEY.to_string()), EventProducers::default());
    let app =
        App::new().app_data(web::Data::new(api)).service(GatewayCallbackRoute::<MockBackend>::new());
    let service = test::init_service(app).await;
    let req = TestRequest::post().uri("/callback/gateway").set_json(body).to_request();
    let res = test::call_service(&service, req).await;
    let status = res.status();
    let body: Value = test::read_body_json(res).await;
    (status, body)
}

#[actix_web::test]
async fn a_forged_signature_is_rejected_without_touching_storage() {
    let _ = env_logger::try_init();
    let mut payload = signed_callback("wps-1", "settlement");
    payload["signature_key"] = json!("ab".repeat(64));
    // The backend mock has no expectations: any read or write fails the test.
    let (status, body) = post_callback(MockBackend::new(), payload).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("signature"));
}

#[actix_web::test]
async fn a_tampered_amount_is_rejected_without_touching_storage() {
    let _ = env_logger::try_init();
    let mut payload = signed_callback("wps-1", "settlement");
    payload["gross_amount"] = json!("999999.00");
    let (status, _) = post_callback(MockBackend::new(), payload).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn a_malformed_payload_is_rejected_as_bad_request() {
    let _ = env_logger::try_init();
    let mut payload = signed_callback("wps-1", "settlement");
    payload["gross_amount"] = json!("");
    let (status, body) = post_callback(MockBackend::new(), payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("gross_amount"));
}

#[actix_web::test]
async fn a_callback_for_an_unknown_order_is_404() {
    let _ = env_logger::try_init();
    let mut db = MockBackend::new();
    db.expect_fetch_transaction_by_order_id().returning(|_| Ok(None));
    let (status, _) = post_callback(db, signed_callback("wps-404", "settlement")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn a_settlement_callback_settles_and_returns_the_completed_transaction() {
    let _ = env_logger::try_init();
    let mut db = MockBackend::new();
    db.expect_fetch_transaction_by_order_id()
        .withf(|oid| oid.as_str() == "wps-1")
        .returning(|_| Ok(Some(with_charge_session(pending_tx(1)))));
    db.expect_settle_transaction()
        .times(1)
        .withf(|id, status, audit| {
            *id == 1 && *status == TransactionStatus::Completed && audit.transaction_status == "settlement"
        })
        .returning(|id, _, _| Ok(SettlementResult::transitioned(completed_tx(id), true)));
    let (status, body) = post_callback(db, signed_callback("wps-1", "settlement")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("completed"));
}

#[actix_web::test]
async fn an_unsupported_status_word_is_rejected_without_mutation() {
    let _ = env_logger::try_init();
    let mut db = MockBackend::new();
    db.expect_fetch_transaction_by_order_id().returning(|_| Ok(Some(with_charge_session(pending_tx(1)))));
    // No settle_transaction expectation: the unsupported word must never reach storage.
    let (status, body) = post_callback(db, signed_callback("wps-1", "chargeback")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("chargeback"));
}

#[actix_web::test]
async fn a_late_failure_callback_never_regresses_a_completed_transaction() {
    let _ = env_logger::try_init();
    let mut db = MockBackend::new();
    db.expect_fetch_transaction_by_order_id().returning(|_| Ok(Some(completed_tx(1))));
    // The regression guard short-circuits before settle_transaction, so the mock expects no write.
    let (status, body) = post_callback(db, signed_callback("wps-1", "deny")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("completed"));
}
