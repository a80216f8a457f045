use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use chrono::Utc;
use serde_json::{json, Value};
use wallet_payment_engine::{
    db_types::{Wallet, WalletEntry, WalletEntryType},
    WalletApi,
};
use wps_common::Money;

use super::mocks::MockBackend;
use crate::routes::{WalletBalanceRoute, WalletHistoryRoute};

#[actix_web::test]
async fn balance_read_creates_the_wallet_on_first_touch() {
    let _ = env_logger::try_init();
    let mut db = MockBackend::new();
    db.expect_fetch_or_create_wallet()
        .withf(|id| *id == 7)
        .returning(|id| Ok(Wallet { user_id: id, balance: Money::from_whole(150_000), created_at: Utc::now(), updated_at: Utc::now() }));
    let api = WalletApi::new(db);
    let app = App::new().app_data(web::Data::new(api)).service(WalletBalanceRoute::<MockBackend>::new());
    let service = test::init_service(app).await;
    let req = TestRequest::get().uri("/wallet/7/balance").to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["user_id"], json!(7));
    assert_eq!(body["balance"], json!("150000.00"));
}

#[actix_web::test]
async fn history_returns_the_ledger_entries() {
    let _ = env_logger::try_init();
    let mut db = MockBackend::new();
    db.expect_fetch_wallet_entries().returning(|id| {
        Ok(vec![WalletEntry {
            id: 1,
            user_id: id,
            amount: Money::from_whole(150_000),
            entry_type: WalletEntryType::Deposit,
            status: "completed".to_string(),
            description: "Gateway deposit for order wps-1".to_string(),
            transaction_id: Some(1),
            webhook_verified: true,
            created_at: Utc::now(),
        }])
    });
    let api = WalletApi::new(db);
    let app = App::new().app_data(web::Data::new(api)).service(WalletHistoryRoute::<MockBackend>::new());
    let service = test::init_service(app).await;
    let req = TestRequest::get().uri("/wallet/7/history").to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body[0]["entry_type"], json!("deposit"));
    assert_eq!(body[0]["amount"], json!("150000.00"));
    assert_eq!(body[0]["webhook_verified"], json!(true));
}
