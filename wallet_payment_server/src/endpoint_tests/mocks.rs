use chrono::Duration;
use mockall::mock;
use wallet_payment_engine::{
    db_types::{NewTransaction, OrderId, Transaction, TransactionStatus, Wallet, WalletEntry, WebhookAuditEntry},
    traits::{
        ChargeRequest,
        ChargeSession,
        GatewayError,
        IdempotencyStore,
        LockStoreError,
        PaymentGateway,
        RiskAssessment,
        RiskError,
        RiskReport,
        SettlementDatabase,
        SettlementError,
        SettlementResult,
        WalletApiError,
        WalletManagement,
    },
};
use wps_common::Money;

mock! {
    pub Backend {}
    impl SettlementDatabase for Backend {
        fn url(&self) -> &str;
        async fn create_placeholder(&self, transaction: NewTransaction) -> Result<Transaction, SettlementError>;
        async fn fetch_transaction_by_id(&self, id: i64) -> Result<Option<Transaction>, SettlementError>;
        async fn fetch_transaction_by_order_id(&self, order_id: &OrderId) -> Result<Option<Transaction>, SettlementError>;
        async fn attach_charge_session(&self, id: i64, token: &str, redirect_url: &str) -> Result<Transaction, SettlementError>;
        async fn mark_transaction_failed(&self, id: i64) -> Result<Option<Transaction>, SettlementError>;
        async fn delete_placeholder(&self, id: i64) -> Result<(), SettlementError>;
        async fn count_other_pending(&self, buyer_id: i64, exclude_id: i64) -> Result<u32, SettlementError>;
        async fn settle_transaction(&self, id: i64, new_status: TransactionStatus, audit: WebhookAuditEntry) -> Result<SettlementResult, SettlementError>;
        async fn expire_stale_pending(&self, older_than: Duration) -> Result<Vec<Transaction>, SettlementError>;
    }
    impl WalletManagement for Backend {
        async fn fetch_or_create_wallet(&self, user_id: i64) -> Result<Wallet, WalletApiError>;
        async fn apply_wallet_delta(&self, user_id: i64, delta: Money) -> Result<(), WalletApiError>;
        async fn fetch_wallet_entries(&self, user_id: i64) -> Result<Vec<WalletEntry>, WalletApiError>;
    }
}

mock! {
    pub LockStore {}
    impl IdempotencyStore for LockStore {
        async fn try_acquire(&self, key: &str, transaction_id: i64, ttl: Duration) -> Result<bool, LockStoreError>;
        async fn get(&self, key: &str) -> Result<Option<i64>, LockStoreError>;
        async fn release(&self, key: &str) -> Result<(), LockStoreError>;
    }
}

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeSession, GatewayError>;
    }
}

mock! {
    pub RiskScreen {}
    impl RiskAssessment for RiskScreen {
        async fn assess(&self, buyer_id: i64, product_id: Option<i64>, amount: Money) -> Result<RiskReport, RiskError>;
    }
}
