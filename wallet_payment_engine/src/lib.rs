//! Wallet Payment Engine
//!
//! The wallet payment engine turns a buyer's "pay" request into exactly one monetary transaction record, reconciles
//! asynchronous payment-gateway callbacks against that record, and credits the buyer's wallet at most once per
//! completed payment. It holds those guarantees under concurrent requests, client retries, and duplicate or
//! out-of-order webhook delivery. This library contains the core logic and is gateway-provider agnostic.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). You should never need to access the database directly.
//!    Instead, use the public API provided by the engine. The exception is the data types used in the database. These
//!    are defined in the [`mod@db_types`] module and are public. Backends implement the contracts in the
//!    [`mod@traits`] module; `SqliteDatabase` is the bundled implementation and doubles as the default idempotency
//!    lock store. An optional Redis lock store is available behind the `redis_locks` feature for multi-instance
//!    deployments.
//! 2. The payment engine public API (`wpe_api`). This provides the public-facing functionality of the engine: the
//!    payment creation flow, webhook settlement, and wallet reads and adjustments.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted when certain actions
//! occur within the engine, such as a payment settling or a risky payment being flagged. A simple actor framework is
//! used so that you can easily hook into these events and perform custom actions.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;

#[cfg(feature = "redis_locks")]
mod redis_locks;
#[cfg(feature = "sqlite")]
mod sqlite;
mod wpe_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "redis_locks")]
pub use redis_locks::RedisLockStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use wpe_api::{
    errors::{PaymentFlowError, WebhookError},
    flow_objects::{CallbackPayload, PaymentFlowConfig, PaymentRequest, PaymentResponse},
    payment_flow_api::PaymentFlowApi,
    wallet_api::WalletApi,
    webhook_api::WebhookApi,
};
