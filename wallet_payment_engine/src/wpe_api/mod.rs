//! # Wallet payment engine public API
//!
//! The `wpe_api` module exposes the programmatic API for the wallet payment engine.
//! The API is modular, so that clients can pick and choose the functionality they want, and the pieces can run on
//! different machines as long as they share the same backend stores.
//!
//! * [`payment_flow_api`] is the primary API for handling pay requests. It owns the idempotency machinery that keeps
//!   duplicate and concurrent requests down to a single gateway charge.
//! * [`webhook_api`] reconciles asynchronous gateway callbacks against the ledger, crediting wallets exactly once.
//! * [`wallet_api`] provides methods for reading wallet balances and ledgers and applying manual adjustments.
//!
//! The other submodules in this module are support and utility functions and types.
//!
//! # API usage
//!
//! The pattern for using all the APIs is the same. An API instance is created by supplying a database backend that
//! implements the specific backend traits required by the API.
//!
//! For example, to read a wallet balance from the database:
//!
//! ```rust,ignore
//! use wallet_payment_engine::{SqliteDatabase, WalletApi};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements WalletManagement
//! let api = WalletApi::new(db);
//! let wallet = api.balance(buyer_id).await?;
//! ```

pub mod errors;
pub mod flow_objects;
pub mod payment_flow_api;
pub mod wallet_api;

pub mod webhook_api;
