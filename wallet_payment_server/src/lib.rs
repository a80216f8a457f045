//! # Wallet payment server
//! This module hosts the HTTP surface for the wallet payment engine. It is responsible for:
//! Accepting pay requests from buyers and handing them to the payment flow API.
//! Receiving asynchronous callbacks from the payment gateway and feeding them to the webhook API.
//! Serving read-only status and wallet balance queries.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/payments`: Create a payment, or receive the equivalent in-flight one.
//! * `/api/payments/{order_id}`: Read the current state of a payment.
//! * `/api/callback/gateway`: The webhook route for receiving payment status callbacks from the gateway.
//! * `/api/wallet/{user_id}/balance` and `/api/wallet/{user_id}/history`: Wallet reads.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod integrations;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
