//! # Saree payment server
//!
//! This module hosts the HTTP surface of the payment reconciliation pipeline. It is
//! responsible for:
//! * Listening for incoming webhook notifications from the payment gateways.
//! * Handling the shopper-facing redirect callbacks the gateways bounce through.
//! * Polling gateway status APIs for orders whose webhooks never arrived.
//! * Running the periodic audit sweep over still-pending orders.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for
//! more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/wh/{gateway}/webhook`: Gateway webhook notifications. Always answered with 200.
//! * `/payment-success`, `/payment-failure`: Redirect callbacks (GET and POST).
//! * `/api/payments/{gateway}/initiate`: Creates the order and opens a payment attempt.
//! * `/api/orders/{order_id}/status`: The storefront's status poll.

pub mod audit_worker;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod gateway_clients;
pub mod gateway_routes;
pub mod helpers;
pub mod middleware;
pub mod poll_worker;
pub mod redirect_routes;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
