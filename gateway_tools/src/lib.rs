//! REST clients for the payment gateways the storefront collects through.
//!
//! Each gateway module wraps one provider's API behind the [`PaymentGatewayClient`] trait:
//! initiating a payment and querying the status of one. The clients return status payloads
//! raw; reducing them to a canonical outcome is the reconciliation engine's job, not ours.

mod config;
mod data_objects;
mod easebuzz;
mod error;
pub mod helpers;
mod phonepe;
mod traits;
mod zohopay;

pub use config::{EasebuzzConfig, GatewayConfig, PhonePeConfig, ZohoPayConfig};
pub use data_objects::{InitiateRequest, InitiateResponse};
pub use easebuzz::EasebuzzApi;
pub use error::GatewayClientError;
pub use phonepe::PhonePeApi;
pub use traits::PaymentGatewayClient;
pub use zohopay::ZohoPayApi;
