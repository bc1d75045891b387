//! Interface contracts of the reconciliation engine's database backends.
//!
//! The engine never talks to a concrete database directly. Two traits split the storage
//! concerns:
//!
//! * [`ReconciliationDatabase`] owns the order records and executes settlement plans
//!   atomically. It is the only component allowed to write `status` / `payment_status`.
//! * [`InventoryManagement`] owns the stock ledger and guarantees the exactly-once decrement
//!   that the pending -> paid transition demands.
//!
//! A backend implements both; the SQLite backend in [`crate::sqlite`] is the reference
//! implementation.

mod data_objects;
mod inventory_management;
mod reconciliation_database;

pub use data_objects::{Settlement, SettlementDisposition, SettlementOutcome};
pub use inventory_management::InventoryManagement;
pub use reconciliation_database::{PaymentGatewayError, ReconciliationDatabase};
