//! Saree Payment Engine
//!
//! The payment engine is the core of the storefront's order and payment-status reconciliation
//! pipeline. It is gateway-agnostic and channel-agnostic: webhooks, redirect callbacks, status
//! polling and the audit sweep all hand their reports to the same API.
//!
//! The library is divided into three main sections:
//! 1. The [`normalizer`], which reduces each gateway's raw status payload to a canonical
//!    outcome and the order id it belongs to. It is the only module that knows the gateways'
//!    field names and status vocabularies.
//! 2. The [`reconciliation`] engine, which applies the settlement state machine atomically
//!    against the order store. Terminal states are idempotent and never regressed, and the
//!    paid transition claims the exactly-once inventory decrement.
//! 3. The storage traits ([`mod@traits`]) and the SQLite backend ([`mod@sqlite`]) that
//!    implements them. You should never need to access the database directly; use
//!    [`ReconciliationApi`] instead. The exception is the data types in [`db_types`], which
//!    are public.
//!
//! The engine also emits events when orders settle. A simple actor framework lets you hook
//! into these (see [`events`]) and send confirmation mails, notify fulfilment, and so on.

pub mod db_types;
pub mod events;
pub mod normalizer;
mod reconciliation;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use reconciliation::{plan_transition, ReconciliationApi, TransitionPlan};
