//! The reconciliation engine.
//!
//! Payment outcomes arrive over four channels (webhook, redirect callback, status polling and
//! the audit sweep), each with its own delivery guarantees. They all funnel into one place:
//! [`ReconciliationApi::reconcile`], which applies the settlement state machine in
//! [`transition`] atomically against the order store.

mod api;
mod transition;

pub use api::ReconciliationApi;
pub use transition::{plan_transition, TransitionPlan};
