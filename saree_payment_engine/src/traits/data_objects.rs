use serde::{Deserialize, Serialize};
use spg_common::Gateway;

use crate::{
    db_types::{Order, PaymentStatusType},
    normalizer::{NormalizedPayment, PaymentOutcome},
};

/// A settlement instruction handed to the database layer: one normalized gateway report plus
/// the channel metadata worth keeping for audit.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub payment: NormalizedPayment,
    pub gateway: Gateway,
    /// The raw payload as received, stored verbatim on the order for audit.
    pub raw_payload: Option<String>,
}

impl Settlement {
    pub fn new(gateway: Gateway, payment: NormalizedPayment) -> Self {
        Self { payment, gateway, raw_payload: None }
    }

    pub fn with_raw_payload(mut self, raw: impl Into<String>) -> Self {
        self.raw_payload = Some(raw.into());
        self
    }
}

/// How a settlement attempt was resolved against the order's recorded state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementDisposition {
    /// The order moved to a terminal state in this call. `inventory_due` is true when this
    /// call also claimed the stock decrement.
    Transitioned { inventory_due: bool },
    /// The order was already in the reported terminal state. Nothing was written.
    DuplicateTerminal,
    /// The report carried a pending outcome. Nothing was written.
    Ignored,
    /// The report named the opposite terminal state to the one on record. Nothing was
    /// written; the recorded state stands.
    Conflicting { recorded: PaymentStatusType, reported: PaymentOutcome },
}

/// The result of [`ReconciliationDatabase::settle_order`]: the order as it stands after the
/// call, and what the call did.
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    pub order: Order,
    pub disposition: SettlementDisposition,
}

impl SettlementOutcome {
    pub fn transitioned(&self) -> bool {
        matches!(self.disposition, SettlementDisposition::Transitioned { .. })
    }

    pub fn inventory_due(&self) -> bool {
        matches!(self.disposition, SettlementDisposition::Transitioned { inventory_due: true })
    }
}
