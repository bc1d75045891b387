use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewOrder, Order, OrderId},
    events::{EventProducers, OrderAnnulledEvent, OrderPaidEvent},
    traits::{
        InventoryManagement,
        PaymentGatewayError,
        ReconciliationDatabase,
        Settlement,
        SettlementDisposition,
        SettlementOutcome,
    },
};

/// `ReconciliationApi` is the primary API for settling orders in response to gateway payment
/// reports, regardless of which channel delivered them.
#[derive(Clone)]
pub struct ReconciliationApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B> ReconciliationApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> ReconciliationApi<B>
where B: ReconciliationDatabase + InventoryManagement
{
    /// Submit a new order to the engine. Both statuses start out `Pending`.
    ///
    /// The call is idempotent: resubmitting an order id that already exists returns the
    /// existing record untouched.
    pub async fn process_new_order(&self, order: NewOrder) -> Result<Order, PaymentGatewayError> {
        let (order, inserted) = self.db.insert_order(order).await?;
        if inserted {
            debug!("🔄️📦️ Order [{}] created with pending statuses", order.order_id);
        } else {
            debug!("🔄️📦️ Order [{}] already exists. Returning the stored record.", order.order_id);
        }
        Ok(order)
    }

    /// Apply a normalized gateway report to the order it names.
    ///
    /// This is the single entry point for every status-arrival channel. The settlement write
    /// is atomic; the inventory decrement runs after it and its failure is logged but never
    /// rolls the settlement back. Returns the settlement outcome so the caller can shape its
    /// channel-appropriate response.
    pub async fn reconcile(&self, settlement: Settlement) -> Result<SettlementOutcome, PaymentGatewayError> {
        let order_id = settlement.payment.order_id.clone();
        let gateway = settlement.gateway;
        let outcome = self.db.settle_order(settlement).await?;
        match outcome.disposition {
            SettlementDisposition::Transitioned { inventory_due } => {
                info!(
                    "🔄️💰️ Order [{order_id}] settled as {} via {gateway}",
                    outcome.order.payment_status
                );
                if inventory_due {
                    self.adjust_inventory(&order_id).await;
                }
                self.fire_settlement_hooks(&outcome.order, gateway).await;
            },
            SettlementDisposition::DuplicateTerminal => {
                debug!(
                    "🔄️💰️ Order [{order_id}] is already {}. Duplicate report from {gateway} acknowledged.",
                    outcome.order.payment_status
                );
            },
            SettlementDisposition::Ignored => {
                trace!("🔄️💰️ Pending report for order [{order_id}] from {gateway} ignored");
            },
            SettlementDisposition::Conflicting { recorded, reported } => {
                warn!(
                    "🔄️💰️ Conflicting report for order [{order_id}]: recorded {recorded}, but {gateway} reports \
                     {reported}. The recorded state stands. This needs a human to look at it."
                );
            },
        }
        Ok(outcome)
    }

    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, PaymentGatewayError> {
        self.db.fetch_order_by_order_id(order_id).await
    }

    // The decrement is deliberately outside the settlement transaction. The flag on the order
    // row has already been claimed, so a crash here leaves a claimed-but-unapplied decrement
    // that the ledger insert will still apply exactly once on any retry path.
    async fn adjust_inventory(&self, order_id: &OrderId) {
        match self.db.decrement_once(order_id).await {
            Ok(true) => debug!("🔄️🧵️ Stock decremented for order [{order_id}]"),
            Ok(false) => debug!("🔄️🧵️ Stock for order [{order_id}] was already decremented"),
            Err(e) => error!("🔄️🧵️ Stock decrement for order [{order_id}] failed: {e}. The order stays paid."),
        }
    }

    async fn fire_settlement_hooks(&self, order: &Order, gateway: spg_common::Gateway) {
        use crate::db_types::PaymentStatusType;
        match order.payment_status {
            PaymentStatusType::Paid => {
                for emitter in &self.producers.order_paid_producer {
                    debug!("🔄️📦️ Notifying order paid hook subscribers");
                    emitter.publish_event(OrderPaidEvent::new(order.clone(), gateway)).await;
                }
            },
            PaymentStatusType::Failed => {
                for emitter in &self.producers.order_annulled_producer {
                    debug!("🔄️📦️ Notifying order annulled hook subscribers");
                    emitter.publish_event(OrderAnnulledEvent::new(order.clone(), gateway)).await;
                }
            },
            PaymentStatusType::Pending => {},
        }
    }
}
