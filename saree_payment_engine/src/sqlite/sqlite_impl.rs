//! `SqliteDatabase` is the concrete SQLite backend of the reconciliation engine.
//!
//! It implements [`ReconciliationDatabase`] and [`InventoryManagement`]. SQLite serializes
//! writers, so wrapping each settlement in a single transaction gives the atomicity the
//! traits demand without any further locking.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{inventory, orders};
use crate::{
    db_types::{LineItem, NewOrder, Order, OrderId, PaymentStatusType},
    reconciliation::{plan_transition, TransitionPlan},
    traits::{
        InventoryManagement,
        PaymentGatewayError,
        ReconciliationDatabase,
        Settlement,
        SettlementDisposition,
        SettlementOutcome,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database at `url` and runs any outstanding migrations.
    pub async fn new(url: &str, max_connections: u32) -> Result<Self, PaymentGatewayError> {
        let pool = super::db::new_pool(url, max_connections).await?;
        super::db::run_migrations(&pool).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Seeds or replaces a product row with the given stock level.
    pub async fn upsert_product(
        &self,
        product_id: &str,
        title: Option<&str>,
        stock_quantity: i64,
    ) -> Result<(), PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        inventory::upsert_product(product_id, title, stock_quantity, &mut conn).await?;
        Ok(())
    }
}

impl ReconciliationDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let (order, inserted) = orders::idempotent_insert(order, &mut *tx).await?;
        tx.commit().await?;
        Ok((order, inserted))
    }

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_line_items(&self, order_id: &OrderId) -> Result<Vec<LineItem>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_line_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn settle_order(&self, settlement: Settlement) -> Result<SettlementOutcome, PaymentGatewayError> {
        let order_id = settlement.payment.order_id.clone();
        let mut tx = self.pool.begin().await?;
        // Plan from the only state a write is legal from. The compare-and-set below re-checks
        // the actual state, so the transaction starts with the write instead of a read. A
        // read-then-upgrade transaction can abort under concurrent settlers; this cannot.
        let plan = plan_transition(PaymentStatusType::Pending, settlement.payment.outcome);
        let outcome = match plan {
            TransitionPlan::Apply { status, payment_status, adjust_inventory } => {
                let updated = orders::apply_transition(
                    &order_id,
                    status,
                    payment_status,
                    adjust_inventory,
                    settlement.payment.transaction_id.as_deref(),
                    settlement.raw_payload.as_deref(),
                    &mut *tx,
                )
                .await?;
                match updated {
                    Some(order) => {
                        debug!("🗃️ Order [{order_id}] written as ({status}, {payment_status})");
                        SettlementOutcome {
                            order,
                            disposition: SettlementDisposition::Transitioned { inventory_due: adjust_inventory },
                        }
                    },
                    // The guard failed: the order is already settled, or does not exist.
                    // Classify against the recorded state.
                    None => {
                        let order = orders::fetch_order_by_order_id(&order_id, &mut *tx)
                            .await?
                            .ok_or_else(|| PaymentGatewayError::OrderNotFound(order_id.clone()))?;
                        match plan_transition(order.payment_status, settlement.payment.outcome) {
                            TransitionPlan::Duplicate => {
                                // a duplicate writes no statuses, but its payload and txid
                                // still belong in the audit trail
                                if let Some(txid) = settlement.payment.transaction_id.as_deref() {
                                    orders::record_transaction_id(&order_id, txid, &mut *tx).await?;
                                }
                                if let Some(raw) = settlement.raw_payload.as_deref() {
                                    orders::record_gateway_response(&order_id, raw, &mut *tx).await?;
                                }
                                let order = orders::fetch_order_by_order_id(&order_id, &mut *tx)
                                    .await?
                                    .ok_or_else(|| PaymentGatewayError::OrderNotFound(order_id.clone()))?;
                                SettlementOutcome { order, disposition: SettlementDisposition::DuplicateTerminal }
                            },
                            TransitionPlan::Conflict { recorded, reported } => {
                                if let Some(raw) = settlement.raw_payload.as_deref() {
                                    // keep the conflicting payload for the post-mortem
                                    orders::record_gateway_response(&order_id, raw, &mut *tx).await?;
                                }
                                SettlementOutcome {
                                    order,
                                    disposition: SettlementDisposition::Conflicting { recorded, reported },
                                }
                            },
                            _ => SettlementOutcome { order, disposition: SettlementDisposition::Ignored },
                        }
                    },
                }
            },
            // A pending report never writes statuses, but a transaction id learned early is
            // worth keeping.
            _ => {
                if let Some(txid) = settlement.payment.transaction_id.as_deref() {
                    orders::record_transaction_id(&order_id, txid, &mut *tx).await?;
                }
                let order = orders::fetch_order_by_order_id(&order_id, &mut *tx)
                    .await?
                    .ok_or_else(|| PaymentGatewayError::OrderNotFound(order_id.clone()))?;
                SettlementOutcome { order, disposition: SettlementDisposition::Ignored }
            },
        };
        tx.commit().await?;
        Ok(outcome)
    }

    async fn record_transaction_id(&self, order_id: &OrderId, txid: &str) -> Result<(), PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        orders::record_transaction_id(order_id, txid, &mut conn).await?;
        Ok(())
    }

    async fn fetch_pending_orders_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_pending_orders_in_range(from, to, &mut conn).await?;
        Ok(orders)
    }

    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn decrement_once(&self, order_id: &OrderId) -> Result<bool, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let claimed = inventory::claim_adjustment(order_id, &mut *tx).await?;
        if claimed {
            inventory::decrement_stock_for_order(order_id, &mut *tx).await?;
        } else {
            trace!("🗃️ Inventory for order [{order_id}] was already adjusted");
        }
        tx.commit().await?;
        Ok(claimed)
    }

    async fn stock_level(&self, product_id: &str) -> Result<Option<i64>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let level = inventory::stock_level(product_id, &mut conn).await?;
        Ok(level)
    }
}
