//! Audit sweep worker
//!
//! The last line of defence for orders whose webhook, redirect and poll worker all came up
//! empty. On a fixed interval the sweep fetches every order still pending inside the lookback
//! window and asks each gateway's status API about it, reconciling the first terminal answer.
//! The sweep is idempotent: an order that settled through another channel in the meantime is a
//! duplicate and nothing is written.

use chrono::{Duration, Utc};
use log::*;
use saree_payment_engine::{
    db_types::Order,
    normalizer::normalize,
    traits::{InventoryManagement, PaymentGatewayError, ReconciliationDatabase, Settlement},
    ReconciliationApi,
    SqliteDatabase,
};
use spg_common::Gateway;
use tokio::task::JoinHandle;

use crate::{gateway_clients::GatewayClients, poll_worker::StatusSource};

/// Starts the audit sweep worker. Do not await the returned JoinHandle, as it will run
/// indefinitely.
pub fn start_audit_worker(
    api: ReconciliationApi<SqliteDatabase>,
    clients: GatewayClients,
    sweep_interval: Duration,
    lookback: Duration,
) -> JoinHandle<()> {
    let period = sweep_interval.to_std().unwrap_or(std::time::Duration::from_secs(3600));
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(period);
        info!("🧹️ Audit sweep worker started. Sweeping every {}s.", period.as_secs());
        loop {
            timer.tick().await;
            if let Err(e) = run_audit_sweep(&api, &clients, lookback).await {
                error!("🧹️ Audit sweep failed: {e}");
            }
        }
    })
}

/// One pass of the sweep over every order still pending inside the lookback window.
pub async fn run_audit_sweep<B, S>(
    api: &ReconciliationApi<B>,
    source: &S,
    lookback: Duration,
) -> Result<usize, PaymentGatewayError>
where
    B: ReconciliationDatabase + InventoryManagement,
    S: StatusSource,
{
    let to = Utc::now();
    let from = to - lookback;
    let pending = api.db().fetch_pending_orders_in_range(from, to).await?;
    if pending.is_empty() {
        debug!("🧹️ Audit sweep found no pending orders. Nothing to do.");
        return Ok(0);
    }
    info!("🧹️ Audit sweep found {} pending order(s)", pending.len());
    let mut settled = 0usize;
    for order in &pending {
        if audit_order(api, source, order).await {
            settled += 1;
        }
    }
    info!("🧹️ Audit sweep done. {settled} of {} order(s) settled.", pending.len());
    Ok(settled)
}

/// Asks each gateway about the order, reconciling the first terminal answer. Returns true if
/// the order settled in this pass. Also serves the manual poll trigger.
pub async fn audit_order<B, S>(api: &ReconciliationApi<B>, source: &S, order: &Order) -> bool
where
    B: ReconciliationDatabase + InventoryManagement,
    S: StatusSource,
{
    let order_id = &order.order_id;
    for gateway in Gateway::ALL {
        let payload = match source.poll_status(gateway, order_id.as_str()).await {
            Ok(p) => p,
            Err(e) => {
                trace!("🧹️ {gateway} has no status for order [{order_id}]: {e}");
                continue;
            },
        };
        let normalized = match normalize(gateway, &payload) {
            Ok(n) => n,
            Err(e) => {
                debug!("🧹️ Could not normalize {gateway} status for order [{order_id}]: {e}");
                continue;
            },
        };
        if !normalized.outcome.is_terminal() {
            continue;
        }
        let settlement = Settlement::new(gateway, normalized).with_raw_payload(payload.to_string());
        match api.reconcile(settlement).await {
            Ok(outcome) if outcome.transitioned() => {
                info!("🧹️ Audit sweep settled order [{order_id}] as {} via {gateway}", outcome.order.payment_status);
                return true;
            },
            Ok(_) => return false,
            Err(e) => {
                warn!("🧹️ Reconciling audited status for order [{order_id}] failed: {e}");
            },
        }
    }
    debug!("🧹️ Order [{order_id}] is still pending at every gateway");
    false
}
