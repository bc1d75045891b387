//! Status poll worker
//!
//! Webhooks and redirects are both best-effort channels: either can be dropped by the network
//! or never fired at all. Whenever a payment attempt is opened, a poll worker is spawned that
//! asks the gateway's status API about the order on a fixed interval until the order settles
//! or the poll budget runs out. An order the poller gives up on is picked up later by the
//! audit sweep.

use chrono::{Duration, Utc};
use gateway_tools::GatewayClientError;
use log::*;
use saree_payment_engine::{
    db_types::OrderId,
    normalizer::normalize,
    traits::{InventoryManagement, ReconciliationDatabase, Settlement},
    ReconciliationApi,
    SqliteDatabase,
};
use serde_json::Value;
use spg_common::Gateway;
use tokio::task::JoinHandle;

use crate::gateway_clients::GatewayClients;

/// Where the poller gets status payloads from. In production this is [`GatewayClients`].
#[allow(async_fn_in_trait)]
pub trait StatusSource {
    async fn poll_status(&self, gateway: Gateway, order_id: &str) -> Result<Value, GatewayClientError>;
}

impl StatusSource for GatewayClients {
    async fn poll_status(&self, gateway: Gateway, order_id: &str) -> Result<Value, GatewayClientError> {
        self.query_status(gateway, order_id).await
    }
}

/// Spawns a background task polling the gateway for the order's status. Do not await the
/// returned JoinHandle from a request handler; the worker can run for the full poll budget.
pub fn spawn_poll_worker(
    api: ReconciliationApi<SqliteDatabase>,
    clients: GatewayClients,
    gateway: Gateway,
    order_id: OrderId,
    poll_interval: Duration,
    poll_budget: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        poll_until_settled(&api, &clients, gateway, &order_id, poll_interval, poll_budget).await;
    })
}

/// Polls the gateway until the order reaches a terminal payment status or the budget is spent.
pub async fn poll_until_settled<B, S>(
    api: &ReconciliationApi<B>,
    source: &S,
    gateway: Gateway,
    order_id: &OrderId,
    poll_interval: Duration,
    poll_budget: Duration,
) where
    B: ReconciliationDatabase + InventoryManagement,
    S: StatusSource,
{
    let deadline = Utc::now() + poll_budget;
    let interval = poll_interval.to_std().unwrap_or(std::time::Duration::from_secs(10));
    info!(
        "🕰️ Poll worker started for order [{order_id}] on {gateway}. Interval {}s, budget {}s.",
        poll_interval.num_seconds(),
        poll_budget.num_seconds()
    );
    loop {
        tokio::time::sleep(interval).await;
        if Utc::now() >= deadline {
            info!(
                "🕰️ Poll budget for order [{order_id}] spent without a terminal status. Leaving it \
                 to the audit sweep."
            );
            return;
        }
        match api.fetch_order(order_id).await {
            Ok(Some(order)) if order.payment_status.is_terminal() => {
                debug!("🕰️ Order [{order_id}] is already {}. Poll worker exiting.", order.payment_status);
                return;
            },
            Ok(Some(_)) => {},
            Ok(None) => {
                warn!("🕰️ Order [{order_id}] vanished from the database. Poll worker exiting.");
                return;
            },
            Err(e) => {
                warn!("🕰️ Could not read order [{order_id}]: {e}. Will retry on the next tick.");
                continue;
            },
        }
        let payload = match source.poll_status(gateway, order_id.as_str()).await {
            Ok(p) => p,
            Err(e) => {
                debug!("🕰️ {gateway} status query for order [{order_id}] failed: {e}. Will retry.");
                continue;
            },
        };
        let normalized = match normalize(gateway, &payload) {
            Ok(n) => n,
            Err(e) => {
                warn!("🕰️ Could not normalize {gateway} status response for [{order_id}]: {e}. Payload: {payload}");
                continue;
            },
        };
        if !normalized.outcome.is_terminal() {
            trace!("🕰️ Order [{order_id}] is still pending at {gateway}");
            continue;
        }
        let settlement = Settlement::new(gateway, normalized).with_raw_payload(payload.to_string());
        match api.reconcile(settlement).await {
            Ok(outcome) => {
                info!("🕰️ Poll worker settled order [{order_id}] as {}. Exiting.", outcome.order.payment_status);
                return;
            },
            Err(e) => {
                warn!("🕰️ Reconciling polled status for order [{order_id}] failed: {e}. Will retry.");
            },
        }
    }
}

#[cfg(test)]
mod test {
    use std::{collections::VecDeque, sync::Mutex};

    use saree_payment_engine::{
        db_types::{NewLineItem, NewOrder, PaymentStatusType},
        events::EventProducers,
        test_utils::prepare_test_env,
        traits::InventoryManagement,
    };
    use serde_json::json;
    use spg_common::Rupees;

    use super::*;

    // Hands out one scripted payload per poll, then keeps repeating the last one.
    struct ScriptedSource {
        responses: Mutex<VecDeque<Value>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Value>) -> Self {
            Self { responses: Mutex::new(responses.into_iter().collect()) }
        }
    }

    impl StatusSource for ScriptedSource {
        async fn poll_status(&self, _gateway: Gateway, _order_id: &str) -> Result<Value, GatewayClientError> {
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                Ok(responses.pop_front().unwrap())
            } else {
                responses.front().cloned().ok_or_else(|| GatewayClientError::GatewayUnavailable("no response".into()))
            }
        }
    }

    #[tokio::test]
    async fn poller_settles_the_order_once_the_gateway_reports_paid() {
        let db = prepare_test_env().await;
        db.db.upsert_product("saree-1", None, 5).await.unwrap();
        let api = ReconciliationApi::new(db.db.clone(), EventProducers::default());
        let order = NewOrder::new("SR-P1".parse().unwrap(), "cust-1".to_string(), Rupees::from(250_000))
            .with_item(NewLineItem::new("saree-1", 1));
        api.process_new_order(order).await.unwrap();
        let source = ScriptedSource::new(vec![
            json!({ "merchantOrderId": "SR-P1", "state": "PENDING" }),
            json!({ "merchantOrderId": "SR-P1", "state": "PENDING" }),
            json!({ "merchantOrderId": "SR-P1", "state": "COMPLETED", "transactionId": "P-1" }),
        ]);
        poll_until_settled(
            &api,
            &source,
            Gateway::PhonePe,
            &"SR-P1".parse().unwrap(),
            Duration::milliseconds(5),
            Duration::seconds(60),
        )
        .await;
        let order = api.fetch_order(&"SR-P1".parse().unwrap()).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatusType::Paid);
        assert_eq!(order.transaction_id.as_deref(), Some("P-1"));
        assert_eq!(db.db.stock_level("saree-1").await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn poller_gives_up_when_the_budget_is_spent() {
        let db = prepare_test_env().await;
        let api = ReconciliationApi::new(db.db.clone(), EventProducers::default());
        let order = NewOrder::new("SR-P2".parse().unwrap(), "cust-1".to_string(), Rupees::from(100_000));
        api.process_new_order(order).await.unwrap();
        let source =
            ScriptedSource::new(vec![json!({ "merchantOrderId": "SR-P2", "state": "PENDING" })]);
        poll_until_settled(
            &api,
            &source,
            Gateway::PhonePe,
            &"SR-P2".parse().unwrap(),
            Duration::milliseconds(5),
            Duration::milliseconds(50),
        )
        .await;
        let order = api.fetch_order(&"SR-P2".parse().unwrap()).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatusType::Pending);
    }

    #[tokio::test]
    async fn poller_exits_once_another_channel_settled_the_order() {
        let db = prepare_test_env().await;
        let api = ReconciliationApi::new(db.db.clone(), EventProducers::default());
        let order = NewOrder::new("SR-P3".parse().unwrap(), "cust-1".to_string(), Rupees::from(100_000));
        api.process_new_order(order).await.unwrap();
        // A webhook beat the poller to it.
        let paid = normalize(Gateway::ZohoPay, &json!({ "reference_id": "SR-P3", "status": "captured" })).unwrap();
        api.reconcile(Settlement::new(Gateway::ZohoPay, paid)).await.unwrap();
        // The scripted gateway would report a failure, but the poller must never apply it.
        let source = ScriptedSource::new(vec![json!({ "merchantOrderId": "SR-P3", "state": "FAILED" })]);
        poll_until_settled(
            &api,
            &source,
            Gateway::PhonePe,
            &"SR-P3".parse().unwrap(),
            Duration::milliseconds(5),
            Duration::seconds(60),
        )
        .await;
        let order = api.fetch_order(&"SR-P3".parse().unwrap()).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatusType::Paid);
    }
}
