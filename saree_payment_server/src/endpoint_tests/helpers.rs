use saree_payment_engine::{
    db_types::{NewLineItem, NewOrder, Order, OrderId},
    events::EventProducers,
    test_utils::{prepare_test_env, TestDatabase},
    ReconciliationApi,
    SqliteDatabase,
};
use spg_common::Rupees;

use crate::config::ServerConfig;

pub struct TestContext {
    pub db: TestDatabase,
    pub api: ReconciliationApi<SqliteDatabase>,
    pub config: ServerConfig,
}

/// A migrated temp-dir database, an api handle over it, and a default config with HMAC checks
/// switched off. Tests that exercise the signature middleware build their own config.
pub async fn new_test_context() -> TestContext {
    let db = prepare_test_env().await;
    let api = ReconciliationApi::new(db.db.clone(), EventProducers::default());
    let mut config = ServerConfig::default();
    config.webhook_auth.hmac_checks = false;
    TestContext { db, api, config }
}

impl TestContext {
    /// Seeds a product with stock and a pending order for two of them.
    pub async fn seed_order(&self, order_id: &str, product_id: &str, stock: i64) -> Order {
        self.db.db.upsert_product(product_id, Some("Kanjivaram silk"), stock).await.expect("Error seeding product");
        let order = NewOrder::new(OrderId::from(order_id.to_string()), "cust-1".to_string(), Rupees::from(450_000))
            .with_item(NewLineItem::new(product_id, 2));
        self.api.process_new_order(order).await.expect("Error seeding order")
    }
}
