use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{LineItem, NewOrder, Order, OrderId, OrderStatusType, PaymentStatusType},
    traits::PaymentGatewayError,
};

/// Inserts the order into the database, returning `false` in the second parameter if the order
/// already exists.
pub async fn idempotent_insert(
    order: NewOrder,
    conn: &mut SqliteConnection,
) -> Result<(Order, bool), PaymentGatewayError> {
    let inserted = match fetch_order_by_order_id(&order.order_id, conn).await? {
        Some(order) => (order, false),
        None => {
            let order = insert_order(order, conn).await?;
            debug!("📝️ Order [{}] inserted with id {}", order.order_id, order.id);
            (order, true)
        },
    };
    Ok(inserted)
}

/// Inserts a new order into the database using the given connection. This is not atomic. You
/// can embed this call inside a transaction if you need to ensure atomicity, and pass
/// `&mut *tx` as the connection argument.
async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, PaymentGatewayError> {
    let inserted: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                customer_id,
                customer_email,
                total_price,
                currency
            ) VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(&order.customer_id)
    .bind(&order.customer_email)
    .bind(order.total_price.value())
    .bind(&order.currency)
    .fetch_one(&mut *conn)
    .await?;
    for item in &order.items {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, color, size, quantity) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(order.order_id.as_str())
        .bind(&item.product_id)
        .bind(&item.color)
        .bind(&item.size)
        .bind(item.quantity)
        .execute(&mut *conn)
        .await?;
    }
    Ok(inserted)
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_line_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<LineItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Executes a planned terminal transition as a compare-and-set: the row is only rewritten if
/// `payment_status` is still `Pending` at write time. When `claim_inventory` is set, the
/// `inventory_adjusted` flag is claimed in the same statement, so a concurrent settler cannot
/// claim it twice. Returns the updated order, or `None` if the guard failed because another
/// writer got there first.
pub async fn apply_transition(
    order_id: &OrderId,
    status: OrderStatusType,
    payment_status: PaymentStatusType,
    claim_inventory: bool,
    transaction_id: Option<&str>,
    raw_payload: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = $2,
                payment_status = $3,
                inventory_adjusted = CASE WHEN $4 THEN 1 ELSE inventory_adjusted END,
                transaction_id = COALESCE($5, transaction_id),
                payment_gateway_response = COALESCE($6, payment_gateway_response),
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1 AND payment_status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .bind(status)
    .bind(payment_status)
    .bind(claim_inventory)
    .bind(transaction_id)
    .bind(raw_payload)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Records the gateway transaction id without touching the statuses. Set-once: an id already
/// on record is left alone.
pub async fn record_transaction_id(
    order_id: &OrderId,
    txid: &str,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE orders SET transaction_id = $2, updated_at = CURRENT_TIMESTAMP WHERE order_id = $1 AND \
         transaction_id IS NULL",
    )
    .bind(order_id.as_str())
    .bind(txid)
    .execute(conn)
    .await?;
    Ok(())
}

/// Stores the raw gateway payload on the order for audit, without touching the statuses.
pub async fn record_gateway_response(
    order_id: &OrderId,
    raw_payload: &str,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET payment_gateway_response = $2, updated_at = CURRENT_TIMESTAMP WHERE order_id = $1")
        .bind(order_id.as_str())
        .bind(raw_payload)
        .execute(conn)
        .await?;
    Ok(())
}

/// Orders still awaiting settlement that were created in the given range, oldest first. Both
/// bounds are inclusive.
pub async fn fetch_pending_orders_in_range(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        "SELECT * FROM orders WHERE payment_status = 'Pending' AND created_at >= $1 AND created_at <= $2 ORDER BY \
         created_at",
    )
    .bind(from)
    .bind(to)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}
