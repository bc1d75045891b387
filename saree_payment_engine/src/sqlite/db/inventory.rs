use log::{debug, warn};
use sqlx::SqliteConnection;

use crate::db_types::OrderId;

/// Claims the decrement for this order in the adjustment ledger. The primary key on
/// `order_id` makes the claim idempotent; returns true only for the call that inserted the
/// row.
pub async fn claim_adjustment(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("INSERT OR IGNORE INTO inventory_adjustments (order_id) VALUES ($1)")
        .bind(order_id.as_str())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Applies the stock decrement for every line item on the order. Stock is clamped at zero; an
/// item that would go negative is logged as oversold.
pub async fn decrement_stock_for_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    let oversold: Vec<(String, i64)> = sqlx::query_as(
        r#"
            SELECT p.id, p.stock_quantity - oi.quantity
            FROM order_items oi JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = $1 AND p.stock_quantity < oi.quantity
        "#,
    )
    .bind(order_id.as_str())
    .fetch_all(&mut *conn)
    .await?;
    for (product_id, shortfall) in &oversold {
        warn!("🧵️ Product {product_id} oversold on order [{order_id}] (would be {shortfall}). Clamping at zero.");
    }
    let result = sqlx::query(
        r#"
            UPDATE products SET stock_quantity = MAX(0, stock_quantity - (
                SELECT oi.quantity FROM order_items oi
                WHERE oi.order_id = $1 AND oi.product_id = products.id
            ))
            WHERE id IN (SELECT product_id FROM order_items WHERE order_id = $1)
        "#,
    )
    .bind(order_id.as_str())
    .execute(&mut *conn)
    .await?;
    debug!("🧵️ Stock adjusted for {} product(s) on order [{order_id}]", result.rows_affected());
    Ok(())
}

pub async fn stock_level(product_id: &str, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    let level: Option<(i64,)> =
        sqlx::query_as("SELECT stock_quantity FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?;
    Ok(level.map(|(q,)| q))
}

/// Seeds or replaces a product row. Used by order intake and the test helpers.
pub async fn upsert_product(
    product_id: &str,
    title: Option<&str>,
    stock_quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO products (id, title, stock_quantity) VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET title = COALESCE(excluded.title, title),
                stock_quantity = excluded.stock_quantity
        "#,
    )
    .bind(product_id)
    .bind(title)
    .bind(stock_quantity)
    .execute(conn)
    .await?;
    Ok(())
}
