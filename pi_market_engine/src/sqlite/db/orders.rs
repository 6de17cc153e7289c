use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, NewOrderItem, Order, OrderId, OrderItem, OrderStatusType, PaymentId},
    traits::LedgerError,
};

/// Inserts the order and its line items, returning `false` in the second element if an order already existed for
/// the given payment id.
pub async fn idempotent_insert(
    order: NewOrder,
    items: Vec<NewOrderItem>,
    conn: &mut SqliteConnection,
) -> Result<(Order, bool), LedgerError> {
    if let Some(payment_id) = &order.payment_id {
        if let Some(existing) = fetch_order_by_payment_id(payment_id, &mut *conn).await? {
            return Ok((existing, false));
        }
    }
    let order = insert_order(order, items, conn).await?;
    debug!("📝️ Order {} inserted", order.id);
    Ok((order, true))
}

/// Inserts a new order into the database using the given connection. This is not atomic on its own. Embed the call
/// inside a transaction and pass `&mut *tx` as the connection argument to make it so.
pub(crate) async fn insert_order(
    order: NewOrder,
    items: Vec<NewOrderItem>,
    conn: &mut SqliteConnection,
) -> Result<Order, LedgerError> {
    let payment_id = order.payment_id.clone();
    let inserted: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (payment_id, user_id, total_price)
            VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(order.payment_id)
    .bind(order.user_id)
    .bind(order.total_price.value())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match &payment_id {
        Some(pid) => map_unique_violation(e, pid),
        None => LedgerError::from(e),
    })?;
    for item in items {
        sqlx::query("INSERT INTO order_items (order_id, product_id, quantity, unit_price) VALUES ($1, $2, $3, $4)")
            .bind(inserted.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price.value())
            .execute(&mut *conn)
            .await?;
    }
    Ok(inserted)
}

pub async fn fetch_order_by_id(id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_payment_id(
    payment_id: &PaymentId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE payment_id = $1").bind(payment_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items =
        sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC").bind(order_id).fetch_all(conn).await?;
    Ok(items)
}

/// Compare-and-swap status update. The row is updated only while its status still equals `expected`; `None` means
/// the swap lost and nothing was written.
pub(crate) async fn update_order_status_cas(
    id: OrderId,
    expected: OrderStatusType,
    new_status: OrderStatusType,
    txid: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, LedgerError> {
    let result: Option<Order> = match txid {
        Some(txid) => {
            sqlx::query_as(
                "UPDATE orders SET status = $1, txid = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $3 AND status = \
                 $4 RETURNING *",
            )
            .bind(new_status.to_string())
            .bind(txid)
            .bind(id)
            .bind(expected.to_string())
            .fetch_optional(conn)
            .await?
        },
        None => {
            sqlx::query_as(
                "UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status = $3 \
                 RETURNING *",
            )
            .bind(new_status.to_string())
            .bind(id)
            .bind(expected.to_string())
            .fetch_optional(conn)
            .await?
        },
    };
    Ok(result)
}

/// Conditional write binding a payment id to an order: only applies while the order is `PendingPayment` and has no
/// payment id yet. `None` means the condition did not hold.
pub(crate) async fn attach_payment_id(
    id: OrderId,
    payment_id: &PaymentId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, LedgerError> {
    let result = sqlx::query_as(
        "UPDATE orders SET payment_id = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND payment_id IS NULL AND \
         status = 'PendingPayment' RETURNING *",
    )
    .bind(payment_id.as_str())
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(|e| map_unique_violation(e, payment_id))?;
    Ok(result)
}

/// A unique violation on `orders.payment_id` means a racing insert bound this payment first.
fn map_unique_violation(e: sqlx::Error, payment_id: &PaymentId) -> LedgerError {
    let unique = e.as_database_error().map(|db_err| db_err.is_unique_violation()).unwrap_or(false);
    if unique {
        LedgerError::OrderAlreadyExists(payment_id.clone())
    } else {
        LedgerError::from(e)
    }
}
