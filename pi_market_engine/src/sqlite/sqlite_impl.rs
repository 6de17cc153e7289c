//! `SqliteDatabase` is a concrete implementation of the gateway's ledger store.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the [`LedgerStore`] trait. All multi-step
//! operations (order insertion, settlement, checkout) run inside a single database transaction, so a failure at
//! any point rolls the whole operation back.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{cart, db_url, new_pool, orders, products};
use crate::{
    db_types::{CartItem, NewOrder, NewOrderItem, Order, OrderId, OrderItem, OrderStatusType, PaymentId, Product, ProductId},
    traits::{LedgerError, LedgerStore},
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
    /// Creates a new database API object against the URL in `PMG_DATABASE_URL`, or the compiled-in default.
    pub async fn new_default(max_connections: u32) -> Result<Self, LedgerError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    /// Creates a new database API object with a connection pool of `max_connections` connections.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, LedgerError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl LedgerStore for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_order_by_id(&self, id: OrderId) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_payment_id(&self, payment_id: &PaymentId) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_payment_id(payment_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn insert_order(&self, order: NewOrder, items: Vec<NewOrderItem>) -> Result<(Order, bool), LedgerError> {
        let mut tx = self.pool.begin().await?;
        let (order, inserted) = orders::idempotent_insert(order, items, &mut tx).await?;
        tx.commit().await?;
        if inserted {
            debug!("🗃️ Order {} has been saved in the DB", order.id);
        }
        Ok((order, inserted))
    }

    async fn attach_payment_id(&self, order_id: OrderId, payment_id: &PaymentId) -> Result<Order, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let updated = orders::attach_payment_id(order_id, payment_id, &mut tx).await?;
        let order = match updated {
            Some(order) => order,
            None => {
                // The conditional write lost. Re-read the row to report why.
                let order = orders::fetch_order_by_id(order_id, &mut tx)
                    .await?
                    .ok_or(LedgerError::OrderNotFound(order_id))?;
                if order.payment_id.as_ref() == Some(payment_id) {
                    // Same binding already in place. Nothing to do.
                    order
                } else if order.payment_id.is_some() {
                    return Err(LedgerError::PaymentIdAlreadySet(order_id));
                } else {
                    return Err(LedgerError::StatusConflict {
                        order_id,
                        expected: OrderStatusType::PendingPayment,
                        actual: order.status,
                    });
                }
            },
        };
        tx.commit().await?;
        debug!("🗃️ Payment {payment_id} bound to order {order_id}");
        Ok(order)
    }

    async fn settle_order(&self, order_id: OrderId, txid: &str) -> Result<Order, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let updated = orders::update_order_status_cas(
            order_id,
            OrderStatusType::PendingPayment,
            OrderStatusType::Paid,
            Some(txid),
            &mut tx,
        )
        .await?;
        let order = match updated {
            Some(order) => order,
            None => {
                let order = orders::fetch_order_by_id(order_id, &mut tx)
                    .await?
                    .ok_or(LedgerError::OrderNotFound(order_id))?;
                return Err(LedgerError::StatusConflict {
                    order_id,
                    expected: OrderStatusType::PendingPayment,
                    actual: order.status,
                });
            },
        };
        let items = orders::fetch_order_items(order_id, &mut tx).await?;
        for item in &items {
            let decremented = products::decrement_stock(&item.product_id, item.quantity, &mut tx).await?;
            if !decremented {
                // Guard failed. The transaction is dropped without committing, so the status change and any
                // earlier decrements are rolled back with it.
                let available = products::fetch_product(&item.product_id, &mut tx)
                    .await?
                    .map(|p| p.available_stock)
                    .unwrap_or_default();
                return Err(LedgerError::StockExhausted {
                    order_id,
                    product_id: item.product_id.clone(),
                    requested: item.quantity,
                    available,
                });
            }
            trace!("🗃️ Stock of {} reduced by {} for order {order_id}", item.product_id, item.quantity);
        }
        tx.commit().await?;
        debug!("🗃️ Order {order_id} settled with txid {txid}. {} stock decrements applied", items.len());
        Ok(order)
    }

    async fn cancel_order(&self, order_id: OrderId) -> Result<Order, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let updated = orders::update_order_status_cas(
            order_id,
            OrderStatusType::PendingPayment,
            OrderStatusType::Cancelled,
            None,
            &mut tx,
        )
        .await?;
        let order = match updated {
            Some(order) => order,
            None => {
                let order = orders::fetch_order_by_id(order_id, &mut tx)
                    .await?
                    .ok_or(LedgerError::OrderNotFound(order_id))?;
                return Err(LedgerError::StatusConflict {
                    order_id,
                    expected: OrderStatusType::PendingPayment,
                    actual: order.status,
                });
            },
        };
        tx.commit().await?;
        debug!("🗃️ Order {order_id} cancelled");
        Ok(order)
    }

    async fn checkout_cart(&self, user_id: &str, order: NewOrder, items: Vec<NewOrderItem>) -> Result<Order, LedgerError> {
        let mut tx = self.pool.begin().await?;
        // Order insert before cart clear: a torn execution may leave an order with the cart intact, never a
        // consumed cart with no order.
        let order = orders::insert_order(order, items, &mut tx).await?;
        let consumed = cart::clear_cart(user_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Checkout for user {user_id}: order {} created, {consumed} cart lines consumed", order.id);
        Ok(order)
    }

    async fn cart_items(&self, user_id: &str) -> Result<Vec<CartItem>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let items = cart::items_for_user(user_id, &mut conn).await?;
        Ok(items)
    }

    async fn upsert_cart_item(&self, user_id: &str, product_id: &ProductId, quantity: i64) -> Result<(), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        cart::upsert_item(user_id, product_id, quantity, &mut conn).await
    }

    async fn fetch_product(&self, product_id: &ProductId) -> Result<Option<Product>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(product_id, &mut conn).await?;
        Ok(product)
    }

    async fn upsert_product(&self, product: Product) -> Result<(), LedgerError> {
        let mut conn = self.pool.acquire().await?;
        products::upsert_product(product, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), LedgerError> {
        self.pool.close().await;
        Ok(())
    }
}
