use thiserror::Error;

use crate::db_types::{CartItem, NewOrder, NewOrderItem, Order, OrderId, OrderItem, OrderStatusType, PaymentId, Product, ProductId};

/// The storage backend for the payment gateway.
///
/// Implementations provide durable storage for orders, line items, product stock counters and carts. The
/// reconciliation engine leans on two properties that every implementation must uphold:
///
/// * **Conditional updates.** Status transitions and stock decrements are compare-and-swap operations: the update
///   applies only if the row is still in the expected state, and the caller is told when it was not. Two racing
///   transitions on the same order can therefore never both win.
/// * **Transition atomicity.** [`LedgerStore::settle_order`] records the status change, the `txid` and *all* stock
///   decrements in a single transaction. Either the full transition is recorded, or none of it is.
#[allow(async_fn_in_trait)]
pub trait LedgerStore: Clone {
    /// The URL of the underlying database.
    fn url(&self) -> &str;

    async fn fetch_order_by_id(&self, id: OrderId) -> Result<Option<Order>, LedgerError>;

    async fn fetch_order_by_payment_id(&self, payment_id: &PaymentId) -> Result<Option<Order>, LedgerError>;

    async fn fetch_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, LedgerError>;

    /// Stores a new order and its line items in a single atomic transaction.
    ///
    /// When the order carries a payment id, the call is idempotent on it: if an order already exists for that
    /// payment id, the existing order is returned and the second element is `false`.
    async fn insert_order(&self, order: NewOrder, items: Vec<NewOrderItem>) -> Result<(Order, bool), LedgerError>;

    /// Binds a platform payment id to an existing order.
    ///
    /// Conditional write: succeeds only while the order is still `PendingPayment` and has no payment id. Fails with
    /// [`LedgerError::PaymentIdAlreadySet`] or [`LedgerError::StatusConflict`] otherwise.
    async fn attach_payment_id(&self, order_id: OrderId, payment_id: &PaymentId) -> Result<Order, LedgerError>;

    /// Marks the order as `Paid`, records the transaction id, and decrements the stock of every line item, all in
    /// one transaction.
    ///
    /// The status change is a compare-and-swap against `PendingPayment`; a CAS miss fails with
    /// [`LedgerError::StatusConflict`]. Each stock decrement is guarded by `available_stock >= quantity`; a guard
    /// miss rolls the entire transition back and fails with [`LedgerError::StockExhausted`].
    async fn settle_order(&self, order_id: OrderId, txid: &str) -> Result<Order, LedgerError>;

    /// Marks the order as `Cancelled`. Compare-and-swap against `PendingPayment`; fails with
    /// [`LedgerError::StatusConflict`] if the order has left that state.
    async fn cancel_order(&self, order_id: OrderId) -> Result<Order, LedgerError>;

    /// Creates the order (with its line items) and consumes the user's cart in a single transaction. The order
    /// insert is ordered before the cart clear, so a torn execution can leave an order without having consumed the
    /// cart, but never the silent reverse.
    async fn checkout_cart(&self, user_id: &str, order: NewOrder, items: Vec<NewOrderItem>) -> Result<Order, LedgerError>;

    async fn cart_items(&self, user_id: &str) -> Result<Vec<CartItem>, LedgerError>;

    /// Sets the quantity of a cart line, creating it if necessary.
    async fn upsert_cart_item(&self, user_id: &str, product_id: &ProductId, quantity: i64) -> Result<(), LedgerError>;

    async fn fetch_product(&self, product_id: &ProductId) -> Result<Option<Product>, LedgerError>;

    async fn upsert_product(&self, product: Product) -> Result<(), LedgerError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), LedgerError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Cannot insert order, since one already exists for payment id {0}")]
    OrderAlreadyExists(PaymentId),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested product {0} does not exist")]
    ProductNotFound(ProductId),
    #[error("Order {order_id} was expected to be {expected} but is {actual}")]
    StatusConflict { order_id: OrderId, expected: OrderStatusType, actual: OrderStatusType },
    #[error("Order {0} already has a payment id bound to it")]
    PaymentIdAlreadySet(OrderId),
    #[error("Stock of product {product_id} cannot cover order {order_id}: {requested} requested, {available} left")]
    StockExhausted { order_id: OrderId, product_id: ProductId, requested: i64, available: i64 },
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}
