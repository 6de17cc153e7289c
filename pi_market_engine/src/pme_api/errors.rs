use pmg_common::MicroPi;
use thiserror::Error;

use crate::{
    db_types::{OrderId, PaymentId, ProductId},
    traits::{ChainVerifierError, LedgerError, PlatformApiError},
};

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("{0}")]
    Ledger(#[from] LedgerError),
    #[error("Payment platform error. {0}")]
    Platform(#[from] PlatformApiError),
    #[error("Chain verifier error. {0}")]
    Chain(#[from] ChainVerifierError),
    #[error("No order exists for payment id {0}")]
    OrderNotFound(PaymentId),
    #[error("On-chain memo '{memo}' does not match payment id {payment_id}")]
    PaymentMismatch { payment_id: PaymentId, memo: String },
    #[error("Payment {payment_id} already settled with txid {recorded}; refusing to overwrite with {submitted}")]
    TxidConflict { payment_id: PaymentId, recorded: String, submitted: String },
    #[error("Payment {0} belongs to a cancelled order and can no longer settle")]
    OrderCancelled(PaymentId),
    #[error("Payment {0} is already settled and cannot be cancelled")]
    CancelAfterSettlement(PaymentId),
    #[error("Order {0} belongs to a different user")]
    ForeignOrder(OrderId),
    #[error("Platform amount {actual} does not match the frozen order total {expected} for payment {payment_id}")]
    AmountMismatch { payment_id: PaymentId, expected: MicroPi, actual: MicroPi },
    #[error("The payment metadata is unusable. {0}")]
    InvalidMetadata(String),
}

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Ledger(#[from] LedgerError),
    #[error("The cart for user {0} is empty")]
    EmptyCart(String),
    #[error("Product {product_id} has {available} in stock, but the cart wants {requested}")]
    OutOfStock { product_id: ProductId, requested: i64, available: i64 },
    #[error("Product {0} in the cart no longer exists")]
    ProductNotFound(ProductId),
}
