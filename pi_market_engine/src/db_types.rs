use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use pmg_common::MicroPi;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------      PaymentId       --------------------------------------------------------
/// The payment identifier issued by the payment platform.
///
/// The platform is the sole issuer of these identifiers; the gateway never mints them. At most one order can ever
/// be bound to a given `PaymentId`, and the binding is immutable once made.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct PaymentId(pub String);

impl<S: Into<String>> From<S> for PaymentId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PaymentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------       OrderId        --------------------------------------------------------
/// The ledger-assigned order identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl From<i64> for OrderId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------      ProductId       --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl<S: Into<String>> From<S> for ProductId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType    --------------------------------------------------------
/// The closed set of order states.
///
/// `PendingPayment` is the only non-terminal state. An order leaves it exactly once: to `Paid` via the completion
/// path (which also records the chain `txid` and decrements stock), or to `Cancelled`. There is deliberately no
/// way to represent "cancelled and paid" at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order exists and settlement has not been observed yet.
    PendingPayment,
    /// Settlement was observed on-chain and stock has been decremented. Terminal.
    Paid,
    /// The payment was abandoned or rejected before settlement. Terminal.
    Cancelled,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::PendingPayment => write!(f, "PendingPayment"),
            OrderStatusType::Paid => write!(f, "Paid"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PendingPayment" => Ok(Self::PendingPayment),
            "Paid" => Ok(Self::Paid),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to PendingPayment");
            OrderStatusType::PendingPayment
        })
    }
}

//--------------------------------------        Order         --------------------------------------------------------
/// An order row in the ledger.
///
/// Invariants, maintained by the reconciliation engine and the store's conditional updates:
/// * `txid` is `Some` if and only if `status` is `Paid` via the completion path.
/// * `payment_id` is immutable once assigned.
/// * `total_price` is frozen at order-creation time and never recomputed from current product prices.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub payment_id: Option<PaymentId>,
    pub user_id: String,
    pub total_price: MicroPi,
    pub txid: Option<String>,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder       --------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// The user the order belongs to.
    pub user_id: String,
    /// The platform payment id, when the order is being created in response to a platform payment. Checkout-created
    /// orders start without one.
    pub payment_id: Option<PaymentId>,
    /// The total price of the order, frozen at creation time.
    pub total_price: MicroPi,
}

impl NewOrder {
    pub fn new<S: Into<String>>(user_id: S, total_price: MicroPi) -> Self {
        Self { user_id: user_id.into(), payment_id: None, total_price }
    }

    pub fn with_payment_id(mut self, payment_id: PaymentId) -> Self {
        self.payment_id = Some(payment_id);
        self
    }
}

//--------------------------------------      OrderItem       --------------------------------------------------------
/// A line item of an order. `unit_price` is the price snapshot taken when the order was created.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: MicroPi,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: MicroPi,
}

impl NewOrderItem {
    pub fn new(product_id: ProductId, quantity: i64, unit_price: MicroPi) -> Self {
        Self { product_id, quantity, unit_price }
    }

    pub fn line_total(&self) -> MicroPi {
        self.unit_price * self.quantity
    }
}

//--------------------------------------       Product        --------------------------------------------------------
/// The stock-relevant subset of a product record.
///
/// `available_stock` only ever decreases as a side effect of an order transitioning into `Paid`, and the store
/// guarantees it never goes below zero. An attempted decrement below zero is a reconciliation failure, not a
/// silent clamp.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: MicroPi,
    pub available_stock: i64,
}

impl Product {
    pub fn new<S: Into<ProductId>, N: Into<String>>(id: S, name: N, price: MicroPi, available_stock: i64) -> Self {
        Self { id: id.into(), name: name.into(), price, available_stock }
    }
}

//--------------------------------------      CartItem        --------------------------------------------------------
/// A single cart line: (user, product) → quantity. The cart is fully consumed by a successful checkout.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CartItem {
    pub user_id: String,
    pub product_id: ProductId,
    pub quantity: i64,
}
