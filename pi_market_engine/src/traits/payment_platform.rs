use pmg_common::MicroPi;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{OrderId, PaymentId, ProductId};

/// A payment as reported by the payment platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformPayment {
    pub payment_id: PaymentId,
    /// The payment amount, converted to micro-Pi at the boundary.
    pub amount: MicroPi,
    pub metadata: PaymentMetadata,
    /// The settling transaction id, if the platform has already observed one.
    pub txid: Option<String>,
}

/// The metadata the marketplace frontend attaches to a platform payment when it is created.
///
/// Exactly one of the two shapes is meaningful: `order_id` points at a checkout-created order that is requesting a
/// payment id, while `product_id` (with an optional `quantity`, defaulting to 1) describes a direct single-product
/// purchase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
}

/// The payment platform API, as seen from the reconciliation engine.
///
/// All three calls are idempotent from the engine's perspective: approving an approved payment and completing a
/// completed payment are both acknowledged with success by the platform. Implementations carry bounded timeouts; a
/// timeout surfaces as [`PlatformApiError::Timeout`] and never as a hung reconciliation.
#[allow(async_fn_in_trait)]
pub trait PaymentPlatform: Clone {
    async fn get_payment(&self, payment_id: &PaymentId) -> Result<PlatformPayment, PlatformApiError>;

    async fn approve_payment(&self, payment_id: &PaymentId) -> Result<(), PlatformApiError>;

    async fn complete_payment(&self, payment_id: &PaymentId, txid: &str) -> Result<(), PlatformApiError>;
}

#[derive(Debug, Clone, Error)]
pub enum PlatformApiError {
    #[error("Could not initialize the platform API client. {0}")]
    Initialization(String),
    #[error("The platform did not respond in time. {0}")]
    Timeout(String),
    #[error("The platform has no record of payment {0}")]
    PaymentNotFound(PaymentId),
    #[error("Error communicating with the platform. {0}")]
    ResponseError(String),
    #[error("The platform query returned an error. Status: {status}, Message: {message}")]
    QueryError { status: u16, message: String },
    #[error("Could not deserialize the platform response. {0}")]
    JsonError(String),
    #[error("The platform reported an unusable payment amount. {0}")]
    InvalidAmount(String),
}

impl PlatformApiError {
    /// True when the call never reached a definitive answer and may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlatformApiError::Timeout(_) | PlatformApiError::ResponseError(_))
    }
}
