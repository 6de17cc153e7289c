use serde::{Deserialize, Serialize};

use crate::db_types::{Order, PaymentId};

/// The result of an approval: the order the payment is now bound to, whether this call established the binding
/// (as opposed to replaying an existing one), and whether the platform acknowledgement went through. An
/// unacknowledged approval is not a failure; re-approving the same payment is safe and re-sends the
/// acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentApproval {
    pub order: Order,
    pub created: bool,
    pub acknowledged: bool,
}

/// The result of a (possibly re-delivered) completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub order: Order,
    /// `false` when this delivery was a duplicate and the order had already settled with the same txid.
    pub newly_settled: bool,
    /// Whether the platform completion acknowledgement went through on this delivery.
    pub acknowledged: bool,
}

/// The result of a cancellation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CancellationOutcome {
    Cancelled(Order),
    /// The order had already been cancelled. Duplicate deliveries are expected and harmless.
    AlreadyCancelled(Order),
    /// No order exists for the payment id. Replayed or foreign events are logged and ignored.
    UnknownPayment(PaymentId),
}

/// A stuck payment as reported by the platform: the payment id it claims, the transaction that allegedly settled
/// it, and the public-ledger URL where that transaction can be inspected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncompletePayment {
    pub payment_id: PaymentId,
    pub txid: String,
    pub tx_url: String,
}
