use std::fmt::Display;

use pi_market_engine::{db_types::PaymentId, order_objects::IncompletePayment};
use pi_platform_tools::PaymentResource;
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovePaymentRequest {
    pub payment_id: PaymentId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletePaymentRequest {
    pub payment_id: PaymentId,
    pub txid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelPaymentRequest {
    pub payment_id: PaymentId,
}

/// The platform's incomplete-payment callback carries the full payment resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncompletePaymentNotification {
    pub payment: PaymentResource,
}

impl IncompletePaymentNotification {
    /// Extracts the fields reconciliation needs. A notification without an attached transaction cannot be
    /// reconciled against the chain and is rejected as a bad request.
    pub fn into_incomplete_payment(self) -> Result<IncompletePayment, ServerError> {
        let payment_id = PaymentId::from(self.payment.identifier);
        let tx = self
            .payment
            .transaction
            .ok_or_else(|| ServerError::InvalidRequestBody(format!("payment {payment_id} carries no transaction")))?;
        Ok(IncompletePayment { payment_id, txid: tx.txid, tx_url: tx.link })
    }
}
