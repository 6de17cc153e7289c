use chrono::{DateTime, Utc};
use pi_market_engine::{
    db_types::PaymentId,
    traits::{ChainTransaction, PaymentMetadata, PlatformApiError, PlatformPayment},
};
use pmg_common::MicroPi;
use serde::{Deserialize, Serialize};

/// The payment resource returned by `GET /v2/payments/{identifier}`.
///
/// Amounts arrive as fractional Pi and are converted to micro-Pi when the resource crosses into the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResource {
    pub identifier: String,
    pub amount: f64,
    #[serde(default)]
    pub metadata: PaymentMetadata,
    #[serde(default)]
    pub transaction: Option<TransactionRef>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// The transaction reference the platform attaches to a payment once it has seen one on-chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRef {
    pub txid: String,
    /// Public-ledger URL of the transaction record.
    #[serde(rename = "_link")]
    pub link: String,
    #[serde(default)]
    pub verified: bool,
}

impl TryFrom<PaymentResource> for PlatformPayment {
    type Error = PlatformApiError;

    fn try_from(resource: PaymentResource) -> Result<Self, Self::Error> {
        let amount = MicroPi::from_pi(resource.amount).map_err(|e| PlatformApiError::InvalidAmount(e.to_string()))?;
        Ok(PlatformPayment {
            payment_id: PaymentId::from(resource.identifier),
            amount,
            metadata: resource.metadata,
            txid: resource.transaction.map(|t| t.txid),
        })
    }
}

/// Request body for `POST /v2/payments/{identifier}/complete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub txid: String,
}

/// The subset of a Horizon transaction record the gateway consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonTransaction {
    pub hash: String,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub successful: bool,
}

impl From<HorizonTransaction> for ChainTransaction {
    fn from(tx: HorizonTransaction) -> Self {
        ChainTransaction { hash: tx.hash, memo: tx.memo }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn payment_resources_convert_amounts_to_micro_pi() {
        let json = r#"{
            "identifier": "pay_123",
            "amount": 20.5,
            "metadata": { "order_id": 42 },
            "transaction": { "txid": "tx_abc", "_link": "https://api.blockchain.pi/transactions/tx_abc" }
        }"#;
        let resource: PaymentResource = serde_json::from_str(json).unwrap();
        let payment = PlatformPayment::try_from(resource).unwrap();
        assert_eq!(payment.payment_id, PaymentId::from("pay_123"));
        assert_eq!(payment.amount, MicroPi::from(20_500_000));
        assert_eq!(payment.metadata.order_id.map(|id| id.0), Some(42));
        assert_eq!(payment.txid.as_deref(), Some("tx_abc"));
    }

    #[test]
    fn unusable_amounts_are_rejected() {
        let resource = PaymentResource {
            identifier: "pay_bad".into(),
            amount: f64::NAN,
            metadata: PaymentMetadata::default(),
            transaction: None,
            created_at: None,
        };
        assert!(matches!(PlatformPayment::try_from(resource), Err(PlatformApiError::InvalidAmount(_))));
    }

    #[test]
    fn horizon_records_tolerate_missing_memos() {
        let json = r#"{ "hash": "deadbeef", "successful": true }"#;
        let tx: HorizonTransaction = serde_json::from_str(json).unwrap();
        let chain_tx = ChainTransaction::from(tx);
        assert_eq!(chain_tx.hash, "deadbeef");
        assert!(chain_tx.memo.is_none());
    }
}
