use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A transaction record fetched from the public ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainTransaction {
    pub hash: String,
    /// The memo embedded in the transaction. For marketplace payments this carries the payment id the transaction
    /// claims to settle.
    pub memo: Option<String>,
}

/// Read-only access to the public ledger.
///
/// The lookup crosses a third-party network boundary and must carry an explicit timeout; it may never block the
/// reconciliation engine indefinitely. A timeout is a retryable failure, not a verdict.
#[allow(async_fn_in_trait)]
pub trait ChainVerifier: Clone {
    async fn fetch_transaction(&self, tx_url: &str) -> Result<ChainTransaction, ChainVerifierError>;
}

#[derive(Debug, Clone, Error)]
pub enum ChainVerifierError {
    #[error("Could not initialize the chain client. {0}")]
    Initialization(String),
    #[error("The chain lookup did not respond in time. {0}")]
    Timeout(String),
    #[error("The transaction URL is not usable. {0}")]
    InvalidUrl(String),
    #[error("Error fetching the transaction record. {0}")]
    ResponseError(String),
    #[error("Could not deserialize the transaction record. {0}")]
    JsonError(String),
}
