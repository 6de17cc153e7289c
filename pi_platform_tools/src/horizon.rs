use std::{sync::Arc, time::Duration};

use log::*;
use pi_market_engine::traits::{ChainTransaction, ChainVerifier, ChainVerifierError};
use reqwest::{Client, Url};

use crate::data_objects::HorizonTransaction;

/// The original deployment allowed the public ledger 20 seconds to answer.
pub const DEFAULT_CHAIN_TIMEOUT: Duration = Duration::from_secs(20);

/// Fetches transaction records from the public ledger's Horizon API.
///
/// The platform hands the gateway a fully-qualified transaction URL; this client dereferences it with a bounded
/// timeout and surfaces the record's memo so the reconciliation engine can tie the transaction to a payment.
#[derive(Clone)]
pub struct HorizonClient {
    client: Arc<Client>,
}

impl HorizonClient {
    pub fn new(timeout: Duration) -> Result<Self, ChainVerifierError> {
        let client =
            Client::builder().timeout(timeout).build().map_err(|e| ChainVerifierError::Initialization(e.to_string()))?;
        Ok(Self { client: Arc::new(client) })
    }
}

impl ChainVerifier for HorizonClient {
    async fn fetch_transaction(&self, tx_url: &str) -> Result<ChainTransaction, ChainVerifierError> {
        let url = Url::parse(tx_url).map_err(|e| ChainVerifierError::InvalidUrl(format!("{tx_url}: {e}")))?;
        trace!("⛓️ Fetching transaction record from {url}");
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ChainVerifierError::Timeout(e.to_string())
            } else {
                ChainVerifierError::ResponseError(e.to_string())
            }
        })?;
        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            return Err(ChainVerifierError::ResponseError(format!("Status {status}: {message}")));
        }
        let tx: HorizonTransaction =
            response.json().await.map_err(|e| ChainVerifierError::JsonError(e.to_string()))?;
        if !tx.successful {
            warn!("⛓️ Transaction {} is present but not marked successful on the ledger", tx.hash);
        }
        debug!("⛓️ Fetched transaction {} (memo: {:?})", tx.hash, tx.memo);
        Ok(tx.into())
    }
}
