use std::sync::Arc;

use log::*;
use pi_market_engine::{
    db_types::PaymentId,
    traits::{PaymentPlatform, PlatformApiError, PlatformPayment},
};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
    Method,
    StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{config::PlatformConfig, data_objects::{CompletionRequest, PaymentResource}};

/// A typed client for the Pi payment platform's `/v2/payments` API.
#[derive(Clone)]
pub struct PiPlatformClient {
    config: PlatformConfig,
    client: Arc<Client>,
}

impl PiPlatformClient {
    pub fn new(config: PlatformConfig) -> Result<Self, PlatformApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(&format!("Key {}", config.api_key.reveal()))
            .map_err(|e| PlatformApiError::Initialization(e.to_string()))?;
        headers.insert(AUTHORIZATION, val);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| PlatformApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url.trim_end_matches('/'))
    }

    async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, PlatformApiError> {
        let url = self.url(path);
        trace!("💳️ Sending platform query: {method} {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                PlatformApiError::Timeout(e.to_string())
            } else {
                PlatformApiError::ResponseError(e.to_string())
            }
        })?;
        if response.status().is_success() {
            trace!("💳️ Platform query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| PlatformApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| PlatformApiError::ResponseError(e.to_string()))?;
            Err(PlatformApiError::QueryError { status, message })
        }
    }

    /// Fetches the raw payment resource, without converting it into engine terms.
    pub async fn payment(&self, payment_id: &PaymentId) -> Result<PaymentResource, PlatformApiError> {
        self.rest_query::<PaymentResource, ()>(Method::GET, &format!("/v2/payments/{payment_id}"), None)
            .await
            .map_err(|e| not_found(e, payment_id))
    }
}

fn not_found(e: PlatformApiError, payment_id: &PaymentId) -> PlatformApiError {
    match e {
        PlatformApiError::QueryError { status, .. } if status == StatusCode::NOT_FOUND.as_u16() => {
            PlatformApiError::PaymentNotFound(payment_id.clone())
        },
        other => other,
    }
}

impl PaymentPlatform for PiPlatformClient {
    async fn get_payment(&self, payment_id: &PaymentId) -> Result<PlatformPayment, PlatformApiError> {
        let resource = self.payment(payment_id).await?;
        PlatformPayment::try_from(resource)
    }

    async fn approve_payment(&self, payment_id: &PaymentId) -> Result<(), PlatformApiError> {
        debug!("💳️ Approving payment {payment_id} with the platform");
        let _ack: Value = self
            .rest_query::<Value, ()>(Method::POST, &format!("/v2/payments/{payment_id}/approve"), None)
            .await
            .map_err(|e| not_found(e, payment_id))?;
        Ok(())
    }

    async fn complete_payment(&self, payment_id: &PaymentId, txid: &str) -> Result<(), PlatformApiError> {
        debug!("💳️ Completing payment {payment_id} with the platform (txid {txid})");
        let body = CompletionRequest { txid: txid.to_string() };
        let _ack: Value = self
            .rest_query(Method::POST, &format!("/v2/payments/{payment_id}/complete"), Some(body))
            .await
            .map_err(|e| not_found(e, payment_id))?;
        Ok(())
    }
}
