//! In-memory implementations of the network ports, with call recording.
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use crate::{
    db_types::PaymentId,
    traits::{ChainTransaction, ChainVerifier, ChainVerifierError, PaymentPlatform, PlatformApiError, PlatformPayment},
};

/// A scriptable payment platform. Payments are registered up front; approve/complete calls are recorded so tests
/// can assert on the acknowledgements the engine sent. Flip [`StubPlatform::set_offline`] to make every call time
/// out.
#[derive(Clone, Default)]
pub struct StubPlatform {
    payments: Arc<Mutex<HashMap<PaymentId, PlatformPayment>>>,
    approve_calls: Arc<Mutex<Vec<PaymentId>>>,
    complete_calls: Arc<Mutex<Vec<(PaymentId, String)>>>,
    offline: Arc<AtomicBool>,
}

impl StubPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_payment(&self, payment: PlatformPayment) {
        self.payments.lock().unwrap().insert(payment.payment_id.clone(), payment);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn approve_calls(&self) -> Vec<PaymentId> {
        self.approve_calls.lock().unwrap().clone()
    }

    pub fn complete_calls(&self) -> Vec<(PaymentId, String)> {
        self.complete_calls.lock().unwrap().clone()
    }

    fn check_online(&self) -> Result<(), PlatformApiError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(PlatformApiError::Timeout("stub platform is offline".into()))
        } else {
            Ok(())
        }
    }
}

impl PaymentPlatform for StubPlatform {
    async fn get_payment(&self, payment_id: &PaymentId) -> Result<PlatformPayment, PlatformApiError> {
        self.check_online()?;
        self.payments
            .lock()
            .unwrap()
            .get(payment_id)
            .cloned()
            .ok_or_else(|| PlatformApiError::PaymentNotFound(payment_id.clone()))
    }

    async fn approve_payment(&self, payment_id: &PaymentId) -> Result<(), PlatformApiError> {
        self.check_online()?;
        self.approve_calls.lock().unwrap().push(payment_id.clone());
        Ok(())
    }

    async fn complete_payment(&self, payment_id: &PaymentId, txid: &str) -> Result<(), PlatformApiError> {
        self.check_online()?;
        self.complete_calls.lock().unwrap().push((payment_id.clone(), txid.to_string()));
        Ok(())
    }
}

/// A scriptable public ledger: URL → transaction record.
#[derive(Clone, Default)]
pub struct StubChain {
    transactions: Arc<Mutex<HashMap<String, ChainTransaction>>>,
}

impl StubChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_transaction<S: Into<String>>(&self, url: S, tx: ChainTransaction) {
        self.transactions.lock().unwrap().insert(url.into(), tx);
    }
}

impl ChainVerifier for StubChain {
    async fn fetch_transaction(&self, tx_url: &str) -> Result<ChainTransaction, ChainVerifierError> {
        self.transactions
            .lock()
            .unwrap()
            .get(tx_url)
            .cloned()
            .ok_or_else(|| ChainVerifierError::ResponseError(format!("no transaction record at {tx_url}")))
    }
}
