use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewOrder, NewOrderItem, Order, OrderStatusType, PaymentId},
    events::{EventProducers, OrderAnnulledEvent, OrderPaidEvent},
    helpers::PaymentLocks,
    pme_api::{
        errors::ReconciliationError,
        order_objects::{CancellationOutcome, IncompletePayment, PaymentApproval, Settlement},
    },
    traits::{ChainVerifier, LedgerStore, PaymentPlatform, PlatformPayment},
};

/// `ReconciliationApi` drives the order state machine in response to payment-platform callbacks and user actions.
///
/// It is the only component that may move an order between states or touch a product's stock counter, and it does
/// so through the store's conditional writes. Transitions are additionally serialized per payment id: the platform
/// can deliver callbacks before, after, or instead of the local actions they relate to, and in any number of
/// copies.
///
/// The transition table:
///
/// | From \ Via       | Approve        | Complete    | Reconcile-incomplete | Cancel      |
/// |------------------|----------------|-------------|----------------------|-------------|
/// | *(no order)*     | PendingPayment | ignored     | Err(not found)       | ignored     |
/// | PendingPayment   | no-op          | Paid        | Paid (memo checked)  | Cancelled   |
/// | Paid             | no-op          | no-op / Err | no-op / Err          | Err         |
/// | Cancelled        | no-op          | Err         | Err                  | no-op       |
///
/// "no-op / Err": re-delivery with the recorded txid is a success that re-sends the platform acknowledgement; a
/// *different* txid is a conflict and is never silently resolved.
pub struct ReconciliationApi<B, P, C> {
    db: B,
    platform: P,
    chain: C,
    locks: PaymentLocks,
    producers: EventProducers,
}

impl<B, P, C> Debug for ReconciliationApi<B, P, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B, P, C> ReconciliationApi<B, P, C> {
    pub fn new(db: B, platform: P, chain: C, producers: EventProducers) -> Self {
        Self { db, platform, chain, locks: PaymentLocks::new(), producers }
    }
}

impl<B, P, C> ReconciliationApi<B, P, C>
where
    B: LedgerStore,
    P: PaymentPlatform,
    C: ChainVerifier,
{
    /// Approves a platform-issued payment on behalf of `user_id`.
    ///
    /// If no order is bound to the payment id yet, the payment's metadata decides what the order is: an `order_id`
    /// binds the payment to that (checkout-created) order after cross-checking the platform amount against the
    /// frozen total; a `product_id` creates a fresh single-line order, as direct purchases do.
    ///
    /// Re-approving an already-approved payment is a no-op success. The platform `approve` acknowledgement is
    /// best-effort: if it cannot be delivered, the approval still stands locally and a retry of this call will
    /// re-send it.
    pub async fn approve_payment(
        &self,
        payment_id: &PaymentId,
        user_id: &str,
    ) -> Result<PaymentApproval, ReconciliationError> {
        let _guard = self.locks.acquire(payment_id.as_str()).await;
        let (order, created) = match self.db.fetch_order_by_payment_id(payment_id).await? {
            Some(order) => {
                debug!("🔄️ Payment {payment_id} is already bound to order {}. Re-approval is a no-op", order.id);
                (order, false)
            },
            None => {
                let payment = self.platform.get_payment(payment_id).await?;
                let order = self.bind_payment_to_order(payment_id, user_id, payment).await?;
                (order, true)
            },
        };
        let acknowledged = match self.platform.approve_payment(payment_id).await {
            Ok(()) => true,
            Err(e) => {
                warn!("🔄️ Payment {payment_id} approved locally, but the platform acknowledgement failed: {e}");
                false
            },
        };
        info!("🔄️ Payment {payment_id} approved for order {} (created: {created})", order.id);
        Ok(PaymentApproval { order, created, acknowledged })
    }

    async fn bind_payment_to_order(
        &self,
        payment_id: &PaymentId,
        user_id: &str,
        payment: PlatformPayment,
    ) -> Result<Order, ReconciliationError> {
        if let Some(order_id) = payment.metadata.order_id {
            let order = self
                .db
                .fetch_order_by_id(order_id)
                .await?
                .ok_or_else(|| ReconciliationError::InvalidMetadata(format!("order {order_id} does not exist")))?;
            if order.user_id != user_id {
                return Err(ReconciliationError::ForeignOrder(order_id));
            }
            if order.total_price != payment.amount {
                return Err(ReconciliationError::AmountMismatch {
                    payment_id: payment_id.clone(),
                    expected: order.total_price,
                    actual: payment.amount,
                });
            }
            let order = self.db.attach_payment_id(order_id, payment_id).await?;
            return Ok(order);
        }
        let product_id = payment
            .metadata
            .product_id
            .ok_or_else(|| ReconciliationError::InvalidMetadata("neither order_id nor product_id present".into()))?;
        let product = self
            .db
            .fetch_product(&product_id)
            .await?
            .ok_or_else(|| ReconciliationError::InvalidMetadata(format!("product {product_id} does not exist")))?;
        let quantity = payment.metadata.quantity.unwrap_or(1);
        if quantity < 1 {
            return Err(ReconciliationError::InvalidMetadata(format!("quantity {quantity} is not positive")));
        }
        if product.price * quantity != payment.amount {
            // The platform amount is what the user actually paid; keep it as the frozen total, but leave a trace.
            warn!(
                "🔄️ Payment {payment_id}: platform amount {} differs from list price {} x{quantity}",
                payment.amount, product.price
            );
        }
        let item = NewOrderItem::new(product.id.clone(), quantity, product.price);
        let order = NewOrder::new(user_id, payment.amount).with_payment_id(payment_id.clone());
        let (order, _inserted) = self.db.insert_order(order, vec![item]).await?;
        Ok(order)
    }

    /// Records the settlement of a payment the platform has observed on-chain.
    ///
    /// Returns `Ok(None)` if no order is bound to the payment id: the platform may be replaying history from
    /// before a restart, or another actor has not created the order yet. That is the platform's problem to retry,
    /// not a crash.
    ///
    /// Re-delivery with the recorded txid is a no-op success (the acknowledgement is re-sent); a different txid is
    /// a [`ReconciliationError::TxidConflict`].
    pub async fn complete_payment(
        &self,
        payment_id: &PaymentId,
        txid: &str,
    ) -> Result<Option<Settlement>, ReconciliationError> {
        let _guard = self.locks.acquire(payment_id.as_str()).await;
        let order = match self.db.fetch_order_by_payment_id(payment_id).await? {
            Some(order) => order,
            None => {
                warn!("🔄️ Completion delivered for unknown payment {payment_id}. Ignoring");
                return Ok(None);
            },
        };
        let settlement = self.settle(order, payment_id, txid).await?;
        Ok(Some(settlement))
    }

    /// Reconciles a payment the platform reports as stuck, using the chain as the source of truth.
    ///
    /// The on-chain transaction's memo must equal the payment id; anything else is a
    /// [`ReconciliationError::PaymentMismatch`] and no state changes. On a match, the flow is exactly the
    /// completion flow.
    pub async fn reconcile_incomplete(&self, payment: IncompletePayment) -> Result<Settlement, ReconciliationError> {
        let payment_id = payment.payment_id.clone();
        let _guard = self.locks.acquire(payment_id.as_str()).await;
        let order = self
            .db
            .fetch_order_by_payment_id(&payment_id)
            .await?
            .ok_or_else(|| ReconciliationError::OrderNotFound(payment_id.clone()))?;
        let chain_tx = self.chain.fetch_transaction(&payment.tx_url).await?;
        let memo = chain_tx.memo.unwrap_or_default();
        if memo != payment_id.as_str() {
            warn!("🔄️ Chain memo '{memo}' does not match payment {payment_id}. Rejecting reconciliation");
            return Err(ReconciliationError::PaymentMismatch { payment_id, memo });
        }
        debug!("⛓️ Transaction {} carries the expected memo for payment {payment_id}", chain_tx.hash);
        self.settle(order, &payment_id, &payment.txid).await
    }

    /// Cancels the payment's order, if it has not settled.
    ///
    /// Cancelling settled money is a conflict; cancelling an already-cancelled or unknown payment is a no-op.
    pub async fn cancel_payment(&self, payment_id: &PaymentId) -> Result<CancellationOutcome, ReconciliationError> {
        let _guard = self.locks.acquire(payment_id.as_str()).await;
        let order = match self.db.fetch_order_by_payment_id(payment_id).await? {
            Some(order) => order,
            None => {
                warn!("🔄️ Cancellation delivered for unknown payment {payment_id}. Ignoring");
                return Ok(CancellationOutcome::UnknownPayment(payment_id.clone()));
            },
        };
        match order.status {
            OrderStatusType::Cancelled => {
                debug!("🔄️ Payment {payment_id} is already cancelled. No action to take");
                Ok(CancellationOutcome::AlreadyCancelled(order))
            },
            OrderStatusType::Paid => Err(ReconciliationError::CancelAfterSettlement(payment_id.clone())),
            OrderStatusType::PendingPayment => {
                let order = self.db.cancel_order(order.id).await?;
                info!("🔄️❌️ Order {} cancelled for payment {payment_id}", order.id);
                self.call_order_annulled_hook(&order).await;
                Ok(CancellationOutcome::Cancelled(order))
            },
        }
    }

    /// The shared settlement path. The caller holds the payment lock.
    async fn settle(
        &self,
        order: Order,
        payment_id: &PaymentId,
        txid: &str,
    ) -> Result<Settlement, ReconciliationError> {
        match order.status {
            OrderStatusType::Paid => {
                match order.txid.as_deref() {
                    Some(recorded) if recorded == txid => {
                        debug!("🔄️✅️ Payment {payment_id} already settled with {txid}. Re-sending acknowledgement");
                        let acknowledged = self.acknowledge_completion(payment_id, txid).await;
                        Ok(Settlement { order, newly_settled: false, acknowledged })
                    },
                    Some(recorded) => Err(ReconciliationError::TxidConflict {
                        payment_id: payment_id.clone(),
                        recorded: recorded.to_string(),
                        submitted: txid.to_string(),
                    }),
                    // A paid order always carries its txid; treat a missing one as a conflict rather than guess.
                    None => Err(ReconciliationError::TxidConflict {
                        payment_id: payment_id.clone(),
                        recorded: String::new(),
                        submitted: txid.to_string(),
                    }),
                }
            },
            OrderStatusType::Cancelled => Err(ReconciliationError::OrderCancelled(payment_id.clone())),
            OrderStatusType::PendingPayment => {
                let settled = self.db.settle_order(order.id, txid).await.map_err(|e| {
                    if let crate::traits::LedgerError::StockExhausted { .. } = &e {
                        // Funds have already moved on-chain; this order needs an operator.
                        error!("🔄️🚨️ Payment {payment_id} settled on-chain but stock cannot be honored: {e}");
                    }
                    e
                })?;
                let acknowledged = self.acknowledge_completion(payment_id, txid).await;
                info!("🔄️✅️ Order {} is paid (txid {txid})", settled.id);
                self.call_order_paid_hook(&settled).await;
                Ok(Settlement { order: settled, newly_settled: true, acknowledged })
            },
        }
    }

    /// Best-effort completion acknowledgement. The local transition is already committed; a delivery failure here
    /// is repaired by the next re-delivery of the same call.
    async fn acknowledge_completion(&self, payment_id: &PaymentId, txid: &str) -> bool {
        match self.platform.complete_payment(payment_id, txid).await {
            Ok(()) => true,
            Err(e) => {
                warn!("🔄️ Could not acknowledge completion of {payment_id} to the platform: {e}");
                false
            },
        }
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for producer in &self.producers.order_paid_producer {
            debug!("🔄️📦️ Notifying order paid hook subscribers");
            let event = OrderPaidEvent::new(order.clone());
            producer.publish_event(event).await;
        }
    }

    async fn call_order_annulled_hook(&self, order: &Order) {
        for producer in &self.producers.order_annulled_producer {
            debug!("🔄️📦️ Notifying order annulled hook subscribers");
            let event = OrderAnnulledEvent::new(order.clone());
            producer.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
