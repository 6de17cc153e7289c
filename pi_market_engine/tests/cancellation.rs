//! Cancellation semantics: only pending orders can be cancelled, and cancelled orders never settle.
mod support;

use pi_market_engine::{
    db_types::{OrderStatusType, PaymentId},
    order_objects::CancellationOutcome,
    ReconciliationError,
};
use support::*;

#[tokio::test]
async fn pending_orders_cancel_and_stay_cancelled() {
    let db = new_db().await;
    let (api, platform, _chain) = new_api(&db);
    seed_product(&db, "prod-a", pi(5), 5).await;

    let p = PaymentId::from("P-cancel");
    platform.add_payment(payment_for_product("P-cancel", "prod-a", 1, pi(5)));
    api.approve_payment(&p, "alice").await.unwrap();

    let outcome = api.cancel_payment(&p).await.unwrap();
    let order = match outcome {
        CancellationOutcome::Cancelled(order) => order,
        other => panic!("Expected a cancellation, got {other:?}"),
    };
    assert_eq!(order.status, OrderStatusType::Cancelled);
    assert!(order.txid.is_none());

    // A second cancellation is a harmless replay.
    let replay = api.cancel_payment(&p).await.unwrap();
    assert!(matches!(replay, CancellationOutcome::AlreadyCancelled(_)));

    // A completion arriving after cancellation is rejected, and stock is untouched.
    let complete = api.complete_payment(&p, "T1").await;
    assert!(matches!(complete, Err(ReconciliationError::OrderCancelled(_))));
    assert_eq!(stock_of(&db, "prod-a").await, 5);
    assert!(platform.complete_calls().is_empty());
}

#[tokio::test]
async fn cancelling_an_unknown_payment_is_ignored() {
    let db = new_db().await;
    let (api, _platform, _chain) = new_api(&db);
    let outcome = api.cancel_payment(&PaymentId::from("P-nobody")).await.unwrap();
    assert!(matches!(outcome, CancellationOutcome::UnknownPayment(_)));
}
