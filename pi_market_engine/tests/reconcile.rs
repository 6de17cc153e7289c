//! Reconciliation of stuck payments against the public ledger.
mod support;

use pi_market_engine::{
    db_types::{OrderStatusType, PaymentId},
    order_objects::IncompletePayment,
    traits::{ChainTransaction, LedgerStore},
    ReconciliationError,
};
use support::*;

fn incomplete(payment_id: &str, txid: &str, tx_url: &str) -> IncompletePayment {
    IncompletePayment { payment_id: PaymentId::from(payment_id), txid: txid.to_string(), tx_url: tx_url.to_string() }
}

#[tokio::test]
async fn unknown_payment_is_an_error_for_reconciliation() {
    let db = new_db().await;
    let (api, _platform, _chain) = new_api(&db);
    let result = api.reconcile_incomplete(incomplete("P-ghost", "T1", "https://chain.example/tx/1")).await;
    assert!(matches!(result, Err(ReconciliationError::OrderNotFound(_))));
}

#[tokio::test]
async fn memo_mismatch_is_rejected_with_no_state_change() {
    let db = new_db().await;
    let (api, platform, chain) = new_api(&db);
    seed_product(&db, "prod-a", pi(4), 6).await;

    let p = PaymentId::from("P-stuck");
    platform.add_payment(payment_for_product("P-stuck", "prod-a", 1, pi(4)));
    api.approve_payment(&p, "alice").await.unwrap();

    // The transaction at the claimed URL settles some other payment.
    chain.add_transaction(
        "https://chain.example/tx/evil",
        ChainTransaction { hash: "abc123".into(), memo: Some("P-other".into()) },
    );
    let result = api.reconcile_incomplete(incomplete("P-stuck", "T1", "https://chain.example/tx/evil")).await;
    assert!(matches!(result, Err(ReconciliationError::PaymentMismatch { .. })));

    let order = db.fetch_order_by_payment_id(&p).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::PendingPayment);
    assert!(order.txid.is_none());
    assert_eq!(stock_of(&db, "prod-a").await, 6);
    assert!(platform.complete_calls().is_empty());
}

#[tokio::test]
async fn matching_memo_settles_like_a_completion() {
    let db = new_db().await;
    let (api, platform, chain) = new_api(&db);
    seed_product(&db, "prod-b", pi(4), 6).await;

    let p = PaymentId::from("P-stuck-2");
    platform.add_payment(payment_for_product("P-stuck-2", "prod-b", 2, pi(8)));
    api.approve_payment(&p, "bob").await.unwrap();

    chain.add_transaction(
        "https://chain.example/tx/good",
        ChainTransaction { hash: "def456".into(), memo: Some("P-stuck-2".into()) },
    );
    let settlement = api.reconcile_incomplete(incomplete("P-stuck-2", "T7", "https://chain.example/tx/good")).await.unwrap();
    assert!(settlement.newly_settled);
    assert_eq!(settlement.order.status, OrderStatusType::Paid);
    assert_eq!(settlement.order.txid.as_deref(), Some("T7"));
    assert_eq!(stock_of(&db, "prod-b").await, 4);
    assert_eq!(platform.complete_calls(), vec![(p.clone(), "T7".to_string())]);

    // Re-reconciling the same stuck payment is a no-op success.
    let replay = api.reconcile_incomplete(incomplete("P-stuck-2", "T7", "https://chain.example/tx/good")).await.unwrap();
    assert!(!replay.newly_settled);
    assert_eq!(stock_of(&db, "prod-b").await, 4);
}

#[tokio::test]
async fn unreachable_chain_record_is_a_retryable_failure() {
    let db = new_db().await;
    let (api, platform, _chain) = new_api(&db);
    seed_product(&db, "prod-c", pi(2), 3).await;

    let p = PaymentId::from("P-stuck-3");
    platform.add_payment(payment_for_product("P-stuck-3", "prod-c", 1, pi(2)));
    api.approve_payment(&p, "carol").await.unwrap();

    let result = api.reconcile_incomplete(incomplete("P-stuck-3", "T1", "https://chain.example/tx/missing")).await;
    assert!(matches!(result, Err(ReconciliationError::Chain(_))));

    // No verdict was reached, so nothing moved.
    let order = db.fetch_order_by_payment_id(&p).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::PendingPayment);
    assert_eq!(stock_of(&db, "prod-c").await, 3);
}
