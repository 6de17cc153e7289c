//! The full happy path and its idempotency and conflict edges: checkout → approve → complete.
mod support;

use pi_market_engine::{
    db_types::{OrderStatusType, PaymentId},
    traits::LedgerStore,
    CheckoutApi,
    ReconciliationError,
};
use support::*;

#[tokio::test]
async fn checkout_approve_complete_flow() {
    let db = new_db().await;
    let (api, platform, _chain) = new_api(&db);
    let checkout = CheckoutApi::new(db.clone());

    seed_product(&db, "prod-a", pi(10), 5).await;
    fill_cart(&db, "alice", "prod-a", 2).await;

    // Checkout freezes the total and consumes the cart.
    let order = checkout.checkout("alice").await.unwrap();
    assert_eq!(order.total_price, pi(20));
    assert_eq!(order.status, OrderStatusType::PendingPayment);
    assert!(order.payment_id.is_none());
    assert!(db.cart_items("alice").await.unwrap().is_empty());

    // The platform issues payment P1 for this order; approval binds it.
    let p1 = PaymentId::from("P1");
    platform.add_payment(payment_for_order("P1", &order));
    let approval = api.approve_payment(&p1, "alice").await.unwrap();
    assert!(approval.created);
    assert!(approval.acknowledged);
    assert_eq!(approval.order.id, order.id);
    assert_eq!(approval.order.payment_id, Some(p1.clone()));
    assert_eq!(platform.approve_calls(), vec![p1.clone()]);

    // Re-approval is a no-op success that re-sends the acknowledgement.
    let again = api.approve_payment(&p1, "alice").await.unwrap();
    assert!(!again.created);
    assert_eq!(platform.approve_calls().len(), 2);

    // Settlement marks the order paid, records the txid, and decrements stock exactly once.
    let settlement = api.complete_payment(&p1, "T1").await.unwrap().unwrap();
    assert!(settlement.newly_settled);
    assert!(settlement.acknowledged);
    assert_eq!(settlement.order.status, OrderStatusType::Paid);
    assert_eq!(settlement.order.txid.as_deref(), Some("T1"));
    assert_eq!(stock_of(&db, "prod-a").await, 3);

    // Re-delivery with the same txid is a no-op success, and the stock stays put.
    let replay = api.complete_payment(&p1, "T1").await.unwrap().unwrap();
    assert!(!replay.newly_settled);
    assert!(replay.acknowledged);
    assert_eq!(stock_of(&db, "prod-a").await, 3);
    assert_eq!(platform.complete_calls().len(), 2);

    // A different txid for the same payment is a conflict and changes nothing.
    let conflict = api.complete_payment(&p1, "T2").await;
    assert!(matches!(conflict, Err(ReconciliationError::TxidConflict { .. })));
    let order = db.fetch_order_by_payment_id(&p1).await.unwrap().unwrap();
    assert_eq!(order.txid.as_deref(), Some("T1"));
    assert_eq!(stock_of(&db, "prod-a").await, 3);

    // Settled money cannot be cancelled.
    let cancel = api.cancel_payment(&p1).await;
    assert!(matches!(cancel, Err(ReconciliationError::CancelAfterSettlement(_))));
}

#[tokio::test]
async fn completion_of_unknown_payment_is_ignored() {
    let db = new_db().await;
    let (api, platform, _chain) = new_api(&db);
    let outcome = api.complete_payment(&PaymentId::from("never-issued"), "T1").await.unwrap();
    assert!(outcome.is_none());
    assert!(platform.complete_calls().is_empty());
}

#[tokio::test]
async fn approval_survives_a_dead_platform_once_the_order_exists() {
    let db = new_db().await;
    let (api, platform, _chain) = new_api(&db);
    seed_product(&db, "prod-b", pi(3), 10).await;

    let p = PaymentId::from("P-offline");
    platform.add_payment(payment_for_product("P-offline", "prod-b", 1, pi(3)));
    let approval = api.approve_payment(&p, "bob").await.unwrap();
    assert!(approval.created && approval.acknowledged);

    // The platform goes dark. Re-approval still succeeds locally; the acknowledgement just doesn't land.
    platform.set_offline(true);
    let retry = api.approve_payment(&p, "bob").await.unwrap();
    assert!(!retry.created);
    assert!(!retry.acknowledged);
}

#[tokio::test]
async fn unacknowledged_settlement_is_repaired_by_redelivery() {
    let db = new_db().await;
    let (api, platform, _chain) = new_api(&db);
    seed_product(&db, "prod-c", pi(5), 2).await;

    let p = PaymentId::from("P-flaky");
    platform.add_payment(payment_for_product("P-flaky", "prod-c", 1, pi(5)));
    api.approve_payment(&p, "carol").await.unwrap();

    // The ack fails, but the local transition is committed anyway.
    platform.set_offline(true);
    let settlement = api.complete_payment(&p, "T9").await.unwrap().unwrap();
    assert!(settlement.newly_settled);
    assert!(!settlement.acknowledged);
    assert_eq!(settlement.order.status, OrderStatusType::Paid);
    assert_eq!(stock_of(&db, "prod-c").await, 1);

    // The platform retries the callback; this time the ack lands and nothing else changes.
    platform.set_offline(false);
    let replay = api.complete_payment(&p, "T9").await.unwrap().unwrap();
    assert!(!replay.newly_settled);
    assert!(replay.acknowledged);
    assert_eq!(stock_of(&db, "prod-c").await, 1);
    assert_eq!(platform.complete_calls(), vec![(p, "T9".to_string())]);
}

#[tokio::test]
async fn direct_purchase_approval_creates_the_order() {
    let db = new_db().await;
    let (api, platform, _chain) = new_api(&db);
    seed_product(&db, "prod-d", pi(7), 4).await;

    let p = PaymentId::from("P-direct");
    platform.add_payment(payment_for_product("P-direct", "prod-d", 2, pi(14)));
    let approval = api.approve_payment(&p, "dave").await.unwrap();
    assert!(approval.created);
    assert_eq!(approval.order.total_price, pi(14));
    assert_eq!(approval.order.user_id, "dave");

    let items = db.fetch_order_items(approval.order.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 2);
    assert_eq!(items[0].unit_price, pi(7));

    api.complete_payment(&p, "T-direct").await.unwrap().unwrap();
    assert_eq!(stock_of(&db, "prod-d").await, 2);
}

#[tokio::test]
async fn approval_rejects_foreign_orders_and_wrong_amounts() {
    let db = new_db().await;
    let (api, platform, _chain) = new_api(&db);
    let checkout = CheckoutApi::new(db.clone());
    seed_product(&db, "prod-e", pi(10), 5).await;
    fill_cart(&db, "erin", "prod-e", 1).await;
    let order = checkout.checkout("erin").await.unwrap();

    // Approval must be for the owner of the order.
    platform.add_payment(payment_for_order("P-foreign", &order));
    let foreign = api.approve_payment(&PaymentId::from("P-foreign"), "mallory").await;
    assert!(matches!(foreign, Err(ReconciliationError::ForeignOrder(_))));

    // The platform amount must match the frozen total.
    let mut short_paid = payment_for_order("P-short", &order);
    short_paid.amount = pi(1);
    platform.add_payment(short_paid);
    let short = api.approve_payment(&PaymentId::from("P-short"), "erin").await;
    assert!(matches!(short, Err(ReconciliationError::AmountMismatch { .. })));

    // Neither attempt bound a payment to the order.
    let order = db.fetch_order_by_id(order.id).await.unwrap().unwrap();
    assert!(order.payment_id.is_none());
}
