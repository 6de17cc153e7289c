//! Checkout orchestration: cart validation, price freezing and cart consumption.
mod support;

use pi_market_engine::{
    db_types::{OrderStatusType, PaymentId},
    traits::LedgerStore,
    CheckoutApi,
    CheckoutError,
};
use support::*;

#[tokio::test]
async fn empty_carts_cannot_check_out() {
    let db = new_db().await;
    let checkout = CheckoutApi::new(db.clone());
    let result = checkout.checkout("nobody").await;
    assert!(matches!(result, Err(CheckoutError::EmptyCart(_))));
}

#[tokio::test]
async fn carts_exceeding_stock_are_rejected() {
    let db = new_db().await;
    let checkout = CheckoutApi::new(db.clone());
    seed_product(&db, "prod-a", pi(10), 5).await;
    fill_cart(&db, "alice", "prod-a", 6).await;

    let result = checkout.checkout("alice").await;
    assert!(matches!(result, Err(CheckoutError::OutOfStock { requested: 6, available: 5, .. })));
    // A failed checkout consumes nothing.
    assert_eq!(db.cart_items("alice").await.unwrap().len(), 1);
}

#[tokio::test]
async fn totals_are_frozen_at_checkout_time() {
    let db = new_db().await;
    let (api, platform, _chain) = new_api(&db);
    let checkout = CheckoutApi::new(db.clone());
    seed_product(&db, "prod-a", pi(10), 5).await;
    seed_product(&db, "prod-b", pi(3), 9).await;
    fill_cart(&db, "alice", "prod-a", 2).await;
    fill_cart(&db, "alice", "prod-b", 3).await;

    let order = checkout.checkout("alice").await.unwrap();
    assert_eq!(order.total_price, pi(29));
    assert_eq!(order.status, OrderStatusType::PendingPayment);

    let items = db.fetch_order_items(order.id).await.unwrap();
    assert_eq!(items.len(), 2);

    // A price hike after checkout affects neither the frozen total nor settlement.
    seed_product(&db, "prod-a", pi(100), 5).await;
    let order_after = db.fetch_order_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(order_after.total_price, pi(29));

    let p = PaymentId::from("P-frozen");
    platform.add_payment(payment_for_order("P-frozen", &order));
    api.approve_payment(&p, "alice").await.unwrap();
    let settlement = api.complete_payment(&p, "T1").await.unwrap().unwrap();
    assert_eq!(settlement.order.total_price, pi(29));
    assert_eq!(stock_of(&db, "prod-a").await, 3);
    assert_eq!(stock_of(&db, "prod-b").await, 6);
}

#[tokio::test]
async fn checkout_consumes_the_cart_exactly_once() {
    let db = new_db().await;
    let checkout = CheckoutApi::new(db.clone());
    seed_product(&db, "prod-a", pi(1), 10).await;
    fill_cart(&db, "bob", "prod-a", 4).await;

    checkout.checkout("bob").await.unwrap();
    assert!(db.cart_items("bob").await.unwrap().is_empty());
    let again = checkout.checkout("bob").await;
    assert!(matches!(again, Err(CheckoutError::EmptyCart(_))));
}

#[tokio::test]
async fn vanished_products_fail_the_checkout() {
    let db = new_db().await;
    let checkout = CheckoutApi::new(db.clone());
    seed_product(&db, "prod-gone", pi(2), 1).await;
    fill_cart(&db, "carol", "prod-gone", 1).await;
    // The product is delisted (stock emptied out and price zeroed is not enough; remove it outright).
    sqlx::query("DELETE FROM products WHERE id = 'prod-gone'").execute(db.pool()).await.unwrap();

    let result = checkout.checkout("carol").await;
    assert!(matches!(result, Err(CheckoutError::ProductNotFound(_))));
}

#[tokio::test]
async fn advisory_check_does_not_reserve_stock() {
    // Two users check out the same last unit; both succeed, and only settlement decides who gets it.
    let db = new_db().await;
    let (api, platform, _chain) = new_api(&db);
    let checkout = CheckoutApi::new(db.clone());
    seed_product(&db, "prod-last", pi(6), 1).await;
    fill_cart(&db, "alice", "prod-last", 1).await;
    fill_cart(&db, "bob", "prod-last", 1).await;

    let order_a = checkout.checkout("alice").await.unwrap();
    let order_b = checkout.checkout("bob").await.unwrap();

    platform.add_payment(payment_for_order("P-a", &order_a));
    platform.add_payment(payment_for_order("P-b", &order_b));
    api.approve_payment(&PaymentId::from("P-a"), "alice").await.unwrap();
    api.approve_payment(&PaymentId::from("P-b"), "bob").await.unwrap();

    api.complete_payment(&PaymentId::from("P-a"), "T-a").await.unwrap().unwrap();
    let loser = api.complete_payment(&PaymentId::from("P-b"), "T-b").await;
    assert!(matches!(
        loser,
        Err(pi_market_engine::ReconciliationError::Ledger(
            pi_market_engine::traits::LedgerError::StockExhausted { .. }
        ))
    ));
    assert_eq!(stock_of(&db, "prod-last").await, 0);
    // The loser's order is still pending; an operator has to resolve it since the money moved.
    let order_b = db.fetch_order_by_id(order_b.id).await.unwrap().unwrap();
    assert_eq!(order_b.status, OrderStatusType::PendingPayment);
}
