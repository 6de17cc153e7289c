//! Stock-exhaustion property under concurrent settlements.
//!
//! N orders collectively request more stock than exists. However the settlements interleave, exactly enough may
//! succeed to take the stock to zero; the rest must fail with a stock-exhaustion error, and the counter must never
//! go negative.
mod support;

use std::sync::Arc;

use log::*;
use pi_market_engine::{
    db_types::{NewOrder, NewOrderItem, PaymentId},
    traits::{LedgerError, LedgerStore},
    ReconciliationError,
};
use support::*;
use tokio::runtime::Runtime;

const NUM_ORDERS: i64 = 10;
const STOCK: i64 = 5;

#[test]
fn concurrent_settlements_never_oversell() {
    let sys = Runtime::new().unwrap();

    sys.block_on(async move {
        let db = new_db().await;
        let (api, _platform, _chain) = new_api(&db);
        let api = Arc::new(api);
        seed_product(&db, "prod-hot", pi(1), STOCK).await;

        info!("🚀️ Injecting {NUM_ORDERS} orders for {STOCK} units of stock");
        for i in 0..NUM_ORDERS {
            let payment_id = PaymentId::from(format!("P-burst-{i}"));
            let order = NewOrder::new(format!("user-{i}"), pi(1)).with_payment_id(payment_id);
            let item = NewOrderItem::new("prod-hot".into(), 1, pi(1));
            db.insert_order(order, vec![item]).await.expect("Error inserting order");
        }

        let mut tasks = Vec::new();
        for i in 0..NUM_ORDERS {
            let api = Arc::clone(&api);
            tasks.push(tokio::spawn(async move {
                let payment_id = PaymentId::from(format!("P-burst-{i}"));
                api.complete_payment(&payment_id, &format!("T-burst-{i}")).await
            }));
        }

        let mut settled = 0;
        let mut exhausted = 0;
        for task in tasks {
            match task.await.expect("Settlement task panicked") {
                Ok(Some(settlement)) => {
                    assert!(settlement.newly_settled);
                    settled += 1;
                },
                Ok(None) => panic!("All burst payments have orders; none may be unknown"),
                Err(ReconciliationError::Ledger(LedgerError::StockExhausted { available, .. })) => {
                    assert!(available >= 0);
                    exhausted += 1;
                },
                Err(e) => panic!("Unexpected settlement error: {e}"),
            }
        }

        assert_eq!(settled, STOCK, "exactly enough settlements to drain the stock must win");
        assert_eq!(exhausted, NUM_ORDERS - STOCK);
        assert_eq!(stock_of(&db, "prod-hot").await, 0);
    });
    info!("🚀️ test complete");
}

#[test]
fn racing_redeliveries_decrement_stock_exactly_once() {
    let sys = Runtime::new().unwrap();

    sys.block_on(async move {
        let db = new_db().await;
        let (api, _platform, _chain) = new_api(&db);
        let api = Arc::new(api);
        seed_product(&db, "prod-dup", pi(2), 50).await;

        let payment_id = PaymentId::from("P-dup");
        let order = NewOrder::new("alice", pi(2)).with_payment_id(payment_id.clone());
        let item = NewOrderItem::new("prod-dup".into(), 1, pi(2));
        db.insert_order(order, vec![item]).await.expect("Error inserting order");

        // Ten copies of the same webhook race on one payment id. Serialization makes one the settler and the rest
        // harmless replays.
        let mut tasks = Vec::new();
        for _ in 0..10 {
            let api = Arc::clone(&api);
            let payment_id = payment_id.clone();
            tasks.push(tokio::spawn(async move { api.complete_payment(&payment_id, "T-dup").await }));
        }
        let mut newly_settled = 0;
        for task in tasks {
            let settlement = task.await.unwrap().expect("Re-delivery must be a success").unwrap();
            if settlement.newly_settled {
                newly_settled += 1;
            }
        }
        assert_eq!(newly_settled, 1);
        assert_eq!(stock_of(&db, "prod-dup").await, 49);
    });
}
