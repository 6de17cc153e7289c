#![allow(dead_code)]
use pi_market_engine::{
    db_types::{Order, PaymentId, Product, ProductId},
    events::EventProducers,
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        stubs::{StubChain, StubPlatform},
    },
    traits::{LedgerStore, PaymentMetadata, PlatformPayment},
    ReconciliationApi,
    SqliteDatabase,
};
use pmg_common::MicroPi;

pub type TestApi = ReconciliationApi<SqliteDatabase, StubPlatform, StubChain>;

pub async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 25).await.expect("Error creating database")
}

pub fn new_api(db: &SqliteDatabase) -> (TestApi, StubPlatform, StubChain) {
    let platform = StubPlatform::new();
    let chain = StubChain::new();
    let api = ReconciliationApi::new(db.clone(), platform.clone(), chain.clone(), EventProducers::default());
    (api, platform, chain)
}

/// A whole number of Pi, in micro-Pi.
pub fn pi(amount: i64) -> MicroPi {
    MicroPi::from(amount * 1_000_000)
}

pub async fn seed_product(db: &SqliteDatabase, id: &str, price: MicroPi, stock: i64) {
    let product = Product::new(id, format!("Product {id}"), price, stock);
    db.upsert_product(product).await.expect("Error seeding product");
}

pub async fn fill_cart(db: &SqliteDatabase, user: &str, product: &str, quantity: i64) {
    db.upsert_cart_item(user, &ProductId::from(product), quantity).await.expect("Error seeding cart");
}

/// A platform payment whose metadata points at an existing (checkout-created) order.
pub fn payment_for_order(payment_id: &str, order: &Order) -> PlatformPayment {
    PlatformPayment {
        payment_id: PaymentId::from(payment_id),
        amount: order.total_price,
        metadata: PaymentMetadata { order_id: Some(order.id), product_id: None, quantity: None },
        txid: None,
    }
}

/// A platform payment describing a direct single-product purchase.
pub fn payment_for_product(payment_id: &str, product_id: &str, quantity: i64, amount: MicroPi) -> PlatformPayment {
    PlatformPayment {
        payment_id: PaymentId::from(payment_id),
        amount,
        metadata: PaymentMetadata { order_id: None, product_id: Some(ProductId::from(product_id)), quantity: Some(quantity) },
        txid: None,
    }
}

pub async fn stock_of(db: &SqliteDatabase, product_id: &str) -> i64 {
    db.fetch_product(&ProductId::from(product_id))
        .await
        .expect("Error fetching product")
        .expect("Product not found")
        .available_stock
}
