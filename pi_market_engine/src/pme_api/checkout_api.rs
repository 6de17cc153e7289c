use log::*;
use pmg_common::MicroPi;

use crate::{
    db_types::{NewOrder, NewOrderItem, Order},
    pme_api::errors::CheckoutError,
    traits::LedgerStore,
};

/// `CheckoutApi` converts a cart into the pending order that starts the reconciliation state machine.
pub struct CheckoutApi<B> {
    db: B,
}

impl<B> CheckoutApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> CheckoutApi<B>
where B: LedgerStore
{
    /// Converts the user's cart into a `PendingPayment` order and consumes the cart.
    ///
    /// Prices are re-read at this moment and frozen into the order; the resulting total is authoritative for every
    /// later payment-amount cross-check, regardless of subsequent price changes.
    ///
    /// The stock check here is advisory only. It rejects carts that already exceed stock, but places no hold:
    /// between checkout and settlement the stock can be sold to someone else, and the settlement-time guarded
    /// decrement is the only hard guarantee.
    pub async fn checkout(&self, user_id: &str) -> Result<Order, CheckoutError> {
        let cart = self.db.cart_items(user_id).await?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart(user_id.to_string()));
        }
        let mut items = Vec::with_capacity(cart.len());
        let mut total = MicroPi::from(0);
        for line in &cart {
            let product = self
                .db
                .fetch_product(&line.product_id)
                .await?
                .ok_or_else(|| CheckoutError::ProductNotFound(line.product_id.clone()))?;
            if line.quantity > product.available_stock {
                return Err(CheckoutError::OutOfStock {
                    product_id: product.id,
                    requested: line.quantity,
                    available: product.available_stock,
                });
            }
            total += product.price * line.quantity;
            items.push(NewOrderItem::new(product.id, line.quantity, product.price));
        }
        let order = self.db.checkout_cart(user_id, NewOrder::new(user_id, total), items).await?;
        info!("🛒️ Checkout for user {user_id} complete. Order {} created with total {}", order.id, order.total_price);
        Ok(order)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
