//! Pi Marketplace Payment Engine
//!
//! The engine owns the one part of the marketplace backend with real protocol logic: the order/payment
//! reconciliation workflow. It coordinates three collaborators:
//!
//! 1. The **ledger store** ([`traits::LedgerStore`]) — durable storage for orders, line items, product stock
//!    counters and carts, with the conditional (compare-and-swap) updates the state machine relies on. A SQLite
//!    implementation is provided ([`SqliteDatabase`]).
//! 2. The **payment platform** ([`traits::PaymentPlatform`]) — the external authority that issues payment
//!    identifiers and must be told when a payment is approved or completed.
//! 3. The **chain verifier** ([`traits::ChainVerifier`]) — fetches transaction records from the public ledger so
//!    that a payment can be cryptographically tied to the order it claims to settle.
//!
//! The [`ReconciliationApi`] drives the order state machine (`PendingPayment → Paid`, with `Cancelled` reachable
//! from `PendingPayment` only) in response to platform callbacks and user actions, and the [`CheckoutApi`] turns a
//! cart into the pending order that starts the machine. Both are deliberately free of any storage or transport
//! detail.
//!
//! The engine also emits [`events`] when orders are paid or annulled, so that fulfilment and notification
//! concerns can hook in without being entangled with the state machine itself.
pub mod db_types;
pub mod events;
pub mod helpers;
mod pme_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use pme_api::{
    checkout_api::CheckoutApi,
    errors::{CheckoutError, ReconciliationError},
    order_objects,
    reconciliation_api::ReconciliationApi,
};
