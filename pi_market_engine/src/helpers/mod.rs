mod payment_locks;

pub use payment_locks::PaymentLocks;
