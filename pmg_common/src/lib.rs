mod micro_pi;

pub mod helpers;
pub mod op;
mod secret;

pub use micro_pi::{MicroPi, MicroPiConversionError, PI_CURRENCY_CODE, PI_CURRENCY_CODE_LOWER};
pub use secret::Secret;
