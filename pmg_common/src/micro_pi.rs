use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const PI_CURRENCY_CODE: &str = "PI";
pub const PI_CURRENCY_CODE_LOWER: &str = "pi";

/// 1 Pi = 1,000,000 µπ
const MICRO_PI_PER_PI: i64 = 1_000_000;

//--------------------------------------      MicroPi       ----------------------------------------------------------
/// An amount of Pi, denominated in micro-Pi.
///
/// All monetary arithmetic and storage in the gateway happens in integer micro-Pi. Fractional Pi amounts only exist
/// at the platform boundary, and are converted with [`MicroPi::from_pi`] at the point of ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct MicroPi(i64);

op!(binary MicroPi, Add, add);
op!(binary MicroPi, Sub, sub);
op!(inplace MicroPi, AddAssign, add_assign);
op!(inplace MicroPi, SubAssign, sub_assign);
op!(unary MicroPi, Neg, neg);

impl Mul<i64> for MicroPi {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for MicroPi {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in microPi: {0}")]
pub struct MicroPiConversionError(String);

impl From<i64> for MicroPi {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for MicroPi {
    type Error = MicroPiConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MicroPiConversionError(format!("Value {value} is too large to convert to MicroPi")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for MicroPi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pi = self.0 as f64 / MICRO_PI_PER_PI as f64;
        write!(f, "{pi:0.6}π")
    }
}

impl MicroPi {
    /// Converts a fractional Pi amount, as reported by the payment platform, into micro-Pi.
    ///
    /// Sub-microPi precision is rounded to the nearest micro-Pi. Non-finite and out-of-range values are rejected.
    pub fn from_pi(pi: f64) -> Result<Self, MicroPiConversionError> {
        if !pi.is_finite() {
            return Err(MicroPiConversionError(format!("{pi} is not a finite amount")));
        }
        let micro = pi * MICRO_PI_PER_PI as f64;
        if micro.abs() > i64::MAX as f64 {
            return Err(MicroPiConversionError(format!("{pi} Pi overflows the microPi range")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(micro.round() as i64))
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// The fractional Pi representation used on the platform side of the boundary.
    pub fn as_pi(&self) -> f64 {
        self.0 as f64 / MICRO_PI_PER_PI as f64
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = MicroPi::from(2_500_000);
        let b = MicroPi::from(1_000_000);
        assert_eq!(a + b, MicroPi::from(3_500_000));
        assert_eq!(a - b, MicroPi::from(1_500_000));
        assert_eq!(-a, MicroPi::from(-2_500_000));
        assert_eq!(a * 4, MicroPi::from(10_000_000));
        let total: MicroPi = [a, b, b].into_iter().sum();
        assert_eq!(total, MicroPi::from(4_500_000));
    }

    #[test]
    fn from_pi_rounds_to_micro() {
        assert_eq!(MicroPi::from_pi(10.0).unwrap(), MicroPi::from(10_000_000));
        assert_eq!(MicroPi::from_pi(0.1234567).unwrap(), MicroPi::from(123_457));
        assert!(MicroPi::from_pi(f64::NAN).is_err());
        assert!(MicroPi::from_pi(f64::INFINITY).is_err());
        assert!(MicroPi::from_pi(1e19).is_err());
    }

    #[test]
    fn display_is_in_pi() {
        assert_eq!(MicroPi::from(20_000_000).to_string(), "20.000000π");
        assert_eq!(MicroPi::from(1).to_string(), "0.000001π");
    }
}
