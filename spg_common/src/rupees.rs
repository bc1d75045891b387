use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const INR_CURRENCY_CODE: &str = "INR";
pub const INR_CURRENCY_CODE_LOWER: &str = "inr";

//--------------------------------------      Rupees       -----------------------------------------------------------
/// A monetary amount in Indian rupees, stored as an integer number of paise.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Rupees(i64);

op!(binary Rupees, Add, add);
op!(binary Rupees, Sub, sub);
op!(inplace Rupees, SubAssign, sub_assign);
op!(unary Rupees, Neg, neg);

impl Mul<i64> for Rupees {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Rupees {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in paise: {0}")]
pub struct RupeesConversionError(String);

impl From<i64> for Rupees {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Rupees {
    type Error = RupeesConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(RupeesConversionError(format!("Value {} is too large to convert to Rupees", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Rupees {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rupees = self.0 as f64 / 100.0;
        write!(f, "₹{rupees:0.2}")
    }
}

impl Rupees {
    /// The amount in paise.
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_rupees(rupees: i64) -> Self {
        Self(rupees * 100)
    }

    /// Converts a decimal rupee amount (as the gateways report it) to paise, rounding to the
    /// nearest paisa.
    pub fn from_decimal_rupees(rupees: f64) -> Self {
        Self((rupees * 100.0).round() as i64)
    }

    /// The amount as a decimal rupee value, as the gateway initiation APIs expect it.
    pub fn as_decimal_rupees(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Rupees::from_rupees(1_420);
        let b = Rupees::from(50);
        assert_eq!((a + b).value(), 142_050);
        assert_eq!((a - b).value(), 141_950);
        assert_eq!((-b).value(), -50);
        let mut c = a;
        c -= b;
        assert_eq!(c.value(), 141_950);
    }

    #[test]
    fn decimal_round_trip() {
        let amount = Rupees::from_decimal_rupees(100.5);
        assert_eq!(amount.value(), 10_050);
        assert_eq!(amount.as_decimal_rupees(), 100.5);
        assert_eq!(amount.to_string(), "₹100.50");
    }
}
