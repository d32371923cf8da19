use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Sub},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const RUPIAH_CURRENCY_CODE: &str = "IDR";

//--------------------------------------       Rupiah        ---------------------------------------------------------
/// A whole-rupiah amount. Fees and plan prices are always integral, so no minor unit is tracked.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Rupiah(i64);

op!(binary Rupiah, Add, add);
op!(binary Rupiah, Sub, sub);
op!(inplace Rupiah, AddAssign, add_assign);

impl Mul<i64> for Rupiah {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Rupiah {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl<'a> Sum<&'a Rupiah> for Rupiah {
    fn sum<I: Iterator<Item = &'a Rupiah>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in rupiah: {0}")]
pub struct RupiahConversionError(String);

impl From<i64> for Rupiah {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Rupiah {
    type Error = RupiahConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value).map(Self).map_err(|_| RupiahConversionError(format!("{value} is too large")))
    }
}

impl TryFrom<&str> for Rupiah {
    type Error = RupiahConversionError;

    /// Parses gateway amount strings. These arrive either as plain integers ("200000") or with a fractional part
    /// ("200000.00"). Any non-zero fraction is rejected.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let value = value.trim();
        let (whole, frac) = value.split_once('.').unwrap_or((value, ""));
        if !frac.chars().all(|c| c == '0') {
            return Err(RupiahConversionError(format!("{value} has a fractional rupiah part")));
        }
        whole.parse::<i64>().map(Self).map_err(|e| RupiahConversionError(format!("{value}: {e}")))
    }
}

impl Display for Rupiah {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rp{}", self.0)
    }
}

impl Rupiah {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Format used by payment gateways, which expect a decimal string with two fraction digits.
    pub fn to_gateway_string(&self) -> String {
        format!("{}.00", self.0)
    }
}
