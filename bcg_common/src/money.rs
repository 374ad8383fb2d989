use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

//--------------------------------------       Money         ---------------------------------------------------------

/// An exact monetary amount in the shop's currency, held as an integer number of cents.
///
/// All ledger and order arithmetic goes through this type. Storefront payloads carry prices as decimal strings
/// ("398.00"); [`Money::from_str`] parses them exactly via [`Decimal`] and rejects sub-cent precision rather than
/// rounding, so `paid + remaining == total` comparisons are always exact.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[sqlx(transparent)]
pub struct Money(i64);

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a money amount: {0}")]
pub struct MoneyConversionError(pub String);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Whole currency units, e.g. `Money::from_units(500)` is "500.00".
    pub fn from_units(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Clamps a negative amount to zero. Used when projecting balances for display, never for ledger writes.
    pub fn or_zero(self) -> Self {
        if self.is_negative() {
            Self::ZERO
        } else {
            self
        }
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        let cents = value
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or_else(|| MoneyConversionError(format!("{value} is out of range")))?;
        if !cents.fract().is_zero() {
            return Err(MoneyConversionError(format!("{value} has sub-cent precision")));
        }
        cents.to_i64().map(Money).ok_or_else(|| MoneyConversionError(format!("{value} is out of range")))
    }
}

impl FromStr for Money {
    type Err = MoneyConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str_exact(s.trim()).map_err(|e| MoneyConversionError(format!("{s}: {e}")))?;
        Money::try_from(value)
    }
}

impl From<i64> for Money {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal().to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
