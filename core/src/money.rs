// core/src/money.rs

//! Fixed-point currency amounts.
//!
//! Prices and order totals are kept as whole cents so that `price × quantity` is exact.
//! On the wire an amount is a decimal string with two fractional digits (`"29.97"`);
//! input may be a JSON string or number with at most two fractional digits.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, sqlx::Type)]
#[sqlx(transparent)]
pub struct Money(i64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyParseError {
  #[error("amount is empty")]
  Empty,
  #[error("'{0}' is not a decimal amount")]
  Malformed(String),
  #[error("'{0}' has more than two decimal places")]
  TooPrecise(String),
  #[error("'{0}' is out of range")]
  OutOfRange(String),
}

impl Money {
  pub const ZERO: Money = Money(0);

  pub const fn from_cents(cents: i64) -> Self {
    Money(cents)
  }

  pub const fn cents(self) -> i64 {
    self.0
  }

  pub fn is_positive(self) -> bool {
    self.0 > 0
  }

  /// `self × quantity`, or `None` on overflow.
  pub fn checked_mul(self, quantity: i64) -> Option<Money> {
    self.0.checked_mul(quantity).map(Money)
  }

  /// The amount as a two-place decimal.
  pub fn to_decimal(self) -> Decimal {
    Decimal::new(self.0, 2)
  }
}

impl fmt::Display for Money {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.to_decimal())
  }
}

impl FromStr for Money {
  type Err = MoneyParseError;

  fn from_str(raw: &str) -> Result<Self, Self::Err> {
    let s = raw.trim();
    if s.is_empty() {
      return Err(MoneyParseError::Empty);
    }
    let amount = Decimal::from_str(s).map_err(|_| MoneyParseError::Malformed(raw.to_string()))?;
    if amount.scale() > 2 {
      return Err(MoneyParseError::TooPrecise(raw.to_string()));
    }
    amount
      .checked_mul(Decimal::ONE_HUNDRED)
      .and_then(|cents| cents.to_i64())
      .map(Money)
      .ok_or_else(|| MoneyParseError::OutOfRange(raw.to_string()))
  }
}

impl Serialize for Money {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for Money {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    deserializer.deserialize_any(MoneyVisitor)
  }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
  type Value = Money;

  fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("a decimal amount with at most two fractional digits")
  }

  fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
    v.parse().map_err(E::custom)
  }

  fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
    v.checked_mul(100)
      .map(Money)
      .ok_or_else(|| E::custom(MoneyParseError::OutOfRange(v.to_string())))
  }

  fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
    i64::try_from(v)
      .map_err(|_| E::custom(MoneyParseError::OutOfRange(v.to_string())))
      .and_then(|v| self.visit_i64(v))
  }

  // f64's Display is the shortest round-tripping form, so 9.99 prints as "9.99".
  fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
    if !v.is_finite() {
      return Err(E::custom(MoneyParseError::Malformed(v.to_string())));
    }
    self.visit_str(&v.to_string())
  }
}
