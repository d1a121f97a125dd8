//! Fixed-precision monetary amounts.
//!
//! Every `Money` value carries exactly two fractional digits. Inputs with more
//! precision are rounded **half to even** (banker's rounding): `10.005` becomes
//! `10.00`, `10.015` becomes `10.02`. Because every value (and therefore every
//! line subtotal) is already at two digits, sums of subtotals are exact and do
//! not depend on summation order.
//!
//! Arithmetic is checked: overflow is reported as a `BusinessRule` error.

use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Number of fractional digits kept by `Money`.
pub const SCALE: u32 = 2;

/// Immutable monetary amount with two fractional digits.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl ValueObject for Money {}

fn normalize(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(SCALE);
    rounded
}

impl Money {
    pub const ZERO: Money = Money(Decimal::from_parts(0, 0, 0, false, SCALE));

    /// Largest unit price the catalog accepts (`NUMERIC(10, 2)`).
    pub const PRICE_MAX: Money = Money(Decimal::from_parts(1_410_065_407, 2, 0, false, SCALE));

    /// Largest order total that can be stored (`NUMERIC(12, 2)`).
    pub const TOTAL_MAX: Money = Money(Decimal::from_parts(3_567_587_327, 232, 0, false, SCALE));

    /// Build a `Money`, normalizing to two decimal places.
    pub fn new(amount: Decimal) -> Self {
        Self(normalize(amount))
    }

    /// Build from an integer number of cents (`1999` -> `19.99`).
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, SCALE))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn checked_add(self, rhs: Money) -> DomainResult<Money> {
        self.0
            .checked_add(rhs.0)
            .map(Money::new)
            .ok_or_else(|| overflow("addition"))
    }

    pub fn checked_sub(self, rhs: Money) -> DomainResult<Money> {
        self.0
            .checked_sub(rhs.0)
            .map(Money::new)
            .ok_or_else(|| overflow("subtraction"))
    }

    /// Unit price times quantity.
    pub fn checked_mul(self, quantity: u32) -> DomainResult<Money> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Money::new)
            .ok_or_else(|| overflow("multiplication"))
    }

    /// Split evenly into `parts`, rounding half to even. Zero parts is an error.
    pub fn checked_div(self, parts: u32) -> DomainResult<Money> {
        if parts == 0 {
            return Err(DomainError::business_rule("cannot divide money by zero"));
        }
        self.0
            .checked_div(Decimal::from(parts))
            .map(Money::new)
            .ok_or_else(|| overflow("division"))
    }

    /// Sum of `amounts`, failing on the first overflow.
    pub fn checked_sum<I>(amounts: I) -> DomainResult<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, Money::checked_add)
    }
}

fn overflow(operation: &str) -> DomainError {
    DomainError::business_rule(format!("monetary {operation} overflowed"))
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl From<u32> for Money {
    fn from(value: u32) -> Self {
        Self::new(Decimal::from(value))
    }
}

impl FromStr for Money {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str(s.trim())
            .map_err(|e| DomainError::validation("amount", format!("invalid amount '{s}': {e}")))?;
        Ok(Self::new(amount))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}
