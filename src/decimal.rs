use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// amount in currency units, kept at the 2 decimal places of the `DECIMAL(10,2)` amount columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    pub const SCALE: u32 = 2;

    /// rounds to `SCALE` places
    pub fn from_decimal(d: Decimal) -> Self {
        Money(d.round_dp(Self::SCALE))
    }

    /// whole currency units (rupiah)
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// `None` when the sum leaves the `Decimal` range
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money::from_decimal)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money::from_decimal)
    }

    /// price of `units` billing periods at this rate
    pub fn checked_times(&self, units: u64) -> Option<Money> {
        self.0.checked_mul(Decimal::from(units)).map(Money::from_decimal)
    }

    /// total of `amounts`, `None` on overflow
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, amount| acc.checked_add(amount))
    }

    /// `self - other`, floored at zero
    pub fn saturating_sub(self, other: Money) -> Money {
        match self.checked_sub(other) {
            Some(diff) if !diff.is_negative() => diff,
            _ => Money::ZERO,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0.to_string())
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}
