use crate::decimal::Money;
use crate::errors::{PaymentError, Result};
use crate::types::PaymentMethod;

/// dates per billed week
pub const DAYS_PER_WEEK: u64 = 7;

/// dates per billed month; a fixed approximation, not calendar months
pub const DAYS_PER_MONTH: u64 = 30;

/// number of billing periods covered by `date_count` selected dates;
/// partial weeks and months round up
pub fn billable_periods(method: PaymentMethod, date_count: usize) -> u64 {
    let n = date_count as u64;
    match method {
        PaymentMethod::Daily => n,
        PaymentMethod::Weekly => n.div_ceil(DAYS_PER_WEEK),
        PaymentMethod::Monthly => n.div_ceil(DAYS_PER_MONTH),
    }
}

/// amount owed for `date_count` selected dates at `rate_per_period`
pub fn compute_amount(method: PaymentMethod, rate_per_period: Money, date_count: usize) -> Result<Money> {
    AccrualCalculator::new(method).amount(rate_per_period, date_count)
}

/// calculator bound to one cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccrualCalculator {
    pub method: PaymentMethod,
}

impl AccrualCalculator {
    pub fn new(method: PaymentMethod) -> Self {
        Self { method }
    }

    pub fn periods(&self, date_count: usize) -> u64 {
        billable_periods(self.method, date_count)
    }

    pub fn amount(&self, rate_per_period: Money, date_count: usize) -> Result<Money> {
        if rate_per_period.is_negative() {
            return Err(PaymentError::InvalidAmount {
                message: format!("rate must not be negative, got {}", rate_per_period),
            });
        }
        rate_per_period
            .checked_times(self.periods(date_count))
            .ok_or_else(|| PaymentError::amount_overflow("computed amount"))
    }

    /// months recorded on a payment; only monthly plans carry one
    pub fn payment_months(&self, date_count: usize) -> Option<u32> {
        match self.method {
            PaymentMethod::Monthly => u32::try_from(self.periods(date_count)).ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_amount() {
        let amount = compute_amount(PaymentMethod::Daily, Money::from_major(10_000), 2).unwrap();
        assert_eq!(amount, Money::from_major(20_000));
    }

    #[test]
    fn test_weekly_rounds_partial_weeks_up() {
        let rate = Money::from_major(5_000);
        assert_eq!(compute_amount(PaymentMethod::Weekly, rate, 3).unwrap(), Money::from_major(5_000));
        assert_eq!(compute_amount(PaymentMethod::Weekly, rate, 7).unwrap(), Money::from_major(5_000));
        assert_eq!(compute_amount(PaymentMethod::Weekly, rate, 8).unwrap(), Money::from_major(10_000));
    }

    #[test]
    fn test_monthly_uses_thirty_day_blocks() {
        let rate = Money::from_major(150_000);
        assert_eq!(compute_amount(PaymentMethod::Monthly, rate, 1).unwrap(), rate);
        assert_eq!(compute_amount(PaymentMethod::Monthly, rate, 30).unwrap(), rate);
        assert_eq!(compute_amount(PaymentMethod::Monthly, rate, 31).unwrap(), rate.checked_times(2).unwrap());
    }

    #[test]
    fn test_zero_dates_cost_nothing() {
        for method in PaymentMethod::ALL {
            assert_eq!(compute_amount(method, Money::from_major(100), 0).unwrap(), Money::ZERO);
        }
    }

    #[test]
    fn test_negative_rate_rejected() {
        let err = compute_amount(PaymentMethod::Daily, Money::from_major(-1), 3).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidAmount { .. }));
    }

    #[test]
    fn test_rate_overflow_is_an_amount_error() {
        let rate = Money::from_decimal(rust_decimal::Decimal::MAX);
        assert_eq!(compute_amount(PaymentMethod::Daily, rate, 1).unwrap(), rate);

        let err = compute_amount(PaymentMethod::Daily, rate, 2).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidAmount { .. }));
    }

    #[test]
    fn test_daily_is_strictly_increasing() {
        let rate = Money::from_major(250);
        let mut previous = compute_amount(PaymentMethod::Daily, rate, 0).unwrap();
        for n in 1..100 {
            let next = compute_amount(PaymentMethod::Daily, rate, n).unwrap();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_rounded_cadences_are_flat_within_a_period() {
        let rate = Money::from_major(250);
        for (method, block) in [(PaymentMethod::Weekly, 7usize), (PaymentMethod::Monthly, 30usize)] {
            for period in 0..4 {
                let first = compute_amount(method, rate, period * block + 1).unwrap();
                let last = compute_amount(method, rate, (period + 1) * block).unwrap();
                assert_eq!(first, last);
                assert_eq!(first, rate.checked_times(period as u64 + 1).unwrap());
            }
        }
    }

    #[test]
    fn test_payment_months_only_for_monthly() {
        assert_eq!(AccrualCalculator::new(PaymentMethod::Monthly).payment_months(45), Some(2));
        assert_eq!(AccrualCalculator::new(PaymentMethod::Weekly).payment_months(45), None);
    }
}
