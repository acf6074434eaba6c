use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::accrual::calculator::billable_periods;
use crate::decimal::Money;
use crate::errors::{PaymentError, Result};
use crate::ledger::PaidDateSet;
use crate::types::{Package, PackageId, PaymentMethod};

/// calendar dates a customer is obligated to pay under a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObligationSchedule {
    pub package_id: PackageId,
    pub payment_method: PaymentMethod,
    pub rate: Money,
    pub months: u32,
    pub start_date: NaiveDate,
    /// first date after the plan, exclusive
    pub end_date: NaiveDate,
    pub dates: Vec<NaiveDate>,
}

impl ObligationSchedule {
    /// every date from `start_date` up to `start_date + payment_months`
    pub fn derive(package: &Package, start_date: NaiveDate) -> Result<Self> {
        let months = match package.payment_months {
            Some(m) if m > 0 => m,
            _ => {
                return Err(PaymentError::InvalidArgument {
                    message: format!("package {} has no payment term", package.id),
                })
            }
        };

        let end_date = start_date
            .checked_add_months(Months::new(months))
            .ok_or_else(|| PaymentError::InvalidArgument {
                message: format!("schedule starting {} overflows the calendar", start_date),
            })?;

        let dates = start_date
            .iter_days()
            .take_while(|d| *d < end_date)
            .collect();

        Ok(Self {
            package_id: package.id,
            payment_method: package.payment_method,
            rate: package.payment_amount,
            months,
            start_date,
            end_date,
            dates,
        })
    }

    pub fn total_days(&self) -> usize {
        self.dates.len()
    }

    /// billing periods over the whole plan; monthly plans count calendar months
    pub fn scheduled_periods(&self) -> u64 {
        match self.payment_method {
            PaymentMethod::Monthly => self.months as u64,
            method => billable_periods(method, self.total_days()),
        }
    }

    pub fn total_owed(&self) -> Result<Money> {
        self.rate
            .checked_times(self.scheduled_periods())
            .ok_or_else(|| PaymentError::amount_overflow("scheduled total"))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date < self.end_date
    }

    /// dates of `candidates` falling outside the plan
    pub fn outside(&self, candidates: &[NaiveDate]) -> Vec<NaiveDate> {
        candidates
            .iter()
            .filter(|d| !self.contains(**d))
            .copied()
            .collect()
    }

    /// balance of the plan against paid dates and the credited amount
    pub fn balance(&self, paid: &PaidDateSet, paid_amount: Money) -> Result<CustomerBalance> {
        let outstanding_dates: Vec<NaiveDate> = self
            .dates
            .iter()
            .filter(|d| !paid.contains(d))
            .copied()
            .collect();
        let total_days = self.total_days();
        let remaining_days = outstanding_dates.len();
        let total_owed = self.total_owed()?;

        Ok(CustomerBalance {
            package_id: self.package_id,
            payment_method: self.payment_method,
            start_date: self.start_date,
            end_date: self.end_date,
            total_days,
            paid_days: total_days - remaining_days,
            remaining_days,
            total_owed,
            paid_amount,
            remaining_amount: total_owed.saturating_sub(paid_amount),
            outstanding_dates,
        })
    }
}

/// owed, paid and remaining view of a customer's plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerBalance {
    pub package_id: PackageId,
    pub payment_method: PaymentMethod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: usize,
    pub paid_days: usize,
    pub remaining_days: usize,
    pub total_owed: Money,
    pub paid_amount: Money,
    pub remaining_amount: Money,
    pub outstanding_dates: Vec<NaiveDate>,
}

impl CustomerBalance {
    pub fn is_settled(&self) -> bool {
        self.remaining_amount.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::parse_calendar_date;

    fn date(s: &str) -> NaiveDate {
        parse_calendar_date(s).unwrap()
    }

    fn package(method: PaymentMethod, rate: i64, months: Option<u32>) -> Package {
        Package::new(1, "plan", method, Money::from_major(rate), months)
    }

    #[test]
    fn test_daily_schedule_spans_calendar_months() {
        let schedule = ObligationSchedule::derive(&package(PaymentMethod::Daily, 10_000, Some(1)), date("2024-02-01")).unwrap();

        assert_eq!(schedule.end_date, date("2024-03-01"));
        assert_eq!(schedule.total_days(), 29);
        assert_eq!(schedule.total_owed().unwrap(), Money::from_major(290_000));
        assert!(schedule.contains(date("2024-02-29")));
        assert!(!schedule.contains(date("2024-03-01")));
    }

    #[test]
    fn test_month_end_start_clamps() {
        let schedule = ObligationSchedule::derive(&package(PaymentMethod::Daily, 1, Some(1)), date("2024-01-31")).unwrap();
        assert_eq!(schedule.end_date, date("2024-02-29"));
    }

    #[test]
    fn test_weekly_and_monthly_periods() {
        let weekly = ObligationSchedule::derive(&package(PaymentMethod::Weekly, 5_000, Some(1)), date("2024-01-01")).unwrap();
        // 31 days -> 5 started weeks
        assert_eq!(weekly.scheduled_periods(), 5);
        assert_eq!(weekly.total_owed().unwrap(), Money::from_major(25_000));

        let monthly = ObligationSchedule::derive(&package(PaymentMethod::Monthly, 100_000, Some(3)), date("2024-01-01")).unwrap();
        assert_eq!(monthly.total_days(), 91);
        assert_eq!(monthly.scheduled_periods(), 3);
        assert_eq!(monthly.total_owed().unwrap(), Money::from_major(300_000));
    }

    #[test]
    fn test_oversized_rate_fails_the_total() {
        let mut plan = package(PaymentMethod::Daily, 1, Some(1));
        plan.payment_amount = Money::from_decimal(rust_decimal::Decimal::MAX);
        let schedule = ObligationSchedule::derive(&plan, date("2024-01-01")).unwrap();

        assert!(matches!(schedule.total_owed(), Err(PaymentError::InvalidAmount { .. })));
        assert!(schedule.balance(&PaidDateSet::new(), Money::ZERO).is_err());
    }

    #[test]
    fn test_missing_term_is_rejected() {
        let err = ObligationSchedule::derive(&package(PaymentMethod::Daily, 1, None), date("2024-01-01")).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidArgument { .. }));
    }

    #[test]
    fn test_balance_against_paid_dates() {
        let schedule = ObligationSchedule::derive(&package(PaymentMethod::Daily, 1_000, Some(1)), date("2024-04-01")).unwrap();
        let paid: PaidDateSet = [date("2024-04-01"), date("2024-04-02"), date("2024-05-10")]
            .into_iter()
            .collect();

        let balance = schedule.balance(&paid, Money::from_major(3_000)).unwrap();
        assert_eq!(balance.total_days, 30);
        // the May date is outside the plan
        assert_eq!(balance.paid_days, 2);
        assert_eq!(balance.remaining_days, 28);
        assert_eq!(balance.total_owed, Money::from_major(30_000));
        assert_eq!(balance.remaining_amount, Money::from_major(27_000));
        assert_eq!(balance.outstanding_dates.first(), Some(&date("2024-04-03")));
        assert!(!balance.is_settled());

        let overpaid = schedule.balance(&paid, Money::from_major(40_000)).unwrap();
        assert_eq!(overpaid.remaining_amount, Money::ZERO);
        assert!(overpaid.is_settled());
    }

    #[test]
    fn test_outside_window() {
        let schedule = ObligationSchedule::derive(&package(PaymentMethod::Daily, 1, Some(1)), date("2024-01-10")).unwrap();
        let outside = schedule.outside(&[date("2024-01-09"), date("2024-01-10"), date("2024-02-10")]);
        assert_eq!(outside, vec![date("2024-01-09"), date("2024-02-10")]);
    }
}
