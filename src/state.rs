use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{PaymentError, Result};
use crate::ledger::{self, PaidDateSet};
use crate::types::{CustomerId, PackageId, PaymentId, PaymentStatus, UserId};

/// customer projection the engine reads and maintains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub package_id: Option<PackageId>,
    pub package_start_date: Option<NaiveDate>,
    /// cached sum of confirmed payment amounts
    pub paid_amount: Money,
    pub last_payment_date: Option<DateTime<Utc>>,
    pub reseller_id: Option<UserId>,
}

impl Customer {
    pub fn new(id: CustomerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            package_id: None,
            package_start_date: None,
            paid_amount: Money::ZERO,
            last_payment_date: None,
            reseller_id: None,
        }
    }

    pub fn with_package(mut self, package_id: PackageId, start_date: NaiveDate) -> Self {
        self.package_id = Some(package_id);
        self.package_start_date = Some(start_date);
        self
    }

    pub fn with_reseller(mut self, reseller_id: UserId) -> Self {
        self.reseller_id = Some(reseller_id);
        self
    }

    /// credit a confirmed amount; `last_payment_date` only moves forward
    pub fn credit(&mut self, amount: Money, payment_date: DateTime<Utc>) -> Result<()> {
        self.paid_amount = self
            .paid_amount
            .checked_add(amount)
            .ok_or_else(|| PaymentError::amount_overflow("customer paid amount"))?;
        self.last_payment_date = self.last_payment_date.max(Some(payment_date));
        Ok(())
    }

    /// debit a canceled amount; returns false when the cache would have gone
    /// negative and was clamped
    pub fn debit(&mut self, amount: Money) -> bool {
        match self.paid_amount.checked_sub(amount) {
            Some(remaining) if !remaining.is_negative() => {
                self.paid_amount = remaining;
                true
            }
            _ => {
                self.paid_amount = Money::ZERO;
                false
            }
        }
    }
}

/// a payment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: CustomerId,
    pub package_id: PackageId,
    pub amount: Money,
    /// when the payment was confirmed or recorded
    pub payment_date: DateTime<Utc>,
    /// obligation dates covered by this payment
    pub payment_dates: PaidDateSet,
    pub status: PaymentStatus,
    pub payment_start_date: Option<NaiveDate>,
    pub payment_months: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: CustomerId,
        package_id: PackageId,
        amount: Money,
        payment_date: DateTime<Utc>,
        payment_dates: PaidDateSet,
        status: PaymentStatus,
        payment_start_date: Option<NaiveDate>,
        payment_months: Option<u32>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            package_id,
            amount,
            payment_date,
            payment_dates,
            status,
            payment_start_date,
            payment_months,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == PaymentStatus::Confirmed
    }

    /// persisted form with the date set serialized into its text column
    pub fn to_row(&self) -> Result<PaymentRow> {
        Ok(PaymentRow {
            id: self.id,
            user_id: self.user_id,
            package_id: self.package_id,
            amount: self.amount,
            payment_date: self.payment_date,
            payment_dates: ledger::encode_payment_dates(&self.payment_dates)?,
            status: self.status,
            payment_start_date: self.payment_start_date,
            payment_months: self.payment_months,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    /// rebuild from a stored row; an unreadable date column reads as empty
    pub fn from_row(row: &PaymentRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            package_id: row.package_id,
            amount: row.amount,
            payment_date: row.payment_date,
            payment_dates: ledger::decode_payment_dates_lenient(row.id, &row.payment_dates),
            status: row.status,
            payment_start_date: row.payment_start_date,
            payment_months: row.payment_months,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// payment as stored: `payment_dates` is a json text column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRow {
    pub id: PaymentId,
    pub user_id: CustomerId,
    pub package_id: PackageId,
    pub amount: Money,
    pub payment_date: DateTime<Utc>,
    pub payment_dates: String,
    pub status: PaymentStatus,
    pub payment_start_date: Option<NaiveDate>,
    pub payment_months: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_payment() -> Payment {
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap();
        let dates: PaidDateSet = ledger::parse_calendar_dates(&["2024-01-02", "2024-01-01"])
            .unwrap()
            .into_iter()
            .collect();
        Payment::new(
            1,
            10,
            Money::from_major(20_000),
            now,
            dates,
            PaymentStatus::Confirmed,
            NaiveDate::from_ymd_opt(2024, 1, 1),
            None,
            now,
        )
    }

    #[test]
    fn test_row_round_trip() {
        let payment = sample_payment();
        let row = payment.to_row().unwrap();
        assert_eq!(row.payment_dates, r#"["2024-01-01","2024-01-02"]"#);

        let back = Payment::from_row(&row);
        assert_eq!(back, payment);
    }

    #[test]
    fn test_corrupt_row_reads_as_empty_dates() {
        let mut row = sample_payment().to_row().unwrap();
        row.payment_dates = "2024-01-01,2024-01-02".to_string();

        let payment = Payment::from_row(&row);
        assert!(payment.payment_dates.is_empty());
        assert_eq!(payment.amount, Money::from_major(20_000));
    }

    #[test]
    fn test_customer_credit_and_debit() {
        let paid_at = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let mut customer = Customer::new(1, "Sari");

        customer.credit(Money::from_major(1_000), paid_at).unwrap();
        assert_eq!(customer.paid_amount, Money::from_major(1_000));
        assert_eq!(customer.last_payment_date, Some(paid_at));

        assert!(customer.debit(Money::from_major(400)));
        assert_eq!(customer.paid_amount, Money::from_major(600));

        // drifted cache is clamped rather than going negative
        assert!(!customer.debit(Money::from_major(1_000)));
        assert_eq!(customer.paid_amount, Money::ZERO);
    }

    #[test]
    fn test_backdated_credit_keeps_latest_date() {
        let latest = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let older = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        let mut customer = Customer::new(1, "Sari");

        customer.credit(Money::from_major(100), latest).unwrap();
        customer.credit(Money::from_major(100), older).unwrap();

        assert_eq!(customer.last_payment_date, Some(latest));
        assert_eq!(customer.paid_amount, Money::from_major(200));
    }

    #[test]
    fn test_credit_overflow_leaves_customer_untouched() {
        let paid_at = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let mut customer = Customer::new(1, "Sari");
        customer
            .credit(Money::from_decimal(rust_decimal::Decimal::MAX), paid_at)
            .unwrap();
        let before = customer.clone();

        let err = customer.credit(Money::from_major(1), paid_at).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidAmount { .. }));
        assert_eq!(customer, before);
    }

    #[test]
    fn test_payment_json_shape() {
        let json = serde_json::to_value(sample_payment()).unwrap();
        assert_eq!(json["status"], "CONFIRMED");
        assert_eq!(json["payment_dates"], serde_json::json!(["2024-01-01", "2024-01-02"]));
        assert_eq!(json["amount"], "20000");
    }
}
