pub mod reconciler;
pub mod recorder;

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::errors::{PaymentError, Result};
use crate::ledger;
use crate::types::{CustomerId, PackageId, PaymentMethod};

pub use reconciler::{StatusChange, StatusReconciler};
pub use recorder::{PaymentRecorder, RecordOutcome};

/// payment request as submitted by the web layer
///
/// Every field is optional so that missing values are reported as
/// `InvalidArgument` rather than as deserialization failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentSubmission {
    #[serde(alias = "userId")]
    pub customer_id: Option<CustomerId>,
    pub package_id: Option<PackageId>,
    pub amount: Option<Decimal>,
    /// RFC 3339 timestamp or `YYYY-MM-DD` (midnight UTC)
    pub payment_date: Option<String>,
    #[serde(alias = "dates")]
    pub selected_dates: Vec<String>,
    pub payment_method: Option<String>,
}

impl PaymentSubmission {
    pub fn new(customer_id: CustomerId, package_id: PackageId) -> Self {
        Self {
            customer_id: Some(customer_id),
            package_id: Some(package_id),
            ..Self::default()
        }
    }

    pub fn with_dates<S: AsRef<str>>(mut self, dates: &[S]) -> Self {
        self.selected_dates = dates.iter().map(|d| d.as_ref().to_string()).collect();
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn paid_on(mut self, payment_date: impl Into<String>) -> Self {
        self.payment_date = Some(payment_date.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = Some(method.into());
        self
    }

    /// check presence and shape of every field
    pub fn validate(&self, config: &EngineConfig) -> Result<ConfirmPayment> {
        let customer_id = self.customer_id.ok_or_else(|| missing("customerId"))?;
        let package_id = self.package_id.ok_or_else(|| missing("packageId"))?;

        let raw_date = self
            .payment_date
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| missing("paymentDate"))?;
        let payment_date = parse_payment_date(raw_date)?;

        if self.selected_dates.is_empty() {
            return Err(PaymentError::InvalidArgument {
                message: "selectedDates must contain at least one date".to_string(),
            });
        }
        let selected: BTreeSet<NaiveDate> = ledger::parse_calendar_dates(&self.selected_dates)?
            .into_iter()
            .collect();

        let amount = match self.amount {
            Some(raw) => {
                let amount = Money::from_decimal(raw);
                if !amount.is_positive() {
                    return Err(PaymentError::InvalidAmount {
                        message: format!("amount must be positive, got {}", raw),
                    });
                }
                Some(amount)
            }
            None => None,
        };

        let payment_method = self
            .payment_method
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|raw| config.parse_cadence(raw))
            .transpose()?;

        Ok(ConfirmPayment {
            customer_id,
            package_id,
            amount,
            payment_date,
            selected_dates: selected.into_iter().collect(),
            payment_method,
        })
    }
}

/// validated payment request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPayment {
    pub customer_id: CustomerId,
    pub package_id: PackageId,
    /// caller amount, if any; see `AmountPolicy`
    pub amount: Option<Money>,
    pub payment_date: DateTime<Utc>,
    /// ascending, deduplicated, never empty
    pub selected_dates: Vec<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
}

fn missing(field: &str) -> PaymentError {
    PaymentError::InvalidArgument {
        message: format!("{} is required", field),
    }
}

/// RFC 3339 timestamp, or a calendar date read as midnight UTC
pub fn parse_payment_date(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = ledger::parse_calendar_date(trimmed)?;
    Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CadenceFallback;
    use rust_decimal_macros::dec;

    fn submission() -> PaymentSubmission {
        PaymentSubmission::new(1, 2)
            .with_dates(&["2024-01-02", "2024-01-01", "2024-01-02"])
            .paid_on("2024-01-05")
    }

    #[test]
    fn test_validate_normalizes_dates() {
        let cmd = submission().validate(&EngineConfig::default()).unwrap();

        assert_eq!(cmd.selected_dates.len(), 2);
        assert!(cmd.selected_dates[0] < cmd.selected_dates[1]);
        assert_eq!(cmd.payment_date, Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap());
        assert_eq!(cmd.amount, None);
    }

    #[test]
    fn test_missing_fields_are_invalid_arguments() {
        let config = EngineConfig::default();
        let cases = [
            PaymentSubmission { customer_id: None, ..submission() },
            PaymentSubmission { package_id: None, ..submission() },
            PaymentSubmission { payment_date: None, ..submission() },
            PaymentSubmission { payment_date: Some(" ".into()), ..submission() },
            PaymentSubmission { selected_dates: vec![], ..submission() },
        ];
        for case in cases {
            let err = case.validate(&config).unwrap_err();
            assert!(matches!(err, PaymentError::InvalidArgument { .. }), "{err}");
        }
    }

    #[test]
    fn test_bad_values_rejected() {
        let config = EngineConfig::default();

        let err = submission().with_dates(&["2024-13-01"]).validate(&config).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidDate { .. }));

        let err = submission().paid_on("yesterday").validate(&config).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidDate { .. }));

        let err = submission().with_amount(dec!(-5)).validate(&config).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidAmount { .. }));

        let err = submission().with_method("yearly").validate(&config).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidPaymentMethod { .. }));
    }

    #[test]
    fn test_lenient_cadence_falls_back_to_daily() {
        let config = EngineConfig::default().with_cadence_fallback(CadenceFallback::Daily);
        let cmd = submission().with_method("yearly").validate(&config).unwrap();
        assert_eq!(cmd.payment_method, Some(PaymentMethod::Daily));
    }

    #[test]
    fn test_rfc3339_payment_date() {
        let ts = parse_payment_date("2024-01-05T10:30:00+07:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 5, 3, 30, 0).unwrap());
    }

    #[test]
    fn test_deserializes_web_payload() {
        let body = r#"{
            "userId": 4,
            "packageId": 9,
            "amount": "15000",
            "paymentDate": "2024-03-01",
            "dates": ["2024-03-01"],
            "paymentMethod": "daily"
        }"#;
        let submission: PaymentSubmission = serde_json::from_str(body).unwrap();
        let cmd = submission.validate(&EngineConfig::default()).unwrap();

        assert_eq!(cmd.customer_id, 4);
        assert_eq!(cmd.amount, Some(Money::from_major(15_000)));
        assert_eq!(cmd.payment_method, Some(PaymentMethod::Daily));
    }
}
