//! text-column form of `payment_dates`: a json array of `YYYY-MM-DD` strings
use crate::errors::Result;
use crate::ledger::{parse_calendar_date, PaidDateSet};
use crate::types::PaymentId;

pub fn encode_payment_dates(dates: &PaidDateSet) -> Result<String> {
    Ok(serde_json::to_string(&dates.to_strings())?)
}

/// strict decode; empty and `null` columns read as an empty set
pub fn decode_payment_dates(text: &str) -> Result<PaidDateSet> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(PaidDateSet::new());
    }

    let raw: Vec<String> = serde_json::from_str(trimmed)?;
    raw.iter().map(|s| parse_calendar_date(s)).collect()
}

/// decode for read paths: a corrupt column degrades to an empty set so one
/// bad row cannot block aggregate reads
pub fn decode_payment_dates_lenient(payment_id: PaymentId, text: &str) -> PaidDateSet {
    match decode_payment_dates(text) {
        Ok(dates) => dates,
        Err(e) => {
            tracing::warn!(
                payment_id = %payment_id,
                error = %e,
                "unreadable payment_dates column, treating as empty"
            );
            PaidDateSet::new()
        }
    }
}
