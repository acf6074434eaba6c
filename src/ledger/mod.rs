pub mod codec;

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::{PaymentError, Result};
use crate::store::StoreView;
use crate::types::{CustomerId, PackageId, PaymentId};

pub use codec::{decode_payment_dates, decode_payment_dates_lenient, encode_payment_dates};

/// canonical calendar-date format of the ledger
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// set of calendar dates credited as paid
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaidDateSet(BTreeSet<NaiveDate>);

impl PaidDateSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.0.contains(date)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NaiveDate> {
        self.0.iter()
    }

    /// returns false when the date was already present
    pub fn insert(&mut self, date: NaiveDate) -> bool {
        self.0.insert(date)
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.0.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.0.last().copied()
    }

    /// dates of `candidates` already in the set, ascending and deduplicated
    pub fn overlap(&self, candidates: &[NaiveDate]) -> Vec<NaiveDate> {
        let hits: BTreeSet<NaiveDate> = candidates
            .iter()
            .filter(|d| self.0.contains(d))
            .copied()
            .collect();
        hits.into_iter().collect()
    }

    /// set union with `incoming`
    pub fn merged(&self, incoming: &[NaiveDate]) -> PaidDateSet {
        let mut out = self.0.clone();
        out.extend(incoming.iter().copied());
        PaidDateSet(out)
    }

    /// set difference with `to_remove`
    pub fn subtracted(&self, to_remove: &[NaiveDate]) -> PaidDateSet {
        let mut out = self.0.clone();
        for date in to_remove {
            out.remove(date);
        }
        PaidDateSet(out)
    }

    pub fn extend_from(&mut self, other: &PaidDateSet) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn to_vec(&self) -> Vec<NaiveDate> {
        self.0.iter().copied().collect()
    }

    /// canonical `YYYY-MM-DD` strings, ascending
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|d| format_date(*d)).collect()
    }
}

impl FromIterator<NaiveDate> for PaidDateSet {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        PaidDateSet(iter.into_iter().collect())
    }
}

impl IntoIterator for PaidDateSet {
    type Item = NaiveDate;
    type IntoIter = std::collections::btree_set::IntoIter<NaiveDate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PaidDateSet {
    type Item = &'a NaiveDate;
    type IntoIter = std::collections::btree_set::Iter<'a, NaiveDate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// parse a strict `YYYY-MM-DD` calendar date
pub fn parse_calendar_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    // chrono accepts unpadded fields, the ledger does not
    if trimmed.len() != 10 {
        return Err(PaymentError::InvalidDate {
            value: raw.to_string(),
        });
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| PaymentError::InvalidDate {
        value: raw.to_string(),
    })
}

pub fn parse_calendar_dates<S: AsRef<str>>(raw: &[S]) -> Result<Vec<NaiveDate>> {
    raw.iter().map(|s| parse_calendar_date(s.as_ref())).collect()
}

/// union of `existing` and the parsed `incoming` dates
pub fn merge_dates<S: AsRef<str>>(existing: &PaidDateSet, incoming: &[S]) -> Result<PaidDateSet> {
    let dates = parse_calendar_dates(incoming)?;
    Ok(existing.merged(&dates))
}

/// `existing` without the parsed `to_remove` dates
pub fn subtract_dates<S: AsRef<str>>(existing: &PaidDateSet, to_remove: &[S]) -> Result<PaidDateSet> {
    let dates = parse_calendar_dates(to_remove)?;
    Ok(existing.subtracted(&dates))
}

/// union of `payment_dates` over the customer's confirmed payments
pub fn get_paid_dates<V: StoreView + ?Sized>(view: &V, customer_id: CustomerId) -> Result<PaidDateSet> {
    if view.customer(customer_id)?.is_none() {
        return Err(PaymentError::CustomerNotFound { id: customer_id });
    }
    credited_dates(view, customer_id, None, None)
}

/// confirmed dates of a customer, optionally narrowed to one package and
/// excluding one payment
pub(crate) fn credited_dates<V: StoreView + ?Sized>(
    view: &V,
    customer_id: CustomerId,
    package_id: Option<PackageId>,
    exclude: Option<PaymentId>,
) -> Result<PaidDateSet> {
    let mut paid = PaidDateSet::new();
    for payment in view.payments_for_customer(customer_id)? {
        if !payment.status.is_credited() {
            continue;
        }
        if package_id.is_some_and(|id| id != payment.package_id) {
            continue;
        }
        if exclude == Some(payment.id) {
            continue;
        }
        paid.extend_from(&payment.payment_dates);
    }
    Ok(paid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_calendar_date(s).unwrap()
    }

    #[test]
    fn test_parse_is_strict() {
        assert_eq!(date("2024-02-29"), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(date(" 2024-01-01 "), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        for bad in ["2023-02-29", "2024-1-01", "01/02/2024", "", "2024-01-01T00:00:00Z"] {
            let err = parse_calendar_date(bad).unwrap_err();
            assert!(matches!(err, PaymentError::InvalidDate { .. }), "{bad}");
        }
    }

    #[test]
    fn test_merge_collapses_duplicates() {
        let existing: PaidDateSet = [date("2024-01-01")].into_iter().collect();
        let merged = merge_dates(&existing, &["2024-01-02", "2024-01-01", "2024-01-02"]).unwrap();

        assert_eq!(merged.to_strings(), vec!["2024-01-01", "2024-01-02"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let existing: PaidDateSet = [date("2023-12-31"), date("2024-01-05")].into_iter().collect();
        let incoming = ["2024-01-05", "2024-01-06", "2024-01-07"];

        let once = merge_dates(&existing, &incoming).unwrap();
        let twice = merge_dates(&once, &incoming).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_rejects_malformed_input() {
        let err = merge_dates(&PaidDateSet::new(), &["2024-01-01", "tomorrow"]).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidDate { value } if value == "tomorrow"));
    }

    #[test]
    fn test_subtract_restores_previous_set() {
        let before: PaidDateSet = [date("2024-01-01")].into_iter().collect();
        let added = ["2024-02-01", "2024-02-02"];

        let after = merge_dates(&before, &added).unwrap();
        let rolled_back = subtract_dates(&after, &added).unwrap();
        assert_eq!(rolled_back, before);

        // removing absent dates is harmless
        let same = subtract_dates(&before, &["2030-01-01"]).unwrap();
        assert_eq!(same, before);
    }

    #[test]
    fn test_overlap_reports_sorted_unique_hits() {
        let paid: PaidDateSet = [date("2024-01-01"), date("2024-01-02")].into_iter().collect();
        let hits = paid.overlap(&[date("2024-01-02"), date("2024-01-03"), date("2024-01-02"), date("2024-01-01")]);
        assert_eq!(hits, vec![date("2024-01-01"), date("2024-01-02")]);
    }
}
