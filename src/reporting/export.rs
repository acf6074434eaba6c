use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{PaymentError, Result};
use crate::ledger;
use crate::state::Payment;
use crate::store::{Catalog, StoreView};
use crate::types::{CustomerId, Package};

/// export filter; an absent bound or list means "all"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub customer_ids: Option<BTreeSet<CustomerId>>,
}

impl ExportFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// filter from query-string values: dates as `YYYY-MM-DD`, ids comma separated
    pub fn from_query(start_date: Option<&str>, end_date: Option<&str>, user_ids: Option<&str>) -> Result<Self> {
        let parse = |raw: Option<&str>| -> Result<Option<NaiveDate>> {
            match raw.map(str::trim).filter(|s| !s.is_empty()) {
                Some(s) => ledger::parse_calendar_date(s).map(Some),
                None => Ok(None),
            }
        };

        let customer_ids = match user_ids.map(str::trim).filter(|s| !s.is_empty()) {
            Some(list) => Some(
                list.split(',')
                    .map(|id| {
                        id.trim().parse::<CustomerId>().map_err(|_| PaymentError::InvalidArgument {
                            message: format!("invalid customer id {:?}", id),
                        })
                    })
                    .collect::<Result<BTreeSet<_>>>()?,
            ),
            None => None,
        };

        let filter = Self {
            start_date: parse(start_date)?,
            end_date: parse(end_date)?,
            customer_ids,
        };
        filter.validate()?;
        Ok(filter)
    }

    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn for_customers(mut self, ids: impl IntoIterator<Item = CustomerId>) -> Self {
        self.customer_ids = Some(ids.into_iter().collect());
        self
    }

    pub fn validate(&self) -> Result<()> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start > end => Err(PaymentError::InvalidArgument {
                message: format!("start date {} is after end date {}", start, end),
            }),
            _ => Ok(()),
        }
    }

    pub fn includes_customer(&self, id: CustomerId) -> bool {
        self.customer_ids.as_ref().map_or(true, |ids| ids.contains(&id))
    }

    /// inclusive on both ends, on the calendar date of `payment_date`
    pub fn includes_payment(&self, payment: &Payment) -> bool {
        let day = payment.payment_date.date_naive();
        self.start_date.map_or(true, |start| day >= start) && self.end_date.map_or(true, |end| day <= end)
    }
}

/// one exported customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerExport {
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub package: Option<Package>,
    /// payments in range, newest first
    pub payments: Vec<Payment>,
    pub total_payments: Money,
    pub last_payment_date: Option<DateTime<Utc>>,
}

/// customers with at least one payment matching `filter`
pub fn export_all<V, C>(view: &V, catalog: &C, filter: &ExportFilter) -> Result<Vec<CustomerExport>>
where
    V: StoreView + ?Sized,
    C: Catalog + ?Sized,
{
    filter.validate()?;

    let mut out = Vec::new();
    for customer in view.customers()? {
        if !filter.includes_customer(customer.id) {
            continue;
        }

        let mut payments: Vec<Payment> = view
            .payments_for_customer(customer.id)?
            .into_iter()
            .filter(|p| filter.includes_payment(p))
            .collect();
        if payments.is_empty() {
            continue;
        }
        payments.reverse();

        let confirmed = payments.iter().filter(|p| p.is_confirmed());
        let total_payments = Money::checked_sum(confirmed.clone().map(|p| p.amount))
            .ok_or_else(|| PaymentError::total_overflow("exported payment total"))?;
        let last_payment_date = confirmed.map(|p| p.payment_date).max();

        let package = match customer.package_id {
            Some(id) => catalog.package(id)?,
            None => None,
        };

        out.push(CustomerExport {
            customer_id: customer.id,
            customer_name: customer.name,
            package,
            payments,
            total_payments,
            last_payment_date,
        });
    }

    tracing::debug!(customers = out.len(), "export built");
    Ok(out)
}
