pub mod export;

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{PaymentError, Result};
use crate::ledger::PaidDateSet;
use crate::state::Payment;
use crate::store::{Catalog, StoreView};
use crate::types::{CustomerId, PackageId, PaymentMethod, PaymentStatus};

pub use export::{export_all, CustomerExport, ExportFilter};

/// per-customer rollup, computed from payments on every read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerPaymentSummary {
    pub customer_id: CustomerId,
    /// sum over confirmed payments
    pub total_paid: Money,
    /// cached `paid_amount` on the customer record
    pub cached_paid_amount: Money,
    pub last_payment_date: Option<DateTime<Utc>>,
    pub paid_dates: PaidDateSet,
    pub confirmed_payments: usize,
    pub pending_payments: usize,
}

impl CustomerPaymentSummary {
    /// false when the cached total has drifted from the payments
    pub fn is_consistent(&self) -> bool {
        self.total_paid == self.cached_paid_amount
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTotal {
    /// `YYYY-MM`
    pub month: String,
    pub total: Money,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodTotal {
    pub payment_method: PaymentMethod,
    pub total: Money,
    pub count: usize,
}

/// global rollup over confirmed payments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub monthly_payments: Vec<MonthlyTotal>,
    pub payment_method_summary: Vec<MethodTotal>,
}

/// a payment with the customer and package names shown beside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentListing {
    #[serde(flatten)]
    pub payment: Payment,
    /// `None` when the customer record is gone
    pub user_name: Option<String>,
    /// `None` when the package is missing from the catalog
    pub package_name: Option<String>,
}

/// every payment across customers, newest `payment_date` first
pub fn all_payments<V, C>(view: &V, catalog: &C) -> Result<Vec<PaymentListing>>
where
    V: StoreView + ?Sized,
    C: Catalog + ?Sized,
{
    let customer_names: HashMap<CustomerId, String> = view
        .customers()?
        .into_iter()
        .map(|customer| (customer.id, customer.name))
        .collect();
    let mut package_names: HashMap<PackageId, Option<String>> = HashMap::new();

    let mut listing = Vec::new();
    for payment in view.payments()?.into_iter().rev() {
        let package_name = match package_names.get(&payment.package_id) {
            Some(name) => name.clone(),
            None => {
                let name = catalog.package(payment.package_id)?.map(|package| package.name);
                if name.is_none() {
                    tracing::warn!(package_id = payment.package_id, "package missing from catalog");
                }
                package_names.insert(payment.package_id, name.clone());
                name
            }
        };
        listing.push(PaymentListing {
            user_name: customer_names.get(&payment.user_id).cloned(),
            package_name,
            payment,
        });
    }
    Ok(listing)
}

/// payments of a customer, newest `payment_date` first
pub fn payments_by_customer<V: StoreView + ?Sized>(view: &V, customer_id: CustomerId) -> Result<Vec<Payment>> {
    if view.customer(customer_id)?.is_none() {
        return Err(PaymentError::CustomerNotFound { id: customer_id });
    }
    let mut payments = view.payments_for_customer(customer_id)?;
    payments.reverse();
    Ok(payments)
}

pub fn customer_summary<V: StoreView + ?Sized>(view: &V, customer_id: CustomerId) -> Result<CustomerPaymentSummary> {
    let customer = view
        .customer(customer_id)?
        .ok_or(PaymentError::CustomerNotFound { id: customer_id })?;

    let mut summary = CustomerPaymentSummary {
        customer_id,
        total_paid: Money::ZERO,
        cached_paid_amount: customer.paid_amount,
        last_payment_date: None,
        paid_dates: PaidDateSet::new(),
        confirmed_payments: 0,
        pending_payments: 0,
    };

    for payment in view.payments_for_customer(customer_id)? {
        match payment.status {
            PaymentStatus::Confirmed => {
                summary.total_paid = summary
                    .total_paid
                    .checked_add(payment.amount)
                    .ok_or_else(|| PaymentError::total_overflow("customer payment total"))?;
                summary.last_payment_date = summary.last_payment_date.max(Some(payment.payment_date));
                summary.paid_dates.extend_from(&payment.payment_dates);
                summary.confirmed_payments += 1;
            }
            PaymentStatus::Pending => summary.pending_payments += 1,
            PaymentStatus::Canceled => {}
        }
    }

    if !summary.is_consistent() {
        tracing::warn!(
            customer_id,
            cached = %summary.cached_paid_amount,
            actual = %summary.total_paid,
            "cached paid amount differs from confirmed payments"
        );
    }
    Ok(summary)
}

/// monthly and per-cadence totals of confirmed payments
pub fn payment_summary<V, C>(view: &V, catalog: &C) -> Result<PaymentSummary>
where
    V: StoreView + ?Sized,
    C: Catalog + ?Sized,
{
    let mut monthly: BTreeMap<String, (Money, usize)> = BTreeMap::new();
    let mut by_method: BTreeMap<PaymentMethod, (Money, usize)> = BTreeMap::new();

    for payment in view.payments()?.into_iter().filter(Payment::is_confirmed) {
        let month = payment.payment_date.format("%Y-%m").to_string();
        accumulate(monthly.entry(month).or_insert((Money::ZERO, 0)), payment.amount, "monthly total")?;

        match catalog.package(payment.package_id)? {
            Some(package) => accumulate(
                by_method.entry(package.payment_method).or_insert((Money::ZERO, 0)),
                payment.amount,
                "payment method total",
            )?,
            None => tracing::warn!(
                payment_id = %payment.id,
                package_id = payment.package_id,
                "package missing from catalog, left out of method totals"
            ),
        }
    }

    Ok(PaymentSummary {
        monthly_payments: monthly
            .into_iter()
            .map(|(month, (total, count))| MonthlyTotal { month, total, count })
            .collect(),
        // BTreeMap order follows the enum: DAILY, WEEKLY, MONTHLY
        payment_method_summary: by_method
            .into_iter()
            .map(|(payment_method, (total, count))| MethodTotal {
                payment_method,
                total,
                count,
            })
            .collect(),
    })
}

fn accumulate(slot: &mut (Money, usize), amount: Money, what: &str) -> Result<()> {
    slot.0 = slot.0.checked_add(amount).ok_or_else(|| PaymentError::total_overflow(what))?;
    slot.1 += 1;
    Ok(())
}
