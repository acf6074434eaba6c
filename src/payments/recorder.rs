use chrono::{DateTime, NaiveDate, Utc};

use crate::access::{self, Access};
use crate::accrual::{AccrualCalculator, ObligationSchedule};
use crate::config::{AmountPolicy, EngineConfig, LedgerScope, RecordModel};
use crate::decimal::Money;
use crate::errors::{PaymentError, Result};
use crate::events::Event;
use crate::ledger;
use crate::payments::ConfirmPayment;
use crate::state::{Customer, Payment};
use crate::store::{Catalog, StoreTx, StoreView};
use crate::types::{Actor, CustomerId, Package, PackageId, PaymentStatus};

/// result of one write through the recorder
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    /// the row as persisted
    pub payment: Payment,
    /// amount this call added; zero for pending rows
    pub credited: Money,
    /// dates this call added to the row
    pub added_dates: Vec<NaiveDate>,
    /// true when the dates were merged into an existing confirmed row
    pub merged: bool,
    pub customer: Customer,
    pub events: Vec<Event>,
}

/// checked request, ready to be written
struct Prepared {
    customer: Customer,
    package: Package,
    calculator: AccrualCalculator,
    amount: Money,
}

/// write path for payments
///
/// Every method runs against an open store transaction; callers commit or
/// roll back as a unit.
pub struct PaymentRecorder<'a> {
    config: &'a EngineConfig,
    catalog: &'a dyn Catalog,
    actor: &'a Actor,
    now: DateTime<Utc>,
}

impl<'a> PaymentRecorder<'a> {
    pub fn new(config: &'a EngineConfig, catalog: &'a dyn Catalog, actor: &'a Actor, now: DateTime<Utc>) -> Self {
        Self {
            config,
            catalog,
            actor,
            now,
        }
    }

    /// credit the selected dates to the customer
    pub fn confirm(&self, tx: &mut dyn StoreTx, cmd: &ConfirmPayment) -> Result<RecordOutcome> {
        let Prepared {
            mut customer,
            package,
            calculator,
            amount,
        } = self.prepare(&*tx, cmd)?;

        let existing = match self.config.record_model {
            RecordModel::Accumulate => open_row(&*tx, customer.id, package.id)?,
            RecordModel::PerConfirmation => None,
        };

        let (payment, merged) = match existing {
            Some(mut payment) => {
                payment.payment_dates = payment.payment_dates.merged(&cmd.selected_dates);
                payment.amount = payment
                    .amount
                    .checked_add(amount)
                    .ok_or_else(|| PaymentError::amount_overflow("accumulated payment amount"))?;
                payment.payment_date = payment.payment_date.max(cmd.payment_date);
                payment.payment_months = calculator.payment_months(payment.payment_dates.len());
                payment.updated_at = self.now;
                tx.update_payment(&payment)?;
                (payment, true)
            }
            None => {
                let payment = Payment::new(
                    customer.id,
                    package.id,
                    amount,
                    cmd.payment_date,
                    cmd.selected_dates.iter().copied().collect(),
                    PaymentStatus::Confirmed,
                    start_date(&customer, cmd),
                    calculator.payment_months(cmd.selected_dates.len()),
                    self.now,
                );
                tx.insert_payment(&payment)?;
                (payment, false)
            }
        };

        customer.credit(amount, cmd.payment_date)?;
        tx.update_customer(&customer)?;

        tracing::info!(
            customer_id = customer.id,
            package_id = package.id,
            payment_id = %payment.id,
            amount = %amount,
            dates = cmd.selected_dates.len(),
            merged,
            "payment confirmed"
        );

        let mut events = Vec::with_capacity(2);
        if merged {
            events.push(Event::PaymentDatesMerged {
                payment_id: payment.id,
                customer_id: customer.id,
                added: cmd.selected_dates.clone(),
                new_amount: payment.amount,
                timestamp: self.now,
            });
        } else {
            events.push(Event::PaymentConfirmed {
                payment_id: payment.id,
                customer_id: customer.id,
                package_id: package.id,
                amount,
                dates: cmd.selected_dates.clone(),
                timestamp: self.now,
            });
        }
        events.push(totals_event(&customer, self.now));

        Ok(RecordOutcome {
            payment,
            credited: amount,
            added_dates: cmd.selected_dates.clone(),
            merged,
            customer,
            events,
        })
    }

    /// record a payment awaiting confirmation; totals are untouched
    pub fn record_pending(&self, tx: &mut dyn StoreTx, cmd: &ConfirmPayment) -> Result<RecordOutcome> {
        let Prepared {
            customer,
            package,
            calculator,
            amount,
        } = self.prepare(&*tx, cmd)?;

        let payment = Payment::new(
            customer.id,
            package.id,
            amount,
            cmd.payment_date,
            cmd.selected_dates.iter().copied().collect(),
            PaymentStatus::Pending,
            start_date(&customer, cmd),
            calculator.payment_months(cmd.selected_dates.len()),
            self.now,
        );
        tx.insert_payment(&payment)?;

        tracing::info!(
            customer_id = customer.id,
            package_id = package.id,
            payment_id = %payment.id,
            amount = %amount,
            "pending payment recorded"
        );

        let events = vec![Event::PaymentRecordedPending {
            payment_id: payment.id,
            customer_id: customer.id,
            package_id: package.id,
            amount,
            timestamp: self.now,
        }];

        Ok(RecordOutcome {
            payment,
            credited: Money::ZERO,
            added_dates: cmd.selected_dates.clone(),
            merged: false,
            customer,
            events,
        })
    }

    /// confirm every request or none; later items see earlier items' dates
    pub fn confirm_bulk(&self, tx: &mut dyn StoreTx, cmds: &[ConfirmPayment]) -> Result<Vec<RecordOutcome>> {
        if cmds.is_empty() {
            return Err(PaymentError::InvalidArgument {
                message: "bulk confirmation needs at least one payment".to_string(),
            });
        }
        cmds.iter().map(|cmd| self.confirm(tx, cmd)).collect()
    }

    /// recompute the cached totals from confirmed payments
    pub fn rebuild_totals(&self, tx: &mut dyn StoreTx, customer_id: CustomerId) -> Result<(Customer, Vec<Event>)> {
        let mut customer = tx
            .customer(customer_id)?
            .ok_or(PaymentError::CustomerNotFound { id: customer_id })?;
        access::authorize(self.actor, &customer, Access::Write)?;

        let confirmed: Vec<Payment> = tx
            .payments_for_customer(customer_id)?
            .into_iter()
            .filter(Payment::is_confirmed)
            .collect();
        let paid_amount = Money::checked_sum(confirmed.iter().map(|p| p.amount))
            .ok_or_else(|| PaymentError::total_overflow("confirmed payment total"))?;
        let last_payment_date = confirmed.iter().map(|p| p.payment_date).max();

        if customer.paid_amount != paid_amount {
            tracing::warn!(
                customer_id,
                cached = %customer.paid_amount,
                actual = %paid_amount,
                "paid amount cache drifted, rebuilding"
            );
        }
        customer.paid_amount = paid_amount;
        customer.last_payment_date = last_payment_date;
        tx.update_customer(&customer)?;

        let event = totals_event(&customer, self.now);
        Ok((customer, vec![event]))
    }

    /// checks shared by every write, in order: customer, access, package,
    /// cadence, ledger, schedule window, amount
    fn prepare<V: StoreView + ?Sized>(&self, view: &V, cmd: &ConfirmPayment) -> Result<Prepared> {
        let customer = view
            .customer(cmd.customer_id)?
            .ok_or(PaymentError::CustomerNotFound { id: cmd.customer_id })?;
        access::authorize(self.actor, &customer, Access::Write)?;

        let package = self
            .catalog
            .package(cmd.package_id)?
            .ok_or(PaymentError::PackageNotFound { id: cmd.package_id })?;

        if let Some(method) = cmd.payment_method {
            if method != package.payment_method {
                return Err(PaymentError::InvalidArgument {
                    message: format!(
                        "payment method {} does not match package {} ({})",
                        method, package.id, package.payment_method
                    ),
                });
            }
        }

        self.check_duplicates(view, &customer, package.id, &cmd.selected_dates)?;

        if self.config.enforce_schedule_window {
            check_schedule_window(&customer, &package, &cmd.selected_dates)?;
        }

        let calculator = AccrualCalculator::new(package.payment_method);
        let derived = calculator.amount(package.payment_amount, cmd.selected_dates.len())?;
        let amount = self.resolve_amount(cmd.amount, derived)?;

        Ok(Prepared {
            customer,
            package,
            calculator,
            amount,
        })
    }

    fn check_duplicates<V: StoreView + ?Sized>(
        &self,
        view: &V,
        customer: &Customer,
        package_id: PackageId,
        selected: &[NaiveDate],
    ) -> Result<()> {
        let paid = ledger::credited_dates(view, customer.id, ledger_scope(self.config, package_id), None)?;
        let duplicates = paid.overlap(selected);
        if duplicates.is_empty() {
            return Ok(());
        }

        tracing::warn!(
            customer_id = customer.id,
            package_id,
            duplicates = ?duplicates,
            "payment dates already paid"
        );
        Err(PaymentError::DuplicatePaymentDate { dates: duplicates })
    }

    fn resolve_amount(&self, submitted: Option<Money>, derived: Money) -> Result<Money> {
        match (self.config.amount_policy, submitted) {
            (_, None) => Ok(derived),
            (AmountPolicy::Derived, Some(amount)) if amount == derived => Ok(derived),
            (AmountPolicy::Derived, Some(amount)) => Err(PaymentError::InvalidAmount {
                message: format!("amount {} does not match the computed amount {}", amount, derived),
            }),
            (AmountPolicy::CallerOverride, Some(amount)) => {
                if amount != derived {
                    tracing::warn!(submitted = %amount, computed = %derived, "using caller supplied amount");
                }
                Ok(amount)
            }
        }
    }
}

/// package filter of the duplicate-date check
pub(crate) fn ledger_scope(config: &EngineConfig, package_id: PackageId) -> Option<PackageId> {
    match config.ledger_scope {
        LedgerScope::Customer => None,
        LedgerScope::CustomerPackage => Some(package_id),
    }
}

/// latest confirmed row of (customer, package), the one confirmations accumulate into
fn open_row<V: StoreView + ?Sized>(view: &V, customer_id: CustomerId, package_id: PackageId) -> Result<Option<Payment>> {
    Ok(view
        .payments_for_customer(customer_id)?
        .into_iter()
        .filter(|p| p.package_id == package_id && p.is_confirmed())
        .last())
}

fn start_date(customer: &Customer, cmd: &ConfirmPayment) -> Option<NaiveDate> {
    customer
        .package_start_date
        .or_else(|| cmd.selected_dates.first().copied())
}

fn check_schedule_window(customer: &Customer, package: &Package, selected: &[NaiveDate]) -> Result<()> {
    let start = match customer.package_start_date {
        Some(start) if customer.package_id == Some(package.id) && package.payment_months.is_some() => start,
        _ => return Ok(()),
    };
    let schedule = ObligationSchedule::derive(package, start)?;
    let outside = schedule.outside(selected);
    if outside.is_empty() {
        return Ok(());
    }
    Err(PaymentError::InvalidArgument {
        message: format!(
            "dates outside the payment schedule {} to {}: {}",
            schedule.start_date,
            schedule.end_date,
            outside
                .iter()
                .map(|d| ledger::format_date(*d))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    })
}

pub(crate) fn totals_event(customer: &Customer, now: DateTime<Utc>) -> Event {
    Event::CustomerTotalsUpdated {
        customer_id: customer.id,
        paid_amount: customer.paid_amount,
        last_payment_date: customer.last_payment_date,
        timestamp: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecordModel;
    use crate::store::{MemoryStore, PaymentStore, StaticCatalog};
    use crate::types::PaymentMethod;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        ledger::parse_calendar_date(s).unwrap()
    }

    fn catalog() -> StaticCatalog {
        StaticCatalog::from_packages([
            Package::new(1, "Harian", PaymentMethod::Daily, Money::from_major(10_000), Some(2)),
            Package::new(2, "Mingguan", PaymentMethod::Weekly, Money::from_major(5_000), Some(2)),
        ])
        .unwrap()
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert_customer(Customer::new(7, "Rina").with_package(1, date("2024-01-01")))
            .unwrap();
        store
    }

    fn cmd(package_id: PackageId, dates: &[&str]) -> ConfirmPayment {
        ConfirmPayment {
            customer_id: 7,
            package_id,
            amount: None,
            payment_date: now(),
            selected_dates: dates.iter().map(|d| date(d)).collect(),
            payment_method: None,
        }
    }

    #[test]
    fn test_accumulates_into_one_row() {
        let (store, catalog, config, admin) = (store(), catalog(), EngineConfig::default(), Actor::admin(1));
        let recorder = PaymentRecorder::new(&config, &catalog, &admin, now());

        let first = store.transaction(|tx| recorder.confirm(tx, &cmd(1, &["2024-01-01"]))).unwrap();
        let second = store.transaction(|tx| recorder.confirm(tx, &cmd(1, &["2024-01-02", "2024-01-03"]))).unwrap();

        assert!(!first.merged);
        assert!(second.merged);
        assert_eq!(first.payment.id, second.payment.id);
        assert_eq!(second.payment.amount, Money::from_major(30_000));
        assert_eq!(second.payment.payment_dates.len(), 3);
        assert_eq!(second.customer.paid_amount, Money::from_major(30_000));
        assert_eq!(store.rows().unwrap().len(), 1);
    }

    #[test]
    fn test_per_confirmation_creates_rows() {
        let config = EngineConfig::default().with_record_model(RecordModel::PerConfirmation);
        let (store, catalog, admin) = (store(), catalog(), Actor::admin(1));
        let recorder = PaymentRecorder::new(&config, &catalog, &admin, now());

        store.transaction(|tx| recorder.confirm(tx, &cmd(1, &["2024-01-01"]))).unwrap();
        store.transaction(|tx| recorder.confirm(tx, &cmd(1, &["2024-01-02"]))).unwrap();

        assert_eq!(store.rows().unwrap().len(), 2);
    }

    #[test]
    fn test_amount_policies() {
        let (store, catalog, admin) = (store(), catalog(), Actor::admin(1));
        let mut request = cmd(1, &["2024-01-01"]);
        request.amount = Some(Money::from_major(1));

        let strict = EngineConfig::default();
        let recorder = PaymentRecorder::new(&strict, &catalog, &admin, now());
        let err = store.transaction(|tx| recorder.confirm(tx, &request)).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidAmount { .. }));

        let lenient = EngineConfig::default().with_amount_policy(AmountPolicy::CallerOverride);
        let recorder = PaymentRecorder::new(&lenient, &catalog, &admin, now());
        let outcome = store.transaction(|tx| recorder.confirm(tx, &request)).unwrap();
        assert_eq!(outcome.credited, Money::from_major(1));
    }

    #[test]
    fn test_package_cadence_is_authoritative() {
        let (store, catalog, config, admin) = (store(), catalog(), EngineConfig::default(), Actor::admin(1));
        let recorder = PaymentRecorder::new(&config, &catalog, &admin, now());
        let mut request = cmd(1, &["2024-01-01"]);
        request.payment_method = Some(PaymentMethod::Weekly);

        let err = store.transaction(|tx| recorder.confirm(tx, &request)).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidArgument { .. }));
    }

    #[test]
    fn test_ledger_scope_per_package() {
        let (store, catalog, admin) = (store(), catalog(), Actor::admin(1));

        let customer_scope = EngineConfig::default();
        let recorder = PaymentRecorder::new(&customer_scope, &catalog, &admin, now());
        store.transaction(|tx| recorder.confirm(tx, &cmd(1, &["2024-01-01"]))).unwrap();
        let err = store.transaction(|tx| recorder.confirm(tx, &cmd(2, &["2024-01-01"]))).unwrap_err();
        assert_eq!(err.duplicate_dates(), Some(&[date("2024-01-01")][..]));

        let package_scope = EngineConfig::default().with_ledger_scope(LedgerScope::CustomerPackage);
        let recorder = PaymentRecorder::new(&package_scope, &catalog, &admin, now());
        let outcome = store.transaction(|tx| recorder.confirm(tx, &cmd(2, &["2024-01-01"]))).unwrap();
        assert_eq!(outcome.credited, Money::from_major(5_000));
    }

    #[test]
    fn test_schedule_window() {
        let config = EngineConfig::strict();
        let (store, catalog, admin) = (store(), catalog(), Actor::admin(1));
        let recorder = PaymentRecorder::new(&config, &catalog, &admin, now());

        // plan runs 2024-01-01 .. 2024-03-01
        let err = store
            .transaction(|tx| recorder.confirm(tx, &cmd(1, &["2024-02-29", "2024-03-01"])))
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidArgument { .. }));

        store.transaction(|tx| recorder.confirm(tx, &cmd(1, &["2024-02-29"]))).unwrap();
    }

    #[test]
    fn test_pending_rows_leave_totals_alone() {
        let (store, catalog, config, admin) = (store(), catalog(), EngineConfig::default(), Actor::admin(1));
        let recorder = PaymentRecorder::new(&config, &catalog, &admin, now());

        let outcome = store.transaction(|tx| recorder.record_pending(tx, &cmd(1, &["2024-01-05"]))).unwrap();
        assert_eq!(outcome.payment.status, PaymentStatus::Pending);
        assert_eq!(outcome.payment.amount, Money::from_major(10_000));
        assert_eq!(outcome.customer.paid_amount, Money::ZERO);

        // pending dates are not credited, so a confirmation does not merge into the pending row
        let confirmed = store.transaction(|tx| recorder.confirm(tx, &cmd(1, &["2024-01-05"]))).unwrap();
        assert!(!confirmed.merged);
        assert_ne!(confirmed.payment.id, outcome.payment.id);
    }

    #[test]
    fn test_bulk_overlap_rolls_back_batch() {
        let (store, catalog, config, admin) = (store(), catalog(), EngineConfig::default(), Actor::admin(1));
        let recorder = PaymentRecorder::new(&config, &catalog, &admin, now());

        let batch = [cmd(1, &["2024-01-01", "2024-01-02"]), cmd(1, &["2024-01-02"])];
        let err = store.transaction(|tx| recorder.confirm_bulk(tx, &batch)).unwrap_err();

        assert_eq!(err.duplicate_dates(), Some(&[date("2024-01-02")][..]));
        assert!(store.rows().unwrap().is_empty());
    }

    #[test]
    fn test_rebuild_totals_repairs_drift() {
        let (store, catalog, config, admin) = (store(), catalog(), EngineConfig::default(), Actor::admin(1));
        let recorder = PaymentRecorder::new(&config, &catalog, &admin, now());
        store.transaction(|tx| recorder.confirm(tx, &cmd(1, &["2024-01-01"]))).unwrap();

        let mut drifted = store.read(|view| view.customer(7)).unwrap().unwrap();
        drifted.paid_amount = Money::from_major(999);
        store.insert_customer(drifted).unwrap();

        let (customer, events) = store.transaction(|tx| recorder.rebuild_totals(tx, 7)).unwrap();
        assert_eq!(customer.paid_amount, Money::from_major(10_000));
        assert_eq!(customer.last_payment_date, Some(now()));
        assert_eq!(events.len(), 1);
    }
}
