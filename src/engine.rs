use std::sync::Arc;

use hourglass_rs::{SafeTimeProvider, TimeSource};
use tracing::instrument;

use crate::access::{self, Access};
use crate::accrual::{CustomerBalance, ObligationSchedule};
use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::errors::{PaymentError, Result};
use crate::events::{Event, EventStore};
use crate::ledger::{self, PaidDateSet};
use crate::payments::{ConfirmPayment, PaymentRecorder, PaymentSubmission, StatusChange, StatusReconciler};
use crate::reporting::{self, CustomerExport, CustomerPaymentSummary, ExportFilter, PaymentListing, PaymentSummary};
use crate::state::{Customer, Payment};
use crate::store::{Catalog, PaymentStore, StoreView};
use crate::types::{Actor, CustomerId, PaymentId, PaymentStatus};

/// payment scheduling and reconciliation engine
pub struct PaymentEngine<S: PaymentStore, C: Catalog> {
    config: EngineConfig,
    store: Arc<S>,
    catalog: Arc<C>,
    time: SafeTimeProvider,
    events: EventStore,
}

impl<S: PaymentStore, C: Catalog> PaymentEngine<S, C> {
    pub fn builder() -> PaymentEngineBuilder<S, C> {
        PaymentEngineBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn time(&self) -> &SafeTimeProvider {
        &self.time
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// drain events emitted since the last call
    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    // write operations

    /// confirm a payment for the selected dates
    #[instrument(skip(self, submission), fields(actor_id = actor.id, customer_id = ?submission.customer_id, package_id = ?submission.package_id))]
    pub fn confirm_payment(&mut self, actor: &Actor, submission: &PaymentSubmission) -> Result<Payment> {
        let cmd = submission.validate(&self.config)?;
        let now = self.time.now();
        let recorder = PaymentRecorder::new(&self.config, self.catalog.as_ref(), actor, now);

        let result = self.store.transaction(|tx| recorder.confirm(tx, &cmd));
        match result {
            Ok(outcome) => {
                self.events.extend(outcome.events);
                Ok(outcome.payment)
            }
            Err(err) => Err(self.rejected(&cmd, err)),
        }
    }

    /// record a payment that awaits confirmation
    #[instrument(skip(self, submission), fields(actor_id = actor.id, customer_id = ?submission.customer_id))]
    pub fn record_pending_payment(&mut self, actor: &Actor, submission: &PaymentSubmission) -> Result<Payment> {
        let cmd = submission.validate(&self.config)?;
        let now = self.time.now();
        let recorder = PaymentRecorder::new(&self.config, self.catalog.as_ref(), actor, now);

        let result = self.store.transaction(|tx| recorder.record_pending(tx, &cmd));
        match result {
            Ok(outcome) => {
                self.events.extend(outcome.events);
                Ok(outcome.payment)
            }
            Err(err) => Err(self.rejected(&cmd, err)),
        }
    }

    /// confirm several payments in one transaction; any failure rejects all
    #[instrument(skip(self, submissions), fields(actor_id = actor.id, count = submissions.len()))]
    pub fn confirm_bulk(&mut self, actor: &Actor, submissions: &[PaymentSubmission]) -> Result<Vec<Payment>> {
        let cmds = submissions
            .iter()
            .map(|s| s.validate(&self.config))
            .collect::<Result<Vec<ConfirmPayment>>>()?;
        let now = self.time.now();
        let recorder = PaymentRecorder::new(&self.config, self.catalog.as_ref(), actor, now);

        let outcomes = self.store.transaction(|tx| recorder.confirm_bulk(tx, &cmds))?;

        tracing::info!(count = outcomes.len(), "bulk confirmation committed");
        let mut payments = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            self.events.extend(outcome.events);
            payments.push(outcome.payment);
        }
        Ok(payments)
    }

    /// status update with a raw status string, as received from the web layer
    pub fn update_payment_status(&mut self, actor: &Actor, payment_id: PaymentId, status: &str) -> Result<Payment> {
        let target: PaymentStatus = status.parse()?;
        Ok(self.transition_payment(actor, payment_id, target)?.payment)
    }

    #[instrument(skip(self, actor), fields(actor_id = actor.id, payment_id = %payment_id, target = %target))]
    pub fn transition_payment(
        &mut self,
        actor: &Actor,
        payment_id: PaymentId,
        target: PaymentStatus,
    ) -> Result<StatusChange> {
        let now = self.time.now();
        let reconciler = StatusReconciler::new(&self.config, actor, now);

        let change = self
            .store
            .transaction(|tx| reconciler.transition(tx, payment_id, target))?;
        self.events.extend(change.events.iter().cloned());
        Ok(change)
    }

    /// recompute a customer's cached totals from confirmed payments
    #[instrument(skip(self), fields(actor_id = actor.id))]
    pub fn rebuild_customer_totals(&mut self, actor: &Actor, customer_id: CustomerId) -> Result<Customer> {
        let now = self.time.now();
        let recorder = PaymentRecorder::new(&self.config, self.catalog.as_ref(), actor, now);

        let (customer, events) = self
            .store
            .transaction(|tx| recorder.rebuild_totals(tx, customer_id))?;
        self.events.extend(events);
        Ok(customer)
    }

    // read operations

    pub fn payment_status(&self, actor: &Actor, payment_id: PaymentId) -> Result<PaymentStatus> {
        self.store.read(|view| {
            let payment = view
                .payment(payment_id)?
                .ok_or(PaymentError::PaymentNotFound { id: payment_id })?;
            readable_customer(view, actor, payment.user_id)?;
            Ok(payment.status)
        })
    }

    pub fn paid_dates(&self, actor: &Actor, customer_id: CustomerId) -> Result<PaidDateSet> {
        self.store.read(|view| {
            readable_customer(view, actor, customer_id)?;
            ledger::get_paid_dates(view, customer_id)
        })
    }

    pub fn payments_by_customer(&self, actor: &Actor, customer_id: CustomerId) -> Result<Vec<Payment>> {
        self.store.read(|view| {
            readable_customer(view, actor, customer_id)?;
            reporting::payments_by_customer(view, customer_id)
        })
    }

    pub fn customer_summary(&self, actor: &Actor, customer_id: CustomerId) -> Result<CustomerPaymentSummary> {
        self.store.read(|view| {
            readable_customer(view, actor, customer_id)?;
            reporting::customer_summary(view, customer_id)
        })
    }

    /// owed, paid and outstanding view of the customer's current package
    pub fn customer_balance(&self, actor: &Actor, customer_id: CustomerId) -> Result<CustomerBalance> {
        self.store.read(|view| {
            let customer = readable_customer(view, actor, customer_id)?;
            let (package_id, start) = match (customer.package_id, customer.package_start_date) {
                (Some(id), Some(start)) => (id, start),
                _ => {
                    return Err(PaymentError::InvalidArgument {
                        message: format!("customer {} has no package schedule", customer_id),
                    })
                }
            };
            let package = self
                .catalog
                .package(package_id)?
                .ok_or(PaymentError::PackageNotFound { id: package_id })?;
            let schedule = ObligationSchedule::derive(&package, start)?;

            let paid = ledger::credited_dates(view, customer_id, Some(package_id), None)?;
            let paid_amount = Money::checked_sum(
                view.payments_for_customer(customer_id)?
                    .iter()
                    .filter(|p| p.is_confirmed() && p.package_id == package_id)
                    .map(|p| p.amount),
            )
            .ok_or_else(|| PaymentError::total_overflow("package payment total"))?;
            schedule.balance(&paid, paid_amount)
        })
    }

    /// every payment with customer and package names, newest first
    pub fn all_payments(&self, actor: &Actor) -> Result<Vec<PaymentListing>> {
        access::require_admin(actor, "payment listing")?;
        self.store
            .read(|view| reporting::all_payments(view, self.catalog.as_ref()))
    }

    pub fn payment_summary(&self, actor: &Actor) -> Result<PaymentSummary> {
        access::require_admin(actor, "payment summary")?;
        self.store
            .read(|view| reporting::payment_summary(view, self.catalog.as_ref()))
    }

    #[instrument(skip(self, filter), fields(actor_id = actor.id))]
    pub fn export_all(&self, actor: &Actor, filter: &ExportFilter) -> Result<Vec<CustomerExport>> {
        access::require_admin(actor, "export")?;
        self.store
            .read(|view| reporting::export_all(view, self.catalog.as_ref(), filter))
    }

    /// record a rejection event for duplicate dates; passes the error through
    fn rejected(&mut self, cmd: &ConfirmPayment, err: PaymentError) -> PaymentError {
        if let Some(dates) = err.duplicate_dates() {
            self.events.emit(Event::DuplicateDatesRejected {
                customer_id: cmd.customer_id,
                dates: dates.to_vec(),
                timestamp: self.time.now(),
            });
        }
        err
    }
}

fn readable_customer(view: &dyn StoreView, actor: &Actor, customer_id: CustomerId) -> Result<Customer> {
    let customer = view
        .customer(customer_id)?
        .ok_or(PaymentError::CustomerNotFound { id: customer_id })?;
    access::authorize(actor, &customer, Access::Read)?;
    Ok(customer)
}

/// builder for `PaymentEngine`
pub struct PaymentEngineBuilder<S, C> {
    config: EngineConfig,
    store: Option<Arc<S>>,
    catalog: Option<Arc<C>>,
    time_source: Option<TimeSource>,
}

impl<S: PaymentStore, C: Catalog> PaymentEngineBuilder<S, C> {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            store: None,
            catalog: None,
            time_source: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn catalog(mut self, catalog: Arc<C>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// clock used for record and event timestamps; system time when unset
    pub fn time_source(mut self, source: TimeSource) -> Self {
        self.time_source = Some(source);
        self
    }

    pub fn build(self) -> Result<PaymentEngine<S, C>> {
        let store = self.store.ok_or(PaymentError::InvalidConfiguration {
            message: "store is required".to_string(),
        })?;
        let catalog = self.catalog.ok_or(PaymentError::InvalidConfiguration {
            message: "catalog is required".to_string(),
        })?;

        Ok(PaymentEngine {
            config: self.config,
            store,
            catalog,
            time: SafeTimeProvider::new(self.time_source.unwrap_or(TimeSource::System)),
            events: EventStore::new(),
        })
    }
}

impl<S: PaymentStore, C: Catalog> Default for PaymentEngineBuilder<S, C> {
    fn default() -> Self {
        Self::new()
    }
}
