use chrono::{DateTime, NaiveDate, Utc};

use crate::access::{self, Access};
use crate::config::EngineConfig;
use crate::errors::{PaymentError, Result};
use crate::events::Event;
use crate::ledger::{self, PaidDateSet};
use crate::payments::recorder::{ledger_scope, totals_event};
use crate::state::{Customer, Payment};
use crate::store::StoreTx;
use crate::types::{Actor, PaymentId, PaymentStatus};

/// result of a status transition
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub payment: Payment,
    pub previous: PaymentStatus,
    /// dates removed from the ledger by a cancellation
    pub released_dates: Vec<NaiveDate>,
    /// the customer's paid dates after the transition
    pub paid_dates: PaidDateSet,
    pub customer: Customer,
    pub events: Vec<Event>,
}

impl StatusChange {
    pub fn is_noop(&self) -> bool {
        self.previous == self.payment.status
    }
}

/// moves payments between statuses and keeps the ledger and customer totals
/// in line with them
///
/// | from      | to        | effect                                   |
/// |-----------|-----------|------------------------------------------|
/// | any       | same      | nothing                                  |
/// | PENDING   | CONFIRMED | duplicate check, credit totals           |
/// | PENDING   | CANCELED  | status only                              |
/// | CONFIRMED | CANCELED  | release dates, debit totals              |
/// | CONFIRMED | PENDING   | rejected                                 |
/// | CANCELED  | any other | rejected                                 |
pub struct StatusReconciler<'a> {
    config: &'a EngineConfig,
    actor: &'a Actor,
    now: DateTime<Utc>,
}

impl<'a> StatusReconciler<'a> {
    pub fn new(config: &'a EngineConfig, actor: &'a Actor, now: DateTime<Utc>) -> Self {
        Self { config, actor, now }
    }

    pub fn transition(
        &self,
        tx: &mut dyn StoreTx,
        payment_id: PaymentId,
        target: PaymentStatus,
    ) -> Result<StatusChange> {
        let mut payment = tx
            .payment(payment_id)?
            .ok_or(PaymentError::PaymentNotFound { id: payment_id })?;
        let mut customer = tx
            .customer(payment.user_id)?
            .ok_or(PaymentError::CustomerNotFound { id: payment.user_id })?;
        access::authorize(self.actor, &customer, Access::Write)?;

        let previous = payment.status;
        let paid_before = ledger::credited_dates(&*tx, customer.id, None, None)?;
        let mut released_dates = Vec::new();
        let mut events = Vec::new();

        match (previous, target) {
            (from, to) if from == to => {
                return Ok(StatusChange {
                    payment,
                    previous,
                    released_dates,
                    paid_dates: paid_before,
                    customer,
                    events,
                });
            }

            (PaymentStatus::Pending, PaymentStatus::Confirmed) => {
                let scope = ledger_scope(self.config, payment.package_id);
                let paid = ledger::credited_dates(&*tx, customer.id, scope, Some(payment.id))?;
                let duplicates = paid.overlap(&payment.payment_dates.to_vec());
                if !duplicates.is_empty() {
                    tracing::warn!(
                        payment_id = %payment.id,
                        customer_id = customer.id,
                        duplicates = ?duplicates,
                        "pending payment overlaps confirmed dates"
                    );
                    return Err(PaymentError::DuplicatePaymentDate { dates: duplicates });
                }

                payment.status = PaymentStatus::Confirmed;
                payment.updated_at = self.now;
                tx.update_payment(&payment)?;

                customer.credit(payment.amount, payment.payment_date)?;
                tx.update_customer(&customer)?;
                events.push(totals_event(&customer, self.now));
            }

            (PaymentStatus::Confirmed, PaymentStatus::Canceled) => {
                // dates still held by another confirmed payment stay in the ledger
                let others = ledger::credited_dates(&*tx, customer.id, None, Some(payment.id))?;
                released_dates = payment
                    .payment_dates
                    .iter()
                    .filter(|d| !others.contains(d))
                    .copied()
                    .collect();

                payment.status = PaymentStatus::Canceled;
                payment.updated_at = self.now;
                tx.update_payment(&payment)?;

                if !customer.debit(payment.amount) {
                    tracing::warn!(
                        customer_id = customer.id,
                        payment_id = %payment.id,
                        amount = %payment.amount,
                        "paid amount would go negative, clamped to zero"
                    );
                }
                customer.last_payment_date = tx
                    .payments_for_customer(customer.id)?
                    .iter()
                    .filter(|p| p.is_confirmed())
                    .map(|p| p.payment_date)
                    .max();
                tx.update_customer(&customer)?;

                events.push(Event::PaymentDatesReleased {
                    payment_id: payment.id,
                    customer_id: customer.id,
                    dates: released_dates.clone(),
                    amount: payment.amount,
                    timestamp: self.now,
                });
                events.push(totals_event(&customer, self.now));
            }

            (PaymentStatus::Pending, PaymentStatus::Canceled) => {
                payment.status = PaymentStatus::Canceled;
                payment.updated_at = self.now;
                tx.update_payment(&payment)?;
            }

            (from, to) => {
                return Err(PaymentError::InvalidTransition { from, to });
            }
        }

        events.insert(
            0,
            Event::PaymentStatusChanged {
                payment_id: payment.id,
                old_status: previous,
                new_status: payment.status,
                timestamp: self.now,
            },
        );

        let paid_dates = match payment.status {
            PaymentStatus::Confirmed => paid_before.merged(&payment.payment_dates.to_vec()),
            _ => paid_before.subtracted(&released_dates),
        };

        tracing::info!(
            payment_id = %payment.id,
            customer_id = customer.id,
            from = %previous,
            to = %payment.status,
            released = released_dates.len(),
            "payment status changed"
        );

        Ok(StatusChange {
            payment,
            previous,
            released_dates,
            paid_dates,
            customer,
            events,
        })
    }
}
