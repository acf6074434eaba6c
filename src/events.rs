use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{CustomerId, PackageId, PaymentId, PaymentStatus};

/// all events that can be emitted by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // write path events
    PaymentConfirmed {
        payment_id: PaymentId,
        customer_id: CustomerId,
        package_id: PackageId,
        amount: Money,
        dates: Vec<NaiveDate>,
        timestamp: DateTime<Utc>,
    },
    PaymentDatesMerged {
        payment_id: PaymentId,
        customer_id: CustomerId,
        added: Vec<NaiveDate>,
        new_amount: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentRecordedPending {
        payment_id: PaymentId,
        customer_id: CustomerId,
        package_id: PackageId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    DuplicateDatesRejected {
        customer_id: CustomerId,
        dates: Vec<NaiveDate>,
        timestamp: DateTime<Utc>,
    },

    // reconciliation events
    PaymentStatusChanged {
        payment_id: PaymentId,
        old_status: PaymentStatus,
        new_status: PaymentStatus,
        timestamp: DateTime<Utc>,
    },
    PaymentDatesReleased {
        payment_id: PaymentId,
        customer_id: CustomerId,
        dates: Vec<NaiveDate>,
        amount: Money,
        timestamp: DateTime<Utc>,
    },

    // projection events
    CustomerTotalsUpdated {
        customer_id: CustomerId,
        paid_amount: Money,
        last_payment_date: Option<DateTime<Utc>>,
        timestamp: DateTime<Utc>,
    },
}

/// events buffered by the engine until drained
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}
