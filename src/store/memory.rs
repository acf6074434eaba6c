use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::errors::{PaymentError, Result};
use crate::state::{Customer, Payment, PaymentRow};
use crate::store::{Catalog, PaymentStore, StoreTx, StoreView};
use crate::types::{CustomerId, Package, PackageId, PaymentId};

/// table contents; payments are kept in their persisted row form
#[derive(Debug, Clone, Default)]
struct Tables {
    customers: BTreeMap<CustomerId, Customer>,
    payments: BTreeMap<PaymentId, PaymentRow>,
}

impl Tables {
    fn sorted(mut payments: Vec<Payment>) -> Vec<Payment> {
        payments.sort_by(|a, b| {
            a.payment_date
                .cmp(&b.payment_date)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        payments
    }
}

impl StoreView for Tables {
    fn customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        Ok(self.customers.get(&id).cloned())
    }

    fn customers(&self) -> Result<Vec<Customer>> {
        Ok(self.customers.values().cloned().collect())
    }

    fn payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        Ok(self.payments.get(&id).map(Payment::from_row))
    }

    fn payments_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Payment>> {
        let payments = self
            .payments
            .values()
            .filter(|row| row.user_id == customer_id)
            .map(Payment::from_row)
            .collect();
        Ok(Self::sorted(payments))
    }

    fn payments(&self) -> Result<Vec<Payment>> {
        Ok(Self::sorted(self.payments.values().map(Payment::from_row).collect()))
    }
}

impl StoreTx for Tables {
    fn insert_payment(&mut self, payment: &Payment) -> Result<()> {
        if !self.customers.contains_key(&payment.user_id) {
            return Err(PaymentError::CustomerNotFound { id: payment.user_id });
        }
        if self.payments.contains_key(&payment.id) {
            return Err(PaymentError::storage(format!("duplicate payment id {}", payment.id)));
        }
        self.payments.insert(payment.id, payment.to_row()?);
        Ok(())
    }

    fn update_payment(&mut self, payment: &Payment) -> Result<()> {
        let row = payment.to_row()?;
        match self.payments.get_mut(&payment.id) {
            Some(existing) => {
                *existing = row;
                Ok(())
            }
            None => Err(PaymentError::PaymentNotFound { id: payment.id }),
        }
    }

    fn update_customer(&mut self, customer: &Customer) -> Result<()> {
        match self.customers.get_mut(&customer.id) {
            Some(existing) => {
                *existing = customer.clone();
                Ok(())
            }
            None => Err(PaymentError::CustomerNotFound { id: customer.id }),
        }
    }
}

/// in-process store
///
/// A transaction holds the table lock for its whole duration and works on a
/// private copy that replaces the tables only when the closure and the commit
/// both succeed.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_next_commit: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// writes go to a private copy, so a lock poisoned by a panicking caller
    /// still guards the last committed tables
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("store lock poisoned by a panicked caller, recovering committed tables");
            self.tables.clear_poison();
            poisoned.into_inner()
        })
    }

    /// add or replace a customer record; customers are owned by the CRUD layer
    pub fn insert_customer(&self, customer: Customer) -> Result<()> {
        let mut tables = self.lock();
        tables.customers.insert(customer.id, customer);
        Ok(())
    }

    /// load already-persisted payment rows as they are, without decoding them
    pub fn import_rows(&self, rows: impl IntoIterator<Item = PaymentRow>) -> Result<()> {
        let mut tables = self.lock();
        for row in rows {
            tables.payments.insert(row.id, row);
        }
        Ok(())
    }

    /// persisted rows, ascending by id
    pub fn rows(&self) -> Result<Vec<PaymentRow>> {
        Ok(self.lock().payments.values().cloned().collect())
    }

    /// make the next commit fail after its closure has run
    pub fn inject_commit_failure(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

impl PaymentStore for MemoryStore {
    fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn StoreView) -> Result<T>,
    {
        let tables = self.lock();
        f(&*tables)
    }

    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn StoreTx) -> Result<T>,
    {
        let mut tables = self.lock();
        let mut working = tables.clone();
        let out = f(&mut working)?;

        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            tracing::warn!("commit failed, transaction rolled back");
            return Err(PaymentError::storage("commit failed"));
        }

        *tables = working;
        Ok(out)
    }
}

/// fixed package catalog
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    packages: HashMap<PackageId, Package>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// catalog from validated packages
    pub fn from_packages(packages: impl IntoIterator<Item = Package>) -> Result<Self> {
        let mut catalog = Self::new();
        for package in packages {
            catalog.insert(package)?;
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, package: Package) -> Result<()> {
        package.validate()?;
        self.packages.insert(package.id, package);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl Catalog for StaticCatalog {
    fn package(&self, id: PackageId) -> Result<Option<Package>> {
        Ok(self.packages.get(&id).cloned())
    }
}
