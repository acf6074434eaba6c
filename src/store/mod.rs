pub mod memory;

use crate::errors::Result;
use crate::state::{Customer, Payment};
use crate::types::{CustomerId, Package, PackageId, PaymentId};

pub use memory::{MemoryStore, StaticCatalog};

/// read access to customers and payments
pub trait StoreView {
    fn customer(&self, id: CustomerId) -> Result<Option<Customer>>;

    /// all customers, ascending by id
    fn customers(&self) -> Result<Vec<Customer>>;

    fn payment(&self, id: PaymentId) -> Result<Option<Payment>>;

    /// payments of one customer, ascending by `payment_date`
    fn payments_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Payment>>;

    /// every payment, ascending by `payment_date`
    fn payments(&self) -> Result<Vec<Payment>>;
}

/// write access inside a unit of work
pub trait StoreTx: StoreView {
    fn insert_payment(&mut self, payment: &Payment) -> Result<()>;

    fn update_payment(&mut self, payment: &Payment) -> Result<()>;

    fn update_customer(&mut self, customer: &Customer) -> Result<()>;
}

/// persistence boundary of the engine
///
/// `transaction` must be all-or-nothing: when the closure or the commit fails
/// none of its writes may be observable, and no other transaction may
/// interleave between its reads and its writes.
pub trait PaymentStore: Send + Sync {
    fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn StoreView) -> Result<T>;

    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn StoreTx) -> Result<T>;
}

/// read-only package catalog
pub trait Catalog: Send + Sync {
    fn package(&self, id: PackageId) -> Result<Option<Package>>;
}
