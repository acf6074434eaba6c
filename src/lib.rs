pub mod access;
pub mod accrual;
pub mod api;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod payments;
pub mod reporting;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod types;

// re-export key types
pub use accrual::{billable_periods, compute_amount, AccrualCalculator, CustomerBalance, ObligationSchedule};
pub use config::{AmountPolicy, CadenceFallback, EngineConfig, LedgerScope, RecordModel};
pub use decimal::Money;
pub use engine::{PaymentEngine, PaymentEngineBuilder};
pub use errors::{ErrorKind, PaymentError, Result};
pub use events::{Event, EventStore};
pub use ledger::{get_paid_dates, merge_dates, subtract_dates, PaidDateSet};
pub use payments::{ConfirmPayment, PaymentSubmission, StatusChange};
pub use reporting::{CustomerExport, CustomerPaymentSummary, ExportFilter, PaymentListing, PaymentSummary};
pub use state::{Customer, Payment, PaymentRow};
pub use store::{Catalog, MemoryStore, PaymentStore, StaticCatalog, StoreTx, StoreView};
pub use types::{Actor, CustomerId, Package, PackageId, PaymentId, PaymentMethod, PaymentStatus, Role, UserId};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
