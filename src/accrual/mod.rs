pub mod calculator;
pub mod schedule;

pub use calculator::{billable_periods, compute_amount, AccrualCalculator, DAYS_PER_MONTH, DAYS_PER_WEEK};
pub use schedule::{CustomerBalance, ObligationSchedule};
