/// balances - obligation schedules across the three cadences
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use installment_ledger_rs::{
    compute_amount, Actor, Customer, MemoryStore, Money, Package, PaymentEngine, PaymentMethod,
    PaymentSubmission, StaticCatalog, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== balances example ===\n");

    // accrual per cadence for the same 10 selected dates
    for method in PaymentMethod::ALL {
        let amount = compute_amount(method, Money::from_major(5_000), 10)?;
        println!("{:<8} 10 dates at 5000 -> {}", method, amount);
    }

    let start = NaiveDate::from_ymd_opt(2024, 3, 1).ok_or("bad date")?;
    let catalog = StaticCatalog::from_packages([
        Package::new(1, "Harian", PaymentMethod::Daily, Money::from_major(10_000), Some(1)),
        Package::new(2, "Mingguan", PaymentMethod::Weekly, Money::from_major(60_000), Some(2)),
        Package::new(3, "Bulanan", PaymentMethod::Monthly, Money::from_major(250_000), Some(6)),
    ])?;

    let store = MemoryStore::new();
    for (id, package) in [(10, 1), (20, 2), (30, 3)] {
        store.insert_customer(Customer::new(id, format!("customer {}", id)).with_package(package, start))?;
    }

    let mut engine = PaymentEngine::builder()
        .store(Arc::new(store))
        .catalog(Arc::new(catalog))
        .time_source(TimeSource::Test(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()))
        .build()?;
    let admin = Actor::admin(1);

    // every customer pays the first ten days of the plan
    let first_ten: Vec<String> = start
        .iter_days()
        .take(10)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect();
    for (customer, package) in [(10, 1), (20, 2), (30, 3)] {
        let submission = PaymentSubmission::new(customer, package)
            .with_dates(&first_ten[..])
            .paid_on("2024-03-10");
        let payment = engine.confirm_payment(&admin, &submission)?;
        println!("\ncustomer {} paid {}", customer, payment.amount);

        let balance = engine.customer_balance(&admin, customer)?;
        println!(
            "  plan {} .. {}: {} days, {} paid, {} remaining",
            balance.start_date, balance.end_date, balance.total_days, balance.paid_days, balance.remaining_days
        );
        println!(
            "  owed {} paid {} remaining {}",
            balance.total_owed, balance.paid_amount, balance.remaining_amount
        );
    }

    Ok(())
}
