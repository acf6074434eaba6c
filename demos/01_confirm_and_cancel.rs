/// confirm and cancel - date-set ledger, duplicate rejection and rollback
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use installment_ledger_rs::api::{ApiResponse, ConfirmPaymentResponse, PaidDatesResponse};
use installment_ledger_rs::telemetry::init_tracing;
use installment_ledger_rs::{
    Actor, Customer, MemoryStore, Money, Package, PaymentEngine, PaymentMethod, PaymentSubmission,
    StaticCatalog, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("info");
    println!("=== confirm and cancel example ===\n");

    let catalog = StaticCatalog::from_packages([Package::new(
        1,
        "Harian 3 bulan",
        PaymentMethod::Daily,
        Money::from_major(10_000),
        Some(3),
    )])?;
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("bad date")?;
    let store = MemoryStore::new();
    store.insert_customer(Customer::new(42, "Siti").with_package(1, start))?;

    let mut engine = PaymentEngine::builder()
        .store(Arc::new(store))
        .catalog(Arc::new(catalog))
        .time_source(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap()))
        .build()?;
    let admin = Actor::admin(1);

    // confirm two days; the amount is derived from the package rate
    let submission = PaymentSubmission::new(42, 1)
        .with_dates(&["2024-01-01", "2024-01-02"])
        .paid_on("2024-01-03");
    let payment = engine.confirm_payment(&admin, &submission)?;
    let response = ApiResponse::from_result(Ok(ConfirmPaymentResponse::new(payment.clone())), ConfirmPaymentResponse::STATUS);
    println!("confirm -> {}", response.status);
    println!("{}\n", serde_json::to_string_pretty(&response.body)?);

    // a second confirmation overlapping 2024-01-02 is rejected
    let overlap = PaymentSubmission::new(42, 1)
        .with_dates(&["2024-01-02", "2024-01-03"])
        .paid_on("2024-01-03");
    let response = ApiResponse::from_result(engine.confirm_payment(&admin, &overlap), 201);
    println!("overlapping confirm -> {}", response.status);
    println!("{}\n", serde_json::to_string_pretty(&response.body)?);

    // cancel rolls the dates and the amount back
    let canceled = engine.update_payment_status(&admin, payment.id, "CANCELED")?;
    println!("payment {} is now {}", canceled.id, canceled.status);

    let paid = engine.paid_dates(&admin, 42)?;
    println!("paid dates: {}", serde_json::to_string(&PaidDatesResponse::from(&paid))?);

    println!("\nevents:");
    for event in engine.take_events() {
        println!("  {:?}", event);
    }

    Ok(())
}
