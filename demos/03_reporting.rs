/// reporting - monthly and per-cadence totals and a filtered export
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use installment_ledger_rs::api::{ApiResponse, PaymentSummaryResponse};
use installment_ledger_rs::{
    Actor, Customer, EngineConfig, ExportFilter, MemoryStore, Money, Package, PaymentEngine,
    PaymentMethod, PaymentSubmission, RecordModel, StaticCatalog, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== reporting example ===\n");

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("bad date")?;
    let catalog = StaticCatalog::from_packages([
        Package::new(1, "Harian", PaymentMethod::Daily, Money::from_major(10_000), Some(3)),
        Package::new(2, "Mingguan", PaymentMethod::Weekly, Money::from_major(60_000), Some(3)),
    ])?;
    let store = MemoryStore::new();
    store.insert_customer(Customer::new(1, "Siti").with_package(1, start).with_reseller(7))?;
    store.insert_customer(Customer::new(2, "Agus").with_package(2, start).with_reseller(7))?;
    store.insert_customer(Customer::new(3, "Rina").with_package(1, start))?;

    let mut engine = PaymentEngine::builder()
        .config(EngineConfig::default().with_record_model(RecordModel::PerConfirmation))
        .store(Arc::new(store))
        .catalog(Arc::new(catalog))
        .time_source(TimeSource::Test(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()))
        .build()?;
    let reseller = Actor::reseller(7);

    // resellers confirm for their own customers, in one transaction
    engine.confirm_bulk(
        &reseller,
        &[
            PaymentSubmission::new(1, 1).with_dates(&["2024-01-01", "2024-01-02"]).paid_on("2024-01-02"),
            PaymentSubmission::new(1, 1).with_dates(&["2024-02-01"]).paid_on("2024-02-01"),
            PaymentSubmission::new(2, 2).with_dates(&["2024-01-01"]).paid_on("2024-01-05"),
        ],
    )?;

    // a reseller cannot touch someone else's customer
    let denied = engine.confirm_payment(
        &reseller,
        &PaymentSubmission::new(3, 1).with_dates(&["2024-01-01"]).paid_on("2024-01-01"),
    );
    println!("reseller on unassigned customer: {}\n", denied.err().map(|e| e.to_string()).unwrap_or_default());

    let admin = Actor::admin(1);
    let summary = ApiResponse::from_result(engine.payment_summary(&admin).map(PaymentSummaryResponse::from), 200);
    println!("summary:\n{}\n", serde_json::to_string_pretty(&summary.body)?);

    let filter = ExportFilter::from_query(Some("2024-01-01"), Some("2024-01-31"), None)?;
    for row in engine.export_all(&admin, &filter)? {
        println!(
            "{} ({}): {} payments, total {}, last {:?}",
            row.customer_name,
            row.package.as_ref().map(|p| p.name.as_str()).unwrap_or("-"),
            row.payments.len(),
            row.total_payments,
            row.last_payment_date
        );
    }

    Ok(())
}
