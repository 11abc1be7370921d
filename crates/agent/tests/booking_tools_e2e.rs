use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;

use smiles_agent::{booking_tools, BookingService, ToolRegistry};
use smiles_core::clock::FixedClock;
use smiles_core::errors::{BookingError, CancelRefusal};
use smiles_core::CancellationPolicy;
use smiles_db::migrations::run_pending;
use smiles_db::{connect_with_settings, DataSourceResolver, DbPool, DemoDataset, SqlBookingRepository};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).expect("valid date")
}

async fn seeded() -> (DbPool, ToolRegistry) {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    run_pending(&pool).await.expect("migrate");
    DemoDataset::load(&pool, today()).await.expect("seed");

    let resolver = Arc::new(DataSourceResolver::for_pool(pool.clone()));
    let service = BookingService::new(
        Arc::new(SqlBookingRepository::new(resolver)),
        CancellationPolicy::default(),
        Arc::new(FixedClock(today())),
    );
    (pool, booking_tools(service))
}

async fn canceled_flags(pool: &DbPool, booking_number: &str) -> Vec<i64> {
    sqlx::query_scalar("SELECT canceled FROM booking WHERE booking_number = ? ORDER BY id")
        .bind(booking_number)
        .fetch_all(pool)
        .await
        .expect("read flags")
}

#[tokio::test]
async fn cancel_bk100_end_to_end() {
    let (pool, tools) = seeded().await;

    let output = tools
        .call("cancel_booking", json!({"booking_number": "BK100", "name": "Jane", "surname": "Doe"}))
        .await
        .expect("cancel");

    assert_eq!(output["booking_number"], "BK100");
    assert_eq!(output["canceled"], true);
    assert_eq!(output["start"], "2026-06-11");
    assert_eq!(output["end"], "2026-06-16");
    assert_eq!(canceled_flags(&pool, "BK100").await, vec![1]);

    let again = tools
        .call("cancel_booking", json!({"booking_number": "BK100", "name": "Jane", "surname": "Doe"}))
        .await
        .expect_err("second cancel is refused");
    assert_eq!(
        again.downcast_ref::<BookingError>(),
        Some(&BookingError::cannot_be_canceled("BK100", CancelRefusal::AlreadyCanceled))
    );
}

#[tokio::test]
async fn policy_refusals_leave_rows_untouched() {
    let (pool, tools) = seeded().await;

    let late = tools
        .call("cancel_booking", json!({"booking_number": "234-567", "name": "James", "surname": "Bond"}))
        .await
        .expect_err("too late");
    assert_eq!(
        late.downcast_ref::<BookingError>(),
        Some(&BookingError::cannot_be_canceled("234-567", CancelRefusal::TooLate))
    );

    let short = tools
        .call(
            "cancel_booking",
            json!({"booking_number": "345-678", "name": "speedy", "surname": "mcwheels"}),
        )
        .await
        .expect_err("too short");
    assert_eq!(
        short.downcast_ref::<BookingError>(),
        Some(&BookingError::cannot_be_canceled("345-678", CancelRefusal::TooShort))
    );

    assert_eq!(canceled_flags(&pool, "234-567").await, vec![0]);
    assert_eq!(canceled_flags(&pool, "345-678").await, vec![0]);
}

#[tokio::test]
async fn lookups_ignore_case_and_surrounding_whitespace() {
    let (_pool, tools) = seeded().await;

    let details = tools
        .call(
            "get_booking_details",
            json!({"booking_number": " 123-456 ", "name": "JAMES", "surname": " bond "}),
        )
        .await
        .expect("details");
    assert_eq!(details["car_model"], "Aston Martin DB5");

    let numbers = tools
        .call("get_bookings_for_customer", json!({"name": "james", "surname": "BOND"}))
        .await
        .expect("list");
    assert_eq!(numbers, json!(["123-456", "234-567"]));
}

#[tokio::test]
async fn unresolvable_data_source_is_a_configuration_error() {
    let resolver = Arc::new(DataSourceResolver::new(
        Arc::new(smiles_db::PoolRegistry::default()),
        "java:comp/env/jdbc/CarBookingDS",
        "jdbc/CarBookingDS",
    ));
    let tools = booking_tools(BookingService::new(
        Arc::new(SqlBookingRepository::new(resolver)),
        CancellationPolicy::default(),
        Arc::new(FixedClock(today())),
    ));

    let error = tools
        .call("get_bookings_for_customer", json!({"name": "Jane", "surname": "Doe"}))
        .await
        .expect_err("nothing bound");

    let booking_error = error.downcast_ref::<BookingError>().expect("booking error");
    assert_eq!(booking_error.error_class(), "configuration");
}
