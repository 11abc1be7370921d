use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_CUSTOMERS: &[SeedCustomer] = &[
    SeedCustomer { id: 1, name: "James", surname: "Bond" },
    SeedCustomer { id: 2, name: "Speedy", surname: "McWheels" },
    SeedCustomer { id: 3, name: "Jane", surname: "Doe" },
];

/// Demo bookings, dated relative to the day the dataset is loaded so each one
/// keeps exercising the same cancellation outcome.
const SEED_BOOKINGS: &[SeedBookingContract] = &[
    SeedBookingContract {
        booking_number: "123-456",
        customer_id: 1,
        start_offset_days: 30,
        duration_days: 7,
        canceled: false,
        car_model: "Aston Martin DB5",
        description: "cancelable",
    },
    SeedBookingContract {
        booking_number: "234-567",
        customer_id: 1,
        start_offset_days: 2,
        duration_days: 7,
        canceled: false,
        car_model: "Lotus Esprit",
        description: "starts within seven days - too late to cancel",
    },
    SeedBookingContract {
        booking_number: "345-678",
        customer_id: 2,
        start_offset_days: 14,
        duration_days: 1,
        canceled: false,
        car_model: "Mini Cooper",
        description: "one-day rental - too short to cancel",
    },
    SeedBookingContract {
        booking_number: "456-789",
        customer_id: 2,
        start_offset_days: 20,
        duration_days: 7,
        canceled: true,
        car_model: "Fiat 500",
        description: "already canceled",
    },
    SeedBookingContract {
        booking_number: "BK100",
        customer_id: 3,
        start_offset_days: 10,
        duration_days: 5,
        canceled: false,
        car_model: "Toyota Corolla",
        description: "cancelable",
    },
];

#[derive(Debug, Clone, Copy)]
struct SeedCustomer {
    id: i64,
    name: &'static str,
    surname: &'static str,
}

#[derive(Debug, Clone, Copy)]
struct SeedBookingContract {
    booking_number: &'static str,
    customer_id: i64,
    start_offset_days: u64,
    duration_days: u64,
    canceled: bool,
    car_model: &'static str,
    description: &'static str,
}

impl SeedBookingContract {
    fn dates(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), RepositoryError> {
        let start = today
            .checked_add_days(Days::new(self.start_offset_days))
            .ok_or_else(|| RepositoryError::Decode(format!("{} start out of range", self.booking_number)))?;
        let end = start
            .checked_add_days(Days::new(self.duration_days))
            .ok_or_else(|| RepositoryError::Decode(format!("{} end out of range", self.booking_number)))?;
        Ok((start, end))
    }

    fn customer(&self) -> Option<&'static SeedCustomer> {
        SEED_CUSTOMERS.iter().find(|customer| customer.id == self.customer_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingSeedInfo {
    pub booking_number: &'static str,
    pub customer: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub description: &'static str,
}

#[derive(Debug, Clone)]
pub struct SeedResult {
    pub customers_seeded: usize,
    pub bookings_inserted: usize,
    pub bookings: Vec<BookingSeedInfo>,
}

#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

/// Deterministic demo customers and bookings.
pub struct DemoDataset;

impl DemoDataset {
    /// Inserts customers and bookings that are not present yet. Running it
    /// again leaves existing rows, including their canceled flags, untouched.
    pub async fn load(pool: &DbPool, today: NaiveDate) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        for customer in SEED_CUSTOMERS {
            sqlx::query("INSERT OR IGNORE INTO customer (id, name, surname) VALUES (?, ?, ?)")
                .bind(customer.id)
                .bind(customer.name)
                .bind(customer.surname)
                .execute(&mut *tx)
                .await?;
        }

        let mut bookings_inserted = 0;
        let mut bookings = Vec::with_capacity(SEED_BOOKINGS.len());
        for booking in SEED_BOOKINGS {
            let (start, end) = booking.dates(today)?;
            let result = sqlx::query(
                "INSERT INTO booking (booking_number, start_date, end_date, canceled, car_model, customer_id)
                 SELECT ?1, ?2, ?3, ?4, ?5, ?6
                 WHERE NOT EXISTS (SELECT 1 FROM booking WHERE booking_number = ?1)",
            )
            .bind(booking.booking_number)
            .bind(start.to_string())
            .bind(end.to_string())
            .bind(i64::from(booking.canceled))
            .bind(booking.car_model)
            .bind(booking.customer_id)
            .execute(&mut *tx)
            .await?;
            bookings_inserted += result.rows_affected() as usize;

            let customer = booking
                .customer()
                .map(|c| format!("{} {}", c.name, c.surname))
                .unwrap_or_default();
            bookings.push(BookingSeedInfo {
                booking_number: booking.booking_number,
                customer,
                start,
                end,
                description: booking.description,
            });
        }

        tx.commit().await?;

        Ok(SeedResult { customers_seeded: SEED_CUSTOMERS.len(), bookings_inserted, bookings })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for customer in SEED_CUSTOMERS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM customer WHERE id = ?1 AND name = ?2 AND surname = ?3)",
            )
            .bind(customer.id)
            .bind(customer.name)
            .bind(customer.surname)
            .fetch_one(pool)
            .await?;
            checks.push((customer.surname, exists == 1));
        }

        for booking in SEED_BOOKINGS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM booking WHERE booking_number = ?1 AND customer_id = ?2)",
            )
            .bind(booking.booking_number)
            .bind(booking.customer_id)
            .fetch_one(pool)
            .await?;
            checks.push((booking.booking_number, exists == 1));
        }

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes seeded rows from a test database.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        for booking in SEED_BOOKINGS {
            sqlx::query("DELETE FROM booking WHERE booking_number = ?")
                .bind(booking.booking_number)
                .execute(&mut *tx)
                .await?;
        }
        for customer in SEED_CUSTOMERS {
            sqlx::query("DELETE FROM customer WHERE id = ?").bind(customer.id).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub fn booking_numbers() -> impl Iterator<Item = &'static str> {
        SEED_BOOKINGS.iter().map(|booking| booking.booking_number)
    }
}
