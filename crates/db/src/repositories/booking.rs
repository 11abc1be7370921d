use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::pool::PoolConnection;
use sqlx::{Row, Sqlite};
use tracing::{debug, info};

use smiles_core::domain::booking::Booking;
use smiles_core::domain::customer::Customer;

use super::{dedupe_preserving_order, BookingRepository, RepositoryError};
use crate::datasource::DataSourceResolver;

const FIND_BOOKING_SQL: &str = "SELECT b.booking_number, b.start_date, b.end_date, b.canceled, b.car_model,
        c.name, c.surname
 FROM booking b
 JOIN customer c ON b.customer_id = c.id
 WHERE TRIM(b.booking_number) = TRIM(?)
   AND UPPER(c.name) = UPPER(TRIM(?))
   AND UPPER(c.surname) = UPPER(TRIM(?))
 ORDER BY b.id";

const LIST_BOOKING_NUMBERS_SQL: &str = "SELECT b.booking_number
 FROM booking b
 JOIN customer c ON b.customer_id = c.id
 WHERE UPPER(c.name) = UPPER(TRIM(?))
   AND UPPER(c.surname) = UPPER(TRIM(?))
 ORDER BY b.id";

const CANCEL_BOOKING_SQL: &str = "UPDATE booking SET canceled = 1 WHERE booking_number = ?";

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqlBookingRepository {
    resolver: Arc<DataSourceResolver>,
}

impl SqlBookingRepository {
    pub fn new(resolver: Arc<DataSourceResolver>) -> Self {
        Self { resolver }
    }

    /// One pooled connection per operation, returned to the pool on drop.
    async fn connection(&self) -> Result<PoolConnection<Sqlite>, RepositoryError> {
        let pool = self.resolver.resolve().await?;
        Ok(pool.acquire().await?)
    }
}

fn parse_date(column: &str, value: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| RepositoryError::Decode(format!("invalid {column} `{value}`: {e}")))
}

fn row_to_booking(row: &sqlx::sqlite::SqliteRow) -> Result<Booking, RepositoryError> {
    let booking_number: String =
        row.try_get("booking_number").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let start_date: String =
        row.try_get("start_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let end_date: String =
        row.try_get("end_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let canceled: i64 =
        row.try_get("canceled").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let car_model: String =
        row.try_get("car_model").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let surname: String =
        row.try_get("surname").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Booking {
        booking_number,
        start: parse_date("start_date", &start_date)?,
        end: parse_date("end_date", &end_date)?,
        canceled: canceled != 0,
        car_model,
        customer: Customer { name, surname },
    })
}

#[async_trait::async_trait]
impl BookingRepository for SqlBookingRepository {
    async fn find_booking(
        &self,
        booking_number: &str,
        name: &str,
        surname: &str,
    ) -> Result<Booking, RepositoryError> {
        let mut conn = self.connection().await?;
        debug!(event_name = "booking.sql", statement = FIND_BOOKING_SQL, "executing lookup");

        let row = sqlx::query(FIND_BOOKING_SQL)
            .bind(booking_number)
            .bind(name)
            .bind(surname)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(ref r) => {
                let booking = row_to_booking(r)?;
                info!(
                    event_name = "booking.found",
                    booking_number = %booking.booking_number,
                    start = %booking.start,
                    end = %booking.end,
                    canceled = booking.canceled,
                    "booking found"
                );
                Ok(booking)
            }
            None => Err(RepositoryError::NotFound(booking_number.trim().to_string())),
        }
    }

    async fn list_booking_numbers(
        &self,
        name: &str,
        surname: &str,
    ) -> Result<Vec<String>, RepositoryError> {
        let mut conn = self.connection().await?;
        debug!(event_name = "booking.sql", statement = LIST_BOOKING_NUMBERS_SQL, "executing listing");

        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(LIST_BOOKING_NUMBERS_SQL)
            .bind(name)
            .bind(surname)
            .fetch_all(&mut *conn)
            .await?;

        let numbers = rows
            .iter()
            .map(|row| {
                row.try_get::<String, _>("booking_number")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(dedupe_preserving_order(numbers))
    }

    async fn cancel_booking(&self, booking_number: &str) -> Result<u64, RepositoryError> {
        let mut conn = self.connection().await?;
        debug!(event_name = "booking.sql", statement = CANCEL_BOOKING_SQL, "executing update");

        let result =
            sqlx::query(CANCEL_BOOKING_SQL).bind(booking_number).execute(&mut *conn).await?;

        let updated = result.rows_affected();
        if updated == 0 {
            return Err(RepositoryError::NotFound(booking_number.to_string()));
        }

        info!(event_name = "booking.canceled", booking_number, rows_affected = updated, "booking canceled");
        Ok(updated)
    }
}
