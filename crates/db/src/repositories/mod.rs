use std::collections::HashSet;
use std::fmt::Display;

use async_trait::async_trait;
use thiserror::Error;

use smiles_core::domain::booking::Booking;
use smiles_core::errors::BookingError;

use crate::datasource::ResolveError;

pub mod booking;
pub mod memory;

pub use booking::SqlBookingRepository;
pub use memory::InMemoryBookingRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("data source unavailable: {0}")]
    Unavailable(#[from] ResolveError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("booking {0} not found")]
    NotFound(String),
}

impl RepositoryError {
    /// Maps into the service-level taxonomy. `context` names the operation
    /// and is prefixed to storage failure messages.
    pub fn into_booking_error(self, context: impl Display) -> BookingError {
        match self {
            Self::Unavailable(error) => BookingError::Configuration(error.to_string()),
            Self::Database(error) => BookingError::Storage(format!("{context}: {error}")),
            Self::Decode(message) => BookingError::Storage(format!("{context}: {message}")),
            Self::NotFound(booking_number) => BookingError::NotFound { booking_number },
        }
    }
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// First booking whose trimmed number matches and whose customer name and
    /// surname match case-insensitively after trimming the inputs.
    async fn find_booking(
        &self,
        booking_number: &str,
        name: &str,
        surname: &str,
    ) -> Result<Booking, RepositoryError>;

    /// Distinct booking numbers for the customer, in query order.
    async fn list_booking_numbers(
        &self,
        name: &str,
        surname: &str,
    ) -> Result<Vec<String>, RepositoryError>;

    /// Flags every row carrying `booking_number` as canceled and returns the
    /// number of rows touched.
    async fn cancel_booking(&self, booking_number: &str) -> Result<u64, RepositoryError>;
}

/// Drops repeated values, keeping the first occurrence of each.
pub fn dedupe_preserving_order<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    values.into_iter().filter(|value| seen.insert(value.clone())).collect()
}

#[cfg(test)]
mod tests {
    use smiles_core::errors::BookingError;

    use super::{dedupe_preserving_order, RepositoryError};

    #[test]
    fn dedupe_keeps_first_occurrence_order() {
        let values = ["B2", "A1", "B2", "C3", "A1"].map(String::from);

        assert_eq!(dedupe_preserving_order(values), vec!["B2", "A1", "C3"]);
    }

    #[test]
    fn not_found_maps_to_business_error() {
        let error = RepositoryError::NotFound("BK9".to_string()).into_booking_error("lookup");
        assert_eq!(error, BookingError::not_found("BK9"));
    }

    #[test]
    fn decode_failure_maps_to_storage_error_with_context() {
        let error = RepositoryError::Decode("bad start_date".to_string())
            .into_booking_error("DB error while fetching booking BK9");

        assert_eq!(
            error,
            BookingError::Storage("DB error while fetching booking BK9: bad start_date".to_string())
        );
    }
}
