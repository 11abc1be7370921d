use std::sync::Arc;

use tracing::{info, warn};

use smiles_core::clock::Clock;
use smiles_core::errors::{BookingError, CancelRefusal};
use smiles_core::{Booking, CancellationPolicy};
use smiles_db::repositories::BookingRepository;

/// Booking lookups and cancellation over a [`BookingRepository`].
///
/// Repository failures are translated into [`BookingError`]; the policy is
/// evaluated against the injected clock's calendar date.
#[derive(Clone)]
pub struct BookingService {
    repository: Arc<dyn BookingRepository>,
    policy: CancellationPolicy,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(
        repository: Arc<dyn BookingRepository>,
        policy: CancellationPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { repository, policy, clock }
    }

    pub async fn get_booking_details(
        &self,
        booking_number: &str,
        name: &str,
        surname: &str,
    ) -> Result<Booking, BookingError> {
        info!(
            event_name = "booking.details.requested",
            booking_number,
            name,
            surname,
            "getting booking details"
        );

        self.repository.find_booking(booking_number, name, surname).await.map_err(|error| {
            error.into_booking_error(format!("DB error while fetching booking {booking_number}"))
        })
    }

    pub async fn get_bookings_for_customer(
        &self,
        name: &str,
        surname: &str,
    ) -> Result<Vec<String>, BookingError> {
        info!(event_name = "booking.list.requested", name, surname, "getting bookings for customer");

        self.repository.list_booking_numbers(name, surname).await.map_err(|error| {
            error.into_booking_error(format!(
                "DB error while listing bookings for customer {name} {surname}"
            ))
        })
    }

    pub async fn cancel_booking(
        &self,
        booking_number: &str,
        name: &str,
        surname: &str,
    ) -> Result<Booking, BookingError> {
        info!(
            event_name = "booking.cancel.requested",
            booking_number,
            name,
            surname,
            "canceling booking"
        );

        let mut booking = self.get_booking_details(booking_number, name, surname).await?;

        if booking.canceled {
            return Err(self.refuse(booking, CancelRefusal::AlreadyCanceled));
        }

        let today = self.clock.today();
        if let Err(reason) = self.policy.check(&booking, today) {
            return Err(self.refuse(booking, reason));
        }

        let updated = self.repository.cancel_booking(&booking.booking_number).await.map_err(
            |error| {
                error.into_booking_error(format!(
                    "DB error while canceling booking {}",
                    booking.booking_number
                ))
            },
        )?;

        if updated != 1 {
            return Err(BookingError::Storage(format!(
                "DB error while canceling booking {}: expected one updated row, got {updated}",
                booking.booking_number
            )));
        }

        booking.mark_canceled();
        info!(
            event_name = "booking.cancel.completed",
            booking_number = %booking.booking_number,
            "booking canceled"
        );
        Ok(booking)
    }

    fn refuse(&self, booking: Booking, reason: CancelRefusal) -> BookingError {
        warn!(
            event_name = "booking.cancel.refused",
            booking_number = %booking.booking_number,
            reason = %reason,
            "booking cannot be canceled"
        );
        BookingError::cannot_be_canceled(booking.booking_number, reason)
    }
}
