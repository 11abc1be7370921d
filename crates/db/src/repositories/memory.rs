use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use smiles_core::domain::booking::Booking;

use super::{dedupe_preserving_order, BookingRepository, RepositoryError};

/// Test double with the same matching rules as the SQL repository.
#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: RwLock<Vec<Booking>>,
    cancel_updates: AtomicU64,
}

impl InMemoryBookingRepository {
    pub fn with_bookings(bookings: Vec<Booking>) -> Self {
        Self { bookings: RwLock::new(bookings), cancel_updates: AtomicU64::new(0) }
    }

    /// Rows touched by `cancel_booking` so far.
    pub fn cancel_updates(&self) -> u64 {
        self.cancel_updates.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> Vec<Booking> {
        self.bookings.read().await.clone()
    }
}

#[async_trait::async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn find_booking(
        &self,
        booking_number: &str,
        name: &str,
        surname: &str,
    ) -> Result<Booking, RepositoryError> {
        let wanted = booking_number.trim();
        let bookings = self.bookings.read().await;
        bookings
            .iter()
            .find(|b| b.booking_number.trim() == wanted && b.customer.matches(name, surname))
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(wanted.to_string()))
    }

    async fn list_booking_numbers(
        &self,
        name: &str,
        surname: &str,
    ) -> Result<Vec<String>, RepositoryError> {
        let bookings = self.bookings.read().await;
        Ok(dedupe_preserving_order(
            bookings
                .iter()
                .filter(|b| b.customer.matches(name, surname))
                .map(|b| b.booking_number.clone()),
        ))
    }

    async fn cancel_booking(&self, booking_number: &str) -> Result<u64, RepositoryError> {
        let mut bookings = self.bookings.write().await;
        let mut updated = 0;
        for booking in bookings.iter_mut().filter(|b| b.booking_number == booking_number) {
            booking.canceled = true;
            updated += 1;
        }

        if updated == 0 {
            return Err(RepositoryError::NotFound(booking_number.to_string()));
        }

        self.cancel_updates.fetch_add(updated, Ordering::SeqCst);
        Ok(updated)
    }
}
