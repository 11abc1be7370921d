use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::booking::Booking;
use crate::errors::CancelRefusal;

pub const DEFAULT_LEAD_TIME_DAYS: u32 = 7;
pub const DEFAULT_MINIMUM_DURATION_DAYS: u32 = 3;

/// Rules a booking must satisfy before it may be canceled.
///
/// Checks run in order and the first violation wins:
/// 1. `today + lead_time_days` must not be after the booking start.
/// 2. The booking must span at least `minimum_duration_days`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationPolicy {
    pub lead_time_days: u32,
    pub minimum_duration_days: u32,
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self {
            lead_time_days: DEFAULT_LEAD_TIME_DAYS,
            minimum_duration_days: DEFAULT_MINIMUM_DURATION_DAYS,
        }
    }
}

impl CancellationPolicy {
    pub fn check(&self, booking: &Booking, today: NaiveDate) -> Result<(), CancelRefusal> {
        if self.is_too_late(booking, today) {
            return Err(CancelRefusal::TooLate);
        }

        if self.is_too_short(booking) {
            return Err(CancelRefusal::TooShort);
        }

        Ok(())
    }

    fn is_too_late(&self, booking: &Booking, today: NaiveDate) -> bool {
        match today.checked_add_days(Days::new(u64::from(self.lead_time_days))) {
            Some(cutoff) => cutoff > booking.start,
            None => true,
        }
    }

    fn is_too_short(&self, booking: &Booking) -> bool {
        match booking.start.checked_add_days(Days::new(u64::from(self.minimum_duration_days))) {
            Some(minimum_end) => booking.end < minimum_end,
            None => true,
        }
    }
}
